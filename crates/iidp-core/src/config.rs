/// Tunable constants for the adaptive assessment engine.
///
/// Centralised here per the spec's configuration-constants table so the
/// kernel, ability store, phase controller, and selector never hardcode a
/// magic number inline.
use std::collections::HashMap;

use crate::domain::{DifficultyTier, Subject, TopicId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub theta_min: f64,
    pub theta_max: f64,
    pub se_min: f64,
    pub se_max: f64,

    /// Base learning rate for `update_after_response`.
    pub base_learning_rate: f64,
    /// Per-attempt decay of the learning rate.
    pub learning_rate_decay: f64,
    /// Multiplicative SE shrinkage applied on every update.
    pub se_reduction_factor: f64,

    /// Completed-quiz count at which the phase controller switches to exploitation.
    pub exploration_end_quiz: u32,
    pub exploration_start_ratio: f32,
    pub exploration_min_ratio: f32,
    pub exploration_ratio_decay_per_quiz: f32,

    pub quiz_length: usize,
    /// Exploitation slot split: (weak, maintenance, review).
    pub exploitation_split: (usize, usize, usize),
    /// Recovery slot split: (easy, medium, review).
    pub recovery_split: (usize, usize, usize),

    /// `|b - target_theta| <= optimal_difficulty_window` in the selector's strict filter.
    pub optimal_difficulty_window: f64,
    /// Default discrimination floor (`a_min`) the selector's strict filter
    /// applies when the caller doesn't request a specific one.
    pub min_discrimination: f64,
    /// Trailing window, in days, defining the "recently answered" exclusion set.
    pub recency_window_days: i64,
    /// Consecutive-failure count that trips the circuit breaker.
    pub circuit_breaker_threshold: usize,

    /// Retries attempted for a repository call that fails with a retryable
    /// error (`Conflict`/`TransientIo`) before the engine gives up.
    pub max_retries: u32,
    /// Base backoff between retries; doubles on each subsequent attempt.
    pub retry_backoff_ms: u64,
    /// Wall-clock budget for a single engine operation, including retries.
    pub operation_deadline_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            theta_min: crate::domain::THETA_MIN,
            theta_max: crate::domain::THETA_MAX,
            se_min: crate::domain::SE_MIN,
            se_max: crate::domain::SE_MAX,
            base_learning_rate: 0.3,
            learning_rate_decay: 0.02,
            se_reduction_factor: 0.95,
            exploration_end_quiz: 14,
            exploration_start_ratio: 0.6,
            exploration_min_ratio: 0.3,
            exploration_ratio_decay_per_quiz: 0.04,
            quiz_length: 10,
            exploitation_split: (7, 2, 1),
            recovery_split: (7, 2, 1),
            optimal_difficulty_window: 0.5,
            min_discrimination: 1.0,
            recency_window_days: 30,
            circuit_breaker_threshold: 5,
            max_retries: 3,
            retry_backoff_ms: 50,
            operation_deadline_ms: 5_000,
        }
    }
}

/// Static per-topic JEE weightage table (0.3 / 0.6 / 1.0).
///
/// The source table was partial (documented with an ellipsis); per the
/// redesign notes, any topic absent from this map defaults to 0.5 rather than
/// panicking or treating it as zero-weight.
#[derive(Debug, Clone, Default)]
pub struct TopicWeightTable {
    weights: HashMap<TopicId, f32>,
    prereq_depths: HashMap<TopicId, u8>,
}

pub const DEFAULT_TOPIC_WEIGHT: f32 = 0.5;
pub const DEFAULT_PREREQ_DEPTH: u8 = 1;

impl TopicWeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, topic: TopicId, weight: f32) -> Self {
        self.weights.insert(topic, weight);
        self
    }

    pub fn with_prereq_depth(mut self, topic: TopicId, depth: u8) -> Self {
        self.prereq_depths.insert(topic, depth);
        self
    }

    /// JEE weightage for a topic: `{0.3, 0.6, 1.0}` by table lookup, else
    /// [`DEFAULT_TOPIC_WEIGHT`].
    pub fn weightage(&self, topic: &TopicId) -> f32 {
        self.weights
            .get(topic)
            .copied()
            .unwrap_or(DEFAULT_TOPIC_WEIGHT)
    }

    /// Prerequisite depth for a topic, `0..=3`, else [`DEFAULT_PREREQ_DEPTH`].
    pub fn prereq_depth(&self, topic: &TopicId) -> u8 {
        self.prereq_depths
            .get(topic)
            .copied()
            .unwrap_or(DEFAULT_PREREQ_DEPTH)
    }

    /// A representative seed table covering common JEE topics across the
    /// three subjects. Entries absent here still resolve through the
    /// documented defaults above; this is data, not an exhaustive catalog.
    pub fn jee_seed() -> Self {
        let mut table = Self::new();
        let high = [
            "PHY:mechanics",
            "PHY:electrodynamics",
            "CHEM:physical_chemistry",
            "MATH:calculus",
            "MATH:algebra",
        ];
        let medium = [
            "PHY:optics",
            "PHY:thermodynamics",
            "CHEM:organic_chemistry",
            "MATH:coordinate_geometry",
            "MATH:trigonometry",
        ];
        let low = [
            "PHY:modern_physics",
            "CHEM:inorganic_chemistry",
            "MATH:probability",
        ];
        for id in high {
            table = table.with_weight(TopicId::new(id), 1.0);
        }
        for id in medium {
            table = table.with_weight(TopicId::new(id), 0.6);
        }
        for id in low {
            table = table.with_weight(TopicId::new(id), 0.3);
        }

        let depth_0 = ["MATH:algebra", "PHY:mechanics", "CHEM:physical_chemistry"];
        let depth_2 = ["PHY:modern_physics", "MATH:probability"];
        let depth_3 = ["PHY:electrodynamics"];
        for id in depth_0 {
            table = table.with_prereq_depth(TopicId::new(id), 0);
        }
        for id in depth_2 {
            table = table.with_prereq_depth(TopicId::new(id), 2);
        }
        for id in depth_3 {
            table = table.with_prereq_depth(TopicId::new(id), 3);
        }
        table
    }
}

/// Minimum JEE weightage for a topic to be eligible for exploration ranking.
pub const EXPLORATION_MIN_WEIGHTAGE: f32 = 0.6;

/// An unexplored topic has fewer than this many attempts.
pub const UNEXPLORED_ATTEMPT_THRESHOLD: u32 = 2;

pub fn difficulty_tier_for_b(b: f64) -> DifficultyTier {
    if b < 0.9 {
        DifficultyTier::Easy
    } else if b < 1.7 {
        DifficultyTier::Medium
    } else {
        DifficultyTier::Hard
    }
}
