use crate::domain::errors::IidpError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// θ is always clamped to this range on write (invariant 1).
pub const THETA_MIN: f64 = -3.0;
pub const THETA_MAX: f64 = 3.0;

/// SE is always clamped to this range on write (invariant 2).
pub const SE_MIN: f64 = 0.1;
pub const SE_MAX: f64 = 0.6;

pub fn clamp_theta(theta: f64) -> f64 {
    theta.clamp(THETA_MIN, THETA_MAX)
}

pub fn clamp_se(se: f64) -> f64 {
    se.clamp(SE_MIN, SE_MAX)
}

/// Subject a topic belongs to, derived from the topic id's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Physics,
    Chemistry,
    Mathematics,
    Other,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Physics, Subject::Chemistry, Subject::Mathematics];
}

/// Stable identifier for a topic, e.g. `"PHY:kinematics"`, `"MATH:integration"`.
///
/// The prefix before the first `:` determines [`Subject`]; an unrecognized or
/// missing prefix maps to [`Subject::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TopicId(pub String);

impl TopicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn subject(&self) -> Subject {
        match self.0.split(':').next().unwrap_or("") {
            "PHY" => Subject::Physics,
            "CHEM" => Subject::Chemistry,
            "MATH" => Subject::Mathematics,
            _ => Subject::Other,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier for a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    SingleChoice,
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
}

/// Three-parameter-logistic item parameters.
///
/// Invariants: `0 <= c < 1`, `a > 0`. `b` and `a` are expected (but not
/// enforced) to sit within the ranges the calibration pipeline produces
/// (`b` in `[0.4, 2.6]`, `a` in `[1.0, 2.0]`); the engine treats values
/// outside that range as valid, just atypical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrtParams {
    pub b: f64,
    pub a: f64,
    pub c: f64,
}

impl IrtParams {
    pub fn new(b: f64, a: f64, c: f64) -> Result<Self, IidpError> {
        if !(a > 0.0) {
            return Err(IidpError::Precondition(format!(
                "discrimination a must be > 0, got {a}"
            )));
        }
        if !(0.0..1.0).contains(&c) {
            return Err(IidpError::Precondition(format!(
                "guessing floor c must be in [0, 1), got {c}"
            )));
        }
        Ok(Self { b, a, c })
    }
}

/// An immutable, calibrated test item as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub topic_id: TopicId,
    pub item_type: ItemType,
    pub difficulty_tier: DifficultyTier,
    pub irt: IrtParams,
}

impl Item {
    pub fn subject(&self) -> Subject {
        self.topic_id.subject()
    }
}

/// Per-(learner, topic) latent ability estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicAbility {
    pub theta: f64,
    pub se: f64,
    pub attempts: u32,
    pub accuracy: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TopicAbility {
    /// Cold-start record for a topic the learner has never attempted.
    pub fn cold_start(theta: f64, se: f64) -> Self {
        Self {
            theta: clamp_theta(theta),
            se: clamp_se(se),
            attempts: 0,
            accuracy: None,
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningPhase {
    Exploration,
    Exploitation,
    Recovery,
}

/// Everything the engine knows about one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: String,
    pub topic_abilities: HashMap<TopicId, TopicAbility>,
    pub overall_theta: f64,
    pub completed_quiz_count: u32,
    pub assessment_completed_at: Option<DateTime<Utc>>,
    pub learning_phase: LearningPhase,
    /// Set exactly once, at the first quiz with `completed_quiz_count >= 14`.
    pub phase_switched_at_quiz: Option<u32>,
    pub topic_attempt_counts: HashMap<TopicId, u32>,
    pub total_questions_solved: u64,
    /// Proportion of attempts per subject, recomputed from `topic_attempt_counts`.
    pub subject_balance: HashMap<Subject, f64>,
}

impl LearnerProfile {
    pub fn new(learner_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            topic_abilities: HashMap::new(),
            overall_theta: 0.0,
            completed_quiz_count: 0,
            assessment_completed_at: None,
            learning_phase: LearningPhase::Exploration,
            phase_switched_at_quiz: None,
            topic_attempt_counts: HashMap::new(),
            total_questions_solved: 0,
            subject_balance: HashMap::new(),
        }
    }

    /// Recomputes `subject_balance` from `topic_attempt_counts`. Topics whose
    /// subject cannot be determined fall under `Subject::Other` and are
    /// excluded from the ratio (they are not one of the three tracked
    /// subjects used by the ranker's balance term).
    pub fn recompute_subject_balance(&mut self) {
        let mut per_subject: HashMap<Subject, u32> = HashMap::new();
        let mut total = 0u32;
        for (topic, count) in &self.topic_attempt_counts {
            let subject = topic.subject();
            if subject == Subject::Other {
                continue;
            }
            *per_subject.entry(subject).or_insert(0) += count;
            total += count;
        }

        self.subject_balance.clear();
        if total == 0 {
            return;
        }
        for subject in Subject::ALL {
            let count = per_subject.get(&subject).copied().unwrap_or(0);
            self.subject_balance
                .insert(subject, count as f64 / total as f64);
        }
    }
}

/// Append-only record of one answered item. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub learner_id: String,
    pub item_id: ItemId,
    pub topic_id: TopicId,
    pub is_correct: bool,
    pub elapsed_seconds: u32,
    pub theta_before: f64,
    pub theta_after: f64,
    pub delta_theta: f64,
    pub se_before: f64,
    pub se_after: f64,
    pub timestamp: DateTime<Utc>,
}

/// A generated quiz: exactly 10 item ids (or fewer, with `short_quiz` set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub learner_id: String,
    pub quiz_number: u32,
    pub phase: LearningPhase,
    pub item_ids: Vec<ItemId>,
    pub topics: HashSet<TopicId>,
    pub created_at: DateTime<Utc>,
    /// Set when the composer could not fill all 10 slots (§7, InsufficientCandidates).
    pub short_quiz: bool,
}

impl Quiz {
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }
}
