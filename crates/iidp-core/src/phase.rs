/// Phase controller: decides whether a learner is in exploration,
/// exploitation, or recovery, and how a quiz's ten slots split across
/// exploration picks vs. exploitation buckets (§4.3).
use crate::config::EngineConfig;
use crate::domain::{LearnerProfile, LearningPhase};

/// Slot allocation for one quiz, always summing to `config.quiz_length`
/// (barring the selector's own short-quiz fallback downstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPlan {
    /// Slots drawn by the exploration ranker (new/under-attempted topics).
    pub explore: usize,
    /// Slots drawn for the learner's weakest topics. In the exploration
    /// phase this field instead holds the "deliberate" remainder
    /// (`10 - n_exp - n_review`), filled via the same weakest-topic ranking.
    pub weak: usize,
    /// Slots drawn for topic maintenance (spaced reinforcement).
    pub maintenance: usize,
    /// Slots drawn by the review selector (overdue items).
    pub review: usize,
}

impl SlotPlan {
    pub fn total(&self) -> usize {
        self.explore + self.weak + self.maintenance + self.review
    }
}

/// Fraction of a quiz's slots drawn from exploration at a given completed-quiz
/// count: linearly decays from `exploration_start_ratio` by
/// `exploration_ratio_decay_per_quiz` per quiz, floored at
/// `exploration_min_ratio`, and hits zero once exploitation begins.
pub fn exploration_ratio(completed_quiz_count: u32, config: &EngineConfig) -> f32 {
    if completed_quiz_count >= config.exploration_end_quiz {
        return 0.0;
    }
    let decayed = config.exploration_start_ratio
        - config.exploration_ratio_decay_per_quiz * completed_quiz_count as f32;
    decayed.max(config.exploration_min_ratio)
}

/// Advances `profile.learning_phase` based on `completed_quiz_count`. The
/// exploration -> exploitation transition is one-way: `phase_switched_at_quiz`
/// is set exactly once, on the first call where the threshold is met, and
/// never reverts even if later logic (e.g. a circuit breaker recovering)
/// temporarily overrides the phase for a single quiz via [`LearningPhase::Recovery`].
pub fn advance_phase(profile: &mut LearnerProfile, config: &EngineConfig) {
    if profile.learning_phase == LearningPhase::Recovery {
        return;
    }
    if profile.completed_quiz_count >= config.exploration_end_quiz {
        if profile.phase_switched_at_quiz.is_none() {
            profile.phase_switched_at_quiz = Some(profile.completed_quiz_count);
        }
        profile.learning_phase = LearningPhase::Exploitation;
    } else {
        profile.learning_phase = LearningPhase::Exploration;
    }
}

/// Builds the slot plan for `phase` at the learner's current
/// `completed_quiz_count`. Recovery ignores the exploration ratio entirely
/// and always uses `recovery_split`.
pub fn plan_slots(
    phase: LearningPhase,
    completed_quiz_count: u32,
    config: &EngineConfig,
) -> SlotPlan {
    let quiz_length = config.quiz_length;
    match phase {
        LearningPhase::Recovery => {
            let (weak, maintenance, review) = config.recovery_split;
            SlotPlan {
                explore: 0,
                weak,
                maintenance,
                review,
            }
        }
        LearningPhase::Exploitation => {
            let (weak, maintenance, review) = config.exploitation_split;
            SlotPlan {
                explore: 0,
                weak,
                maintenance,
                review,
            }
        }
        LearningPhase::Exploration => {
            // n_exp = floor(10 * ratio); n_review = 1; n_deliberate = 10 - n_exp - 1 (§4.3).
            let ratio = exploration_ratio(completed_quiz_count, config) as f64;
            let explore = (ratio * quiz_length as f64).floor() as usize;
            let explore = explore.min(quiz_length);
            let review = if quiz_length > explore { 1 } else { 0 };
            let deliberate = quiz_length - explore - review;

            SlotPlan {
                explore,
                weak: deliberate,
                maintenance: 0,
                review,
            }
        }
    }
}
