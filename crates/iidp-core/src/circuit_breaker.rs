/// Circuit breaker: detects a consecutive-failure streak and drops the
/// learner into a one-quiz recovery phase composed of easier material (§4.6).
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::domain::{Item, ItemId, LearnerProfile, LearningPhase, Response, TopicId};
use crate::phase;
use crate::review;
use crate::selector;

#[derive(Debug, Clone)]
pub struct CircuitBreakerEvent {
    pub learner_id: String,
    pub failure_streak: usize,
    pub triggered_at: DateTime<Utc>,
}

/// True when the most recent `threshold` responses (assumed ordered oldest
/// to newest) exist and are all incorrect. Fewer than `threshold` responses
/// never trips the breaker.
pub fn is_failure_streak(recent_responses: &[Response], threshold: usize) -> bool {
    if recent_responses.len() < threshold {
        return false;
    }
    recent_responses
        .iter()
        .rev()
        .take(threshold)
        .all(|r| !r.is_correct)
}

/// Evaluates the breaker against a learner's most recent responses and, if
/// tripped, switches `profile.learning_phase` to [`LearningPhase::Recovery`]
/// and returns the event to log. A no-op (and `None`) if already in recovery
/// — the breaker does not re-trigger mid-recovery.
pub fn evaluate(
    profile: &mut LearnerProfile,
    recent_responses: &[Response],
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Option<CircuitBreakerEvent> {
    if profile.learning_phase == LearningPhase::Recovery {
        return None;
    }
    if !is_failure_streak(recent_responses, config.circuit_breaker_threshold) {
        return None;
    }

    profile.learning_phase = LearningPhase::Recovery;
    Some(CircuitBreakerEvent {
        learner_id: profile.learner_id.clone(),
        failure_streak: config.circuit_breaker_threshold,
        triggered_at: now,
    })
}

/// Splits `total` into `buckets` counts, front-loaded: earlier buckets get
/// one extra when `total` doesn't divide evenly. `distribute(7, 4)` yields
/// `[2, 2, 2, 1]`, matching §4.6's "7 items ... adjusted to total 7" wording
/// when fewer than 4 weak topics exist to draw from.
fn distribute(total: usize, buckets: usize) -> Vec<usize> {
    if buckets == 0 {
        return Vec::new();
    }
    let base = total / buckets;
    let remainder = total % buckets;
    (0..buckets)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Composes the recovery quiz's items directly against the catalog rather
/// than through the phase controller's generic slot plan (§4.6): 7 easy
/// items (`b` in `[0.4, 0.7]`, `a >= 1.0`) spread across the 4 weakest
/// topics, 2 medium items (`b` in `[0.8, 1.1]`, `a >= 1.0`) from the 2
/// weakest, and 1 review item the learner answered correctly 7-14 days ago
/// from those weak topics (falling back to the general review tiers,
/// restricted to the same weak-topic set, if none fits that exact window).
///
/// `weakest_topics_first` must already be ranked weakest-first (the
/// exploitation ranker's output is the natural source). Returns `(topic,
/// item)` pairs rather than a flat item list so the composer can still
/// interleave the recovery quiz like any other.
pub fn compose_recovery_quiz(
    weakest_topics_first: &[TopicId],
    candidates_by_topic: &HashMap<TopicId, Vec<Item>>,
    correct_responses: &[Response],
    recent_set: &HashSet<ItemId>,
    now: DateTime<Utc>,
) -> Vec<(TopicId, ItemId)> {
    let mut excluded = recent_set.clone();
    let mut picks = Vec::new();

    let easy_topics: Vec<&TopicId> = weakest_topics_first.iter().take(4).collect();
    for (topic, count) in easy_topics.iter().zip(distribute(7, easy_topics.len())) {
        let Some(candidates) = candidates_by_topic.get(*topic) else {
            continue;
        };
        for _ in 0..count {
            if let Some(item_id) =
                selector::select_constrained(candidates, topic, (0.4, 0.7), 1.0, &excluded)
            {
                excluded.insert(item_id.clone());
                picks.push(((*topic).clone(), item_id));
            }
        }
    }

    let medium_topics: Vec<&TopicId> = weakest_topics_first.iter().take(2).collect();
    for topic in medium_topics {
        let Some(candidates) = candidates_by_topic.get(topic) else {
            continue;
        };
        if let Some(item_id) =
            selector::select_constrained(candidates, topic, (0.8, 1.1), 1.0, &excluded)
        {
            excluded.insert(item_id.clone());
            picks.push((topic.clone(), item_id));
        }
    }

    let weak_topic_set: HashSet<TopicId> = weakest_topics_first.iter().take(4).cloned().collect();
    let review_pick = review::pick_item_in_window(
        correct_responses,
        &weak_topic_set,
        &excluded,
        now,
        7,
        14,
    )
    .or_else(|| {
        review::pick_review_item(correct_responses, &excluded, now)
            .filter(|(topic, _)| weak_topic_set.contains(topic))
    });
    if let Some((topic, item_id)) = review_pick {
        picks.push((topic, item_id));
    }

    picks
}

/// Recovery lasts exactly one quiz. Call after that quiz is composed to hand
/// the learner back to whatever phase [`phase::advance_phase`] would
/// otherwise assign from their completed-quiz count.
pub fn resolve_after_recovery_quiz(profile: &mut LearnerProfile, config: &EngineConfig) {
    if profile.learning_phase != LearningPhase::Recovery {
        return;
    }
    profile.learning_phase = LearningPhase::Exploration;
    phase::advance_phase(profile, config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemId, TopicId};

    fn response(correct: bool) -> Response {
        Response {
            learner_id: "l1".into(),
            item_id: ItemId::new("i"),
            topic_id: TopicId::new("PHY:mechanics"),
            is_correct: correct,
            elapsed_seconds: 10,
            theta_before: 0.0,
            theta_after: 0.0,
            delta_theta: 0.0,
            se_before: 0.3,
            se_after: 0.3,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn does_not_trigger_below_threshold() {
        let config = EngineConfig::default();
        let responses: Vec<Response> = (0..4).map(|_| response(false)).collect();
        assert!(!is_failure_streak(&responses, config.circuit_breaker_threshold));
    }

    #[test]
    fn triggers_on_exact_streak() {
        let config = EngineConfig::default();
        let responses: Vec<Response> = (0..5).map(|_| response(false)).collect();
        assert!(is_failure_streak(&responses, config.circuit_breaker_threshold));
    }

    #[test]
    fn a_single_correct_answer_in_the_tail_breaks_the_streak() {
        let config = EngineConfig::default();
        let mut responses: Vec<Response> = (0..4).map(|_| response(false)).collect();
        responses.push(response(true));
        assert!(!is_failure_streak(&responses, config.circuit_breaker_threshold));
    }

    #[test]
    fn evaluate_switches_phase_and_emits_event() {
        let config = EngineConfig::default();
        let mut profile = LearnerProfile::new("l1");
        let responses: Vec<Response> = (0..5).map(|_| response(false)).collect();
        let event = evaluate(&mut profile, &responses, &config, Utc::now()).unwrap();
        assert_eq!(profile.learning_phase, LearningPhase::Recovery);
        assert_eq!(event.failure_streak, 5);
    }

    #[test]
    fn evaluate_is_idempotent_while_already_in_recovery() {
        let config = EngineConfig::default();
        let mut profile = LearnerProfile::new("l1");
        profile.learning_phase = LearningPhase::Recovery;
        let responses: Vec<Response> = (0..5).map(|_| response(false)).collect();
        assert!(evaluate(&mut profile, &responses, &config, Utc::now()).is_none());
    }

    #[test]
    fn recovery_resolves_back_to_exploration_or_exploitation() {
        let config = EngineConfig::default();
        let mut profile = LearnerProfile::new("l1");
        profile.learning_phase = LearningPhase::Recovery;
        profile.completed_quiz_count = 20;
        resolve_after_recovery_quiz(&mut profile, &config);
        assert_eq!(profile.learning_phase, LearningPhase::Exploitation);
    }

    #[test]
    fn distribute_front_loads_the_remainder() {
        assert_eq!(distribute(7, 4), vec![2, 2, 2, 1]);
        assert_eq!(distribute(7, 3), vec![3, 2, 2]);
        assert_eq!(distribute(7, 1), vec![7]);
        assert_eq!(distribute(7, 0), Vec::<usize>::new());
    }

    fn catalog_item(id: &str, topic: &str, b: f64, a: f64) -> Item {
        Item {
            id: ItemId::new(id),
            topic_id: TopicId::new(topic),
            item_type: crate::domain::ItemType::SingleChoice,
            difficulty_tier: crate::domain::DifficultyTier::Easy,
            irt: crate::domain::IrtParams::new(b, a, 0.25).unwrap(),
        }
    }

    #[test]
    fn recovery_quiz_composes_seven_easy_two_medium_one_review() {
        let topics: Vec<TopicId> = ["PHY:mechanics", "MATH:calculus", "CHEM:organic_chemistry", "MATH:algebra"]
            .iter()
            .map(|t| TopicId::new(*t))
            .collect();

        let mut candidates_by_topic = HashMap::new();
        for topic in &topics {
            let items: Vec<Item> = (0..5)
                .flat_map(|i| {
                    vec![
                        catalog_item(&format!("{topic}-easy-{i}"), topic.as_str(), 0.5, 1.2),
                        catalog_item(&format!("{topic}-med-{i}"), topic.as_str(), 0.9, 1.2),
                    ]
                })
                .collect();
            candidates_by_topic.insert(topic.clone(), items);
        }

        let now = Utc::now();
        let correct_responses = vec![Response {
            learner_id: "l1".into(),
            item_id: ItemId::new("PHY:mechanics-easy-0"),
            topic_id: TopicId::new("PHY:mechanics"),
            is_correct: true,
            elapsed_seconds: 10,
            theta_before: -1.0,
            theta_after: -0.9,
            delta_theta: 0.1,
            se_before: 0.3,
            se_after: 0.3,
            timestamp: now - chrono::Duration::days(10),
        }];

        let picks = compose_recovery_quiz(
            &topics,
            &candidates_by_topic,
            &correct_responses,
            &HashSet::new(),
            now,
        );

        assert_eq!(picks.len(), 10);
        let distinct_items: HashSet<&ItemId> = picks.iter().map(|(_, id)| id).collect();
        assert_eq!(distinct_items.len(), 10);
    }
}
