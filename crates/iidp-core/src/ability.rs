/// Ability store: maintains and updates per-topic latent ability estimates.
///
/// Every function here is pure over its inputs — no repository or clock
/// access. `engine::AssessmentEngine` is the only caller and is responsible
/// for loading/persisting the [`LearnerProfile`] around these calls.
use chrono::{DateTime, Utc};

use crate::config::{EngineConfig, TopicWeightTable};
use crate::domain::{clamp_se, clamp_theta, Item, LearnerProfile, Response, TopicAbility, TopicId};

/// Accuracy -> theta mapping used to seed a topic's ability from an initial
/// assessment (§4.2). `n` is the number of attempts observed for that topic.
pub fn accuracy_to_theta(accuracy: f64, n: u32) -> f64 {
    if accuracy >= 1.0 {
        if n >= 5 {
            2.0
        } else {
            1.5
        }
    } else if accuracy >= 0.90 {
        2.5
    } else if accuracy >= 0.75 {
        1.5
    } else if accuracy >= 0.60 {
        0.5
    } else if accuracy >= 0.40 {
        -0.5
    } else if accuracy >= 0.20 {
        -1.5
    } else if accuracy > 0.0 {
        -2.5
    } else if n >= 5 {
        -2.0
    } else {
        -1.5
    }
}

/// Initial standard error for a topic with `n` observed attempts and the
/// given accuracy. Not defined for `n == 0`; use [`TopicAbility::cold_start`]
/// for untested topics instead.
pub fn initial_se(n: u32, accuracy: f64) -> f64 {
    debug_assert!(n > 0, "initial_se requires at least one attempt");
    let base = 1.0 / (n as f64).sqrt();
    let penalty = 1.0 + (accuracy - 0.5).abs();
    clamp_se(base * penalty)
}

/// Builds a [`LearnerProfile`] from a completed initial assessment.
///
/// Groups responses by topic, maps each topic's accuracy to an initial theta
/// and SE, and sets `overall_theta` to the JEE-weight-weighted mean over
/// tested topics (a topic absent from `weight_table` contributes the
/// documented default weight, 0.5).
pub fn init_from_assessment(
    learner_id: &str,
    responses: &[Response],
    weight_table: &TopicWeightTable,
) -> LearnerProfile {
    let mut profile = LearnerProfile::new(learner_id);
    let now = responses.iter().map(|r| r.timestamp).max();

    let mut by_topic: std::collections::BTreeMap<&TopicId, (u32, u32)> =
        std::collections::BTreeMap::new();
    for r in responses {
        let entry = by_topic.entry(&r.topic_id).or_insert((0, 0));
        entry.1 += 1;
        if r.is_correct {
            entry.0 += 1;
        }
    }

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for (topic, (correct, n)) in &by_topic {
        let accuracy = *correct as f64 / *n as f64;
        let theta = accuracy_to_theta(accuracy, *n);
        let se = initial_se(*n, accuracy);
        profile.topic_abilities.insert(
            (*topic).clone(),
            TopicAbility {
                theta: clamp_theta(theta),
                se,
                attempts: *n,
                accuracy: Some(accuracy),
                last_updated: now,
            },
        );
        profile.topic_attempt_counts.insert((*topic).clone(), *n);

        let weight = weight_table.weightage(topic) as f64;
        weighted_sum += theta * weight;
        weight_sum += weight;
    }

    profile.overall_theta = if weight_sum > 0.0 {
        clamp_theta(weighted_sum / weight_sum)
    } else {
        0.0
    };
    profile.total_questions_solved = responses.len() as u64;
    profile.assessment_completed_at = now;
    profile.recompute_subject_balance();
    profile
}

/// Prior ability for a topic the learner has not yet attempted (§3 creation
/// path / §4.2): average theta across already-tested topics in the same
/// subject, falling back to `overall_theta` (which is 0.0 for a fresh
/// learner) when none exist.
pub fn prior_for_untested_topic(profile: &LearnerProfile, topic: &TopicId) -> TopicAbility {
    let subject = topic.subject();
    let same_subject_thetas: Vec<f64> = profile
        .topic_abilities
        .iter()
        .filter(|(t, _)| t.subject() == subject)
        .map(|(_, a)| a.theta)
        .collect();

    let theta = if same_subject_thetas.is_empty() {
        profile.overall_theta
    } else {
        same_subject_thetas.iter().sum::<f64>() / same_subject_thetas.len() as f64
    };

    TopicAbility::cold_start(theta, 0.6)
}

fn ensure_topic_ability(profile: &mut LearnerProfile, topic: &TopicId) {
    if !profile.topic_abilities.contains_key(topic) {
        let prior = prior_for_untested_topic(profile, topic);
        profile.topic_abilities.insert(topic.clone(), prior);
    }
}

/// Applies the update rule from §4.2 for a single answered item, mutating the
/// learner's `TopicAbility` for that item's topic in place and returning the
/// [`Response`] record to be appended to the response log.
///
/// Does not touch `completed_quiz_count` or `learning_phase` — those are
/// quiz-scoped concerns owned by the composer/engine.
pub fn update_after_response(
    profile: &mut LearnerProfile,
    item: &Item,
    is_correct: bool,
    elapsed_seconds: u32,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Response {
    ensure_topic_ability(profile, &item.topic_id);

    let before = *profile
        .topic_abilities
        .get(&item.topic_id)
        .expect("just inserted above");

    let p = crate::irt::probability(before.theta, &item.irt);
    let lr = config.base_learning_rate / (1.0 + config.learning_rate_decay * before.attempts as f64);
    let delta_theta = if is_correct { lr * (1.0 - p) } else { -lr * p };

    let theta_after = clamp_theta(before.theta + delta_theta);
    let se_after = clamp_se(before.se * config.se_reduction_factor);
    let attempts_after = before.attempts + 1;

    let accuracy_after = match before.accuracy {
        None => {
            if is_correct {
                1.0
            } else {
                0.0
            }
        }
        Some(prev) => {
            (prev * before.attempts as f64 + if is_correct { 1.0 } else { 0.0 })
                / attempts_after as f64
        }
    };

    let updated = TopicAbility {
        theta: theta_after,
        se: se_after,
        attempts: attempts_after,
        accuracy: Some(accuracy_after),
        last_updated: Some(now),
    };
    profile.topic_abilities.insert(item.topic_id.clone(), updated);

    *profile
        .topic_attempt_counts
        .entry(item.topic_id.clone())
        .or_insert(0) += 1;
    profile.total_questions_solved += 1;
    profile.recompute_subject_balance();

    Response {
        learner_id: profile.learner_id.clone(),
        item_id: item.id.clone(),
        topic_id: item.topic_id.clone(),
        is_correct,
        elapsed_seconds,
        theta_before: before.theta,
        theta_after,
        delta_theta,
        se_before: before.se,
        se_after,
        timestamp: now,
    }
}

/// JEE-weighted mean theta across tested topics; used to refresh
/// `overall_theta` after any update (unmapped topics weight 0.5 by default,
/// matching [`init_from_assessment`]).
pub fn recompute_overall_theta(profile: &LearnerProfile, weight_table: &TopicWeightTable) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for (topic, ability) in &profile.topic_abilities {
        let weight = weight_table.weightage(topic) as f64;
        weighted_sum += ability.theta * weight;
        weight_sum += weight;
    }
    if weight_sum > 0.0 {
        clamp_theta(weighted_sum / weight_sum)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DifficultyTier, IrtParams, ItemId, ItemType};

    fn item(topic: &str, b: f64, a: f64, c: f64) -> Item {
        Item {
            id: ItemId::new("i1"),
            topic_id: TopicId::new(topic),
            item_type: ItemType::SingleChoice,
            difficulty_tier: DifficultyTier::Medium,
            irt: IrtParams::new(b, a, c).unwrap(),
        }
    }

    #[test]
    fn accuracy_table_matches_spec_bands() {
        assert_eq!(accuracy_to_theta(1.0, 5), 2.0);
        assert_eq!(accuracy_to_theta(1.0, 3), 1.5);
        assert_eq!(accuracy_to_theta(0.95, 10), 2.5);
        assert_eq!(accuracy_to_theta(0.8, 10), 1.5);
        assert_eq!(accuracy_to_theta(0.65, 10), 0.5);
        assert_eq!(accuracy_to_theta(0.5, 10), -0.5);
        assert_eq!(accuracy_to_theta(0.3, 10), -1.5);
        assert_eq!(accuracy_to_theta(0.1, 10), -2.5);
        assert_eq!(accuracy_to_theta(0.0, 5), -2.0);
        assert_eq!(accuracy_to_theta(0.0, 2), -1.5);
    }

    #[test]
    fn update_on_correct_hard_item_matches_worked_example() {
        let mut profile = LearnerProfile::new("l1");
        profile.topic_abilities.insert(
            TopicId::new("PHY:mechanics"),
            TopicAbility {
                theta: 0.5,
                se: 0.6,
                attempts: 0,
                accuracy: None,
                last_updated: None,
            },
        );
        let config = EngineConfig::default();
        let it = item("PHY:mechanics", 1.4, 1.6, 0.25);

        let response = update_after_response(&mut profile, &it, true, 30, Utc::now(), &config);

        assert!(response.delta_theta > 0.0);
        assert!((response.theta_after - 0.698).abs() < 0.01);
        let ability = profile.topic_abilities[&TopicId::new("PHY:mechanics")];
        assert_eq!(ability.attempts, 1);
        assert!((ability.se - 0.57).abs() < 0.01);
    }

    #[test]
    fn monotonicity_correct_vs_incorrect() {
        let mut profile = LearnerProfile::new("l1");
        profile.topic_abilities.insert(
            TopicId::new("MATH:calculus"),
            TopicAbility {
                theta: 0.5,
                se: 0.6,
                attempts: 0,
                accuracy: None,
                last_updated: None,
            },
        );
        let config = EngineConfig::default();
        // b > theta: a correct answer should raise theta.
        let hard_item = item("MATH:calculus", 1.4, 1.6, 0.25);
        let mut correct_profile = profile.clone();
        let r_correct = update_after_response(&mut correct_profile, &hard_item, true, 10, Utc::now(), &config);
        assert!(r_correct.delta_theta > 0.0);

        let r_incorrect = update_after_response(&mut profile, &hard_item, false, 10, Utc::now(), &config);
        assert!(r_incorrect.delta_theta < 0.0);
    }

    #[test]
    fn delta_magnitude_decreases_with_attempts() {
        let config = EngineConfig::default();
        let it = item("MATH:calculus", 1.4, 1.6, 0.25);

        let mut fresh = LearnerProfile::new("l1");
        fresh.topic_abilities.insert(
            TopicId::new("MATH:calculus"),
            TopicAbility { theta: 0.5, se: 0.6, attempts: 0, accuracy: None, last_updated: None },
        );
        let r1 = update_after_response(&mut fresh, &it, true, 10, Utc::now(), &config);

        let mut seasoned = LearnerProfile::new("l1");
        seasoned.topic_abilities.insert(
            TopicId::new("MATH:calculus"),
            TopicAbility { theta: 0.5, se: 0.6, attempts: 20, accuracy: Some(0.5), last_updated: None },
        );
        let r2 = update_after_response(&mut seasoned, &it, true, 10, Utc::now(), &config);

        assert!(r2.delta_theta.abs() < r1.delta_theta.abs());
    }

    #[test]
    fn theta_and_se_always_in_bounds() {
        let config = EngineConfig::default();
        let it = item("PHY:mechanics", 2.6, 2.0, 0.25);
        let mut profile = LearnerProfile::new("l1");
        for _ in 0..200 {
            update_after_response(&mut profile, &it, true, 5, Utc::now(), &config);
        }
        let ability = profile.topic_abilities[&TopicId::new("PHY:mechanics")];
        assert!(ability.theta <= crate::domain::THETA_MAX);
        assert!(ability.se >= crate::domain::SE_MIN);
    }

    #[test]
    fn prior_falls_back_to_overall_theta_when_no_same_subject_topics() {
        let mut profile = LearnerProfile::new("l1");
        profile.overall_theta = 0.42;
        profile.topic_abilities.insert(
            TopicId::new("CHEM:organic_chemistry"),
            TopicAbility { theta: -1.0, se: 0.3, attempts: 4, accuracy: Some(0.5), last_updated: None },
        );
        let prior = prior_for_untested_topic(&profile, &TopicId::new("PHY:mechanics"));
        assert_eq!(prior.theta, 0.42);
        assert_eq!(prior.se, 0.6);
        assert_eq!(prior.attempts, 0);
    }

    #[test]
    fn prior_averages_same_subject_topics() {
        let mut profile = LearnerProfile::new("l1");
        profile.topic_abilities.insert(
            TopicId::new("PHY:mechanics"),
            TopicAbility { theta: 1.0, se: 0.3, attempts: 4, accuracy: Some(0.5), last_updated: None },
        );
        profile.topic_abilities.insert(
            TopicId::new("PHY:optics"),
            TopicAbility { theta: -1.0, se: 0.3, attempts: 4, accuracy: Some(0.5), last_updated: None },
        );
        let prior = prior_for_untested_topic(&profile, &TopicId::new("PHY:thermodynamics"));
        assert_eq!(prior.theta, 0.0);
    }
}
