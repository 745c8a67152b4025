/// Topic ranker: orders candidate topics for each slot category a quiz draws
/// from (§4.4). Every ranking is a deterministic total order — ties break on
/// `TopicId` ascending so two calls with identical input always agree.
use crate::config::{TopicWeightTable, EXPLORATION_MIN_WEIGHTAGE, UNEXPLORED_ATTEMPT_THRESHOLD};
use crate::domain::{LearnerProfile, TopicId};

fn sort_by_priority_desc(mut scored: Vec<(TopicId, f64)>) -> Vec<TopicId> {
    scored.sort_by(|(topic_a, score_a), (topic_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| topic_a.cmp(topic_b))
    });
    scored.into_iter().map(|(topic, _)| topic).collect()
}

/// Ranks topics for exploration slots: eligible topics are unexplored
/// (`attempts < UNEXPLORED_ATTEMPT_THRESHOLD`) and carry JEE weightage
/// `>= EXPLORATION_MIN_WEIGHTAGE`.
/// `priority = 0.5*weightage + 0.3*(1 - prereq_depth/3) + 0.2*(1 - |current_subject_share - 1/3|)`
/// (§4.4): weightage rewards high-stakes topics, shallow prerequisite depth
/// favors foundational topics, and the subject-share term nudges toward
/// whichever subject the learner has attempted least, for balance.
pub fn rank_for_exploration(
    profile: &LearnerProfile,
    catalog_topics: &[TopicId],
    weight_table: &TopicWeightTable,
) -> Vec<TopicId> {
    let scored: Vec<(TopicId, f64)> = catalog_topics
        .iter()
        .filter(|topic| {
            let attempts = profile
                .topic_attempt_counts
                .get(topic)
                .copied()
                .unwrap_or(0);
            attempts < UNEXPLORED_ATTEMPT_THRESHOLD
                && weight_table.weightage(topic) >= EXPLORATION_MIN_WEIGHTAGE
        })
        .map(|topic| {
            let weightage = weight_table.weightage(topic) as f64;
            let depth = weight_table.prereq_depth(topic) as f64;
            let depth_term = 1.0 - depth / 3.0;
            let current_subject_share = profile
                .subject_balance
                .get(&topic.subject())
                .copied()
                .unwrap_or(0.0);
            let balance_term = 1.0 - (current_subject_share - 1.0 / 3.0).abs();
            let priority = 0.5 * weightage + 0.3 * depth_term + 0.2 * balance_term;
            (topic.clone(), priority)
        })
        .collect();

    sort_by_priority_desc(scored)
}

/// Ranks already-tested topics by weakness for exploitation's "weak topic"
/// slots: a blend of how far below the theta ceiling the learner sits and how
/// uncertain that estimate still is, scaled by JEE weightage so high-stakes
/// topics are surfaced first among equally weak ones.
/// `priority = 0.6*(1-(theta+3)/6) + 0.2*min(1, days_since_last/7) + 0.2*weightage`.
/// Weakest theta dominates; recency and JEE weightage break ties among
/// similarly weak topics (§4.4).
pub fn rank_for_exploitation(
    profile: &LearnerProfile,
    weight_table: &TopicWeightTable,
    now: chrono::DateTime<chrono::Utc>,
) -> Vec<TopicId> {
    let scored: Vec<(TopicId, f64)> = profile
        .topic_abilities
        .iter()
        .filter(|(_, ability)| ability.attempts > 0)
        .map(|(topic, ability)| {
            let weightage = weight_table.weightage(topic) as f64;
            let weakness_term = 1.0 - (ability.theta + 3.0) / 6.0;
            let days_since_last = ability
                .last_updated
                .map(|ts| (now - ts).num_days() as f64)
                .unwrap_or(f64::INFINITY);
            let recency_term = (days_since_last / 7.0).min(1.0);
            let priority = 0.6 * weakness_term + 0.2 * recency_term + 0.2 * weightage;
            (topic.clone(), priority)
        })
        .collect();

    sort_by_priority_desc(scored)
}

/// The 5 tested topics with the highest theta (the "strongest" topics), for
/// maintenance candidate selection (§9 open question: maintenance slots draw
/// from the learner's strongest topics, not their weakest, since reinforcing
/// mastered material is what "maintenance" means here). The caller
/// random-picks from this candidate set; this function only ranks it.
pub fn maintenance_candidates(profile: &LearnerProfile) -> Vec<TopicId> {
    let mut scored: Vec<(TopicId, f64)> = profile
        .topic_abilities
        .iter()
        .filter(|(_, ability)| ability.attempts > 0)
        .map(|(topic, ability)| (topic.clone(), ability.theta))
        .collect();

    scored.sort_by(|(topic_a, theta_a), (topic_b, theta_b)| {
        theta_b
            .partial_cmp(theta_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| topic_a.cmp(topic_b))
    });
    scored.into_iter().take(5).map(|(topic, _)| topic).collect()
}
