/// Quiz composer: turns a slot plan and ranked topic queues into an ordered
/// list of items, with no two adjacent items sharing a topic (§4.8).
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::ability::prior_for_untested_topic;
use crate::circuit_breaker;
use crate::config::{EngineConfig, TopicWeightTable};
use crate::domain::{Item, ItemId, LearnerProfile, LearningPhase, Quiz, Response, TopicId};
use crate::phase::{plan_slots, SlotPlan};
use crate::ports::EngineRng;
use crate::{ranker, review, selector};

/// A single (topic, item) pick before interleaving.
struct Pick {
    topic: TopicId,
    item: ItemId,
}

fn target_theta_for(profile: &LearnerProfile, topic: &TopicId) -> f64 {
    profile
        .topic_abilities
        .get(topic)
        .map(|a| a.theta)
        .unwrap_or_else(|| prior_for_untested_topic(profile, topic).theta)
}

/// Target theta for an exploration slot (§4.5): a never-attempted topic uses
/// the neutral low-medium `0.9`, not the fresh/inherited-prior theta (which
/// is usually still 0.0) — that's the whole point of exploration probing a
/// topic the learner has no signal on yet.
fn target_theta_for_exploration(profile: &LearnerProfile, topic: &TopicId) -> f64 {
    let attempts = profile.topic_attempt_counts.get(topic).copied().unwrap_or(0);
    if attempts == 0 {
        0.9
    } else {
        target_theta_for(profile, topic)
    }
}

/// Fills up to `count` slots from `queue` in rank order. A topic can supply
/// more than one slot — the weakest topic legitimately earns repeated
/// reinforcement — as long as the selector keeps finding a fresh item for it
/// (`recently_answered_and_picked` rules out anything already chosen this
/// quiz or previously answered). One pass over `queue` per slot; a topic the
/// selector has exhausted is skipped for the rest of this category without
/// being excluded from later categories.
fn fill_slots(
    queue: &[TopicId],
    count: usize,
    profile: &LearnerProfile,
    candidates_by_topic: &HashMap<TopicId, Vec<Item>>,
    recently_answered_and_picked: &mut HashSet<ItemId>,
    config: &EngineConfig,
    target_theta_for_topic: impl Fn(&LearnerProfile, &TopicId) -> f64,
) -> Vec<Pick> {
    let mut picks = Vec::new();
    let mut exhausted: HashSet<&TopicId> = HashSet::new();

    while picks.len() < count {
        let mut made_progress = false;
        for topic in queue {
            if picks.len() >= count {
                break;
            }
            if exhausted.contains(topic) {
                continue;
            }
            let Some(candidates) = candidates_by_topic.get(topic) else {
                exhausted.insert(topic);
                continue;
            };
            let target_theta = target_theta_for_topic(profile, topic);
            match selector::select_item(
                candidates,
                topic,
                target_theta,
                recently_answered_and_picked,
                config,
            ) {
                Some(selection) => {
                    recently_answered_and_picked.insert(selection.item_id.clone());
                    picks.push(Pick {
                        topic: topic.clone(),
                        item: selection.item_id,
                    });
                    made_progress = true;
                }
                None => {
                    exhausted.insert(topic);
                }
            }
        }
        if !made_progress {
            break;
        }
    }
    picks
}

/// Picks the single review-slot item against the general five-tier ranking
/// (§4.7). Every phase's slot plan asks for exactly one review slot, so this
/// never needs to loop the way [`fill_slots`] does.
fn fill_review_slot(
    correct_responses: &[Response],
    recently_answered_and_picked: &mut HashSet<ItemId>,
    now: DateTime<Utc>,
) -> Vec<Pick> {
    match review::pick_review_item(correct_responses, recently_answered_and_picked, now) {
        Some((topic, item)) => {
            recently_answered_and_picked.insert(item.clone());
            vec![Pick { topic, item }]
        }
        None => Vec::new(),
    }
}

/// Randomly selects `count` topics from `candidates` using `rng`, without
/// replacement. Used for maintenance slots, whose candidate set (§9 open
/// question) is the 5 strongest tested topics, 2 of which are drawn at
/// random rather than always the top 2.
fn random_pick(mut candidates: Vec<TopicId>, count: usize, rng: &mut dyn EngineRng) -> Vec<TopicId> {
    let mut picked = Vec::new();
    while picked.len() < count && !candidates.is_empty() {
        let idx = rng.choose_index(candidates.len());
        picked.push(candidates.remove(idx));
    }
    picked
}

/// Rearranges picks so no two adjacent items share a topic. Groups remain in
/// their incoming relative order within a topic; at each step the topic with
/// the most remaining items is placed next, ties broken by `rng`. Falls back
/// to placing a same-topic item back-to-back only when every remaining item
/// shares the topic just placed (nothing else to interleave with).
fn interleave(picks: Vec<Pick>, rng: &mut dyn EngineRng) -> Vec<ItemId> {
    let mut groups: Vec<(TopicId, Vec<ItemId>)> = Vec::new();
    for pick in picks {
        match groups.iter_mut().find(|(topic, _)| *topic == pick.topic) {
            Some((_, items)) => items.push(pick.item),
            None => groups.push((pick.topic, vec![pick.item])),
        }
    }

    let total: usize = groups.iter().map(|(_, items)| items.len()).sum();
    let mut result = Vec::with_capacity(total);
    let mut last_topic: Option<TopicId> = None;

    for _ in 0..total {
        let mut candidate_idxs: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, (topic, items))| !items.is_empty() && Some(topic) != last_topic.as_ref())
            .map(|(i, _)| i)
            .collect();
        if candidate_idxs.is_empty() {
            candidate_idxs = groups
                .iter()
                .enumerate()
                .filter(|(_, (_, items))| !items.is_empty())
                .map(|(i, _)| i)
                .collect();
        }
        let Some(&max_remaining) = candidate_idxs
            .iter()
            .map(|&i| groups[i].1.len())
            .collect::<Vec<_>>()
            .iter()
            .max()
        else {
            break;
        };
        let tied: Vec<usize> = candidate_idxs
            .into_iter()
            .filter(|&i| groups[i].1.len() == max_remaining)
            .collect();
        let pick_idx = if tied.len() == 1 {
            tied[0]
        } else {
            tied[rng.choose_index(tied.len())]
        };
        let item = groups[pick_idx].1.remove(0);
        last_topic = Some(groups[pick_idx].0.clone());
        result.push(item);
    }
    result
}

fn finish_quiz(
    profile: &LearnerProfile,
    picks: Vec<Pick>,
    phase: LearningPhase,
    now: DateTime<Utc>,
    config: &EngineConfig,
    rng: &mut dyn EngineRng,
) -> Quiz {
    let topics: HashSet<TopicId> = picks.iter().map(|p| p.topic.clone()).collect();
    let short_quiz = picks.len() < config.quiz_length;
    let item_ids = interleave(picks, rng);

    Quiz {
        id: format!("{}-{}", profile.learner_id, profile.completed_quiz_count + 1),
        learner_id: profile.learner_id.clone(),
        quiz_number: profile.completed_quiz_count + 1,
        phase,
        item_ids,
        topics,
        created_at: now,
        short_quiz,
    }
}

/// Composes the next quiz for a learner. `candidates_by_topic` must already
/// contain every topic the ranked queues could plausibly surface; a topic
/// missing from it is treated the same as one with no remaining candidates.
/// `correct_responses` feeds the review slot and, in recovery, the
/// weak-topic review item; callers can pass an empty slice for a
/// newly-started learner.
#[allow(clippy::too_many_arguments)]
pub fn compose_quiz(
    profile: &LearnerProfile,
    catalog_topics: &[TopicId],
    candidates_by_topic: &HashMap<TopicId, Vec<Item>>,
    correct_responses: &[Response],
    already_recently_answered: &HashSet<ItemId>,
    weight_table: &TopicWeightTable,
    config: &EngineConfig,
    phase: LearningPhase,
    now: DateTime<Utc>,
    rng: &mut dyn EngineRng,
) -> Quiz {
    let mut consumed = already_recently_answered.clone();

    if phase == LearningPhase::Recovery {
        let weakest_topics = ranker::rank_for_exploitation(profile, weight_table, now);
        let picks: Vec<Pick> = circuit_breaker::compose_recovery_quiz(
            &weakest_topics,
            candidates_by_topic,
            correct_responses,
            &consumed,
            now,
        )
        .into_iter()
        .map(|(topic, item)| Pick { topic, item })
        .collect();
        return finish_quiz(profile, picks, phase, now, config, rng);
    }

    let plan: SlotPlan = plan_slots(phase, profile.completed_quiz_count, config);
    let mut all_picks = Vec::new();

    if plan.explore > 0 {
        let queue = ranker::rank_for_exploration(profile, catalog_topics, weight_table);
        all_picks.extend(fill_slots(
            &queue,
            plan.explore,
            profile,
            candidates_by_topic,
            &mut consumed,
            config,
            target_theta_for_exploration,
        ));
    }
    if plan.weak > 0 {
        let queue = ranker::rank_for_exploitation(profile, weight_table, now);
        all_picks.extend(fill_slots(
            &queue,
            plan.weak,
            profile,
            candidates_by_topic,
            &mut consumed,
            config,
            target_theta_for,
        ));
    }
    if plan.maintenance > 0 {
        let candidates = ranker::maintenance_candidates(profile);
        let queue = random_pick(candidates, plan.maintenance, rng);
        all_picks.extend(fill_slots(
            &queue,
            plan.maintenance,
            profile,
            candidates_by_topic,
            &mut consumed,
            config,
            target_theta_for,
        ));
    }
    if plan.review > 0 {
        all_picks.extend(fill_review_slot(correct_responses, &mut consumed, now));
    }

    finish_quiz(profile, all_picks, phase, now, config, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DifficultyTier, IrtParams, ItemType, TopicAbility};
    use crate::ports::rng::SequenceRng;

    fn item(id: &str, topic: &str) -> Item {
        Item {
            id: ItemId::new(id),
            topic_id: TopicId::new(topic),
            item_type: ItemType::SingleChoice,
            difficulty_tier: DifficultyTier::Medium,
            irt: IrtParams::new(0.5, 1.5, 0.25).unwrap(),
        }
    }

    fn candidates() -> HashMap<TopicId, Vec<Item>> {
        let mut map = HashMap::new();
        map.insert(
            TopicId::new("PHY:mechanics"),
            vec![item("phy-1", "PHY:mechanics"), item("phy-2", "PHY:mechanics")],
        );
        map.insert(
            TopicId::new("MATH:calculus"),
            vec![item("math-1", "MATH:calculus"), item("math-2", "MATH:calculus")],
        );
        map.insert(
            TopicId::new("CHEM:organic_chemistry"),
            vec![item("chem-1", "CHEM:organic_chemistry")],
        );
        map
    }

    #[test]
    fn composed_quiz_never_has_adjacent_same_topic_when_alternatives_exist() {
        let mut profile = LearnerProfile::new("l1");
        for (topic, theta) in [
            ("PHY:mechanics", -1.0),
            ("MATH:calculus", 0.5),
            ("CHEM:organic_chemistry", 1.0),
        ] {
            profile.topic_abilities.insert(
                TopicId::new(topic),
                TopicAbility { theta, se: 0.3, attempts: 5, accuracy: Some(0.5), last_updated: None },
            );
            profile.topic_attempt_counts.insert(TopicId::new(topic), 5);
        }
        let config = EngineConfig::default();
        let weight_table = TopicWeightTable::jee_seed();
        let topics = vec![
            TopicId::new("PHY:mechanics"),
            TopicId::new("MATH:calculus"),
            TopicId::new("CHEM:organic_chemistry"),
        ];
        let mut rng = SequenceRng::new(vec![0, 1, 0, 1]);

        let quiz = compose_quiz(
            &profile,
            &topics,
            &candidates(),
            &[],
            &HashSet::new(),
            &weight_table,
            &config,
            LearningPhase::Exploitation,
            Utc::now(),
            &mut rng,
        );

        for pair in quiz.item_ids.windows(2) {
            let topic_a = candidates()
                .values()
                .flatten()
                .find(|i| i.id == pair[0])
                .unwrap()
                .topic_id
                .clone();
            let topic_b = candidates()
                .values()
                .flatten()
                .find(|i| i.id == pair[1])
                .unwrap()
                .topic_id
                .clone();
            assert_ne!(topic_a, topic_b);
        }
    }

    #[test]
    fn short_quiz_flag_set_when_catalog_is_thin() {
        let profile = LearnerProfile::new("l1");
        let config = EngineConfig::default();
        let weight_table = TopicWeightTable::jee_seed();
        let topics = vec![TopicId::new("MATH:algebra")];
        let mut thin_candidates = HashMap::new();
        thin_candidates.insert(
            TopicId::new("MATH:algebra"),
            vec![item("only-one", "MATH:algebra")],
        );
        let mut rng = SequenceRng::new(vec![0]);

        let quiz = compose_quiz(
            &profile,
            &topics,
            &thin_candidates,
            &[],
            &HashSet::new(),
            &weight_table,
            &config,
            LearningPhase::Exploration,
            Utc::now(),
            &mut rng,
        );

        assert!(quiz.short_quiz);
        assert!(quiz.item_ids.len() < config.quiz_length);
    }

    #[test]
    fn exploration_targets_0_9_for_a_never_attempted_topic() {
        // A fresh learner's exploration slot must probe at target theta 0.9
        // (§4.5), not the inherited 0.0 prior — so the item near b=0.9 should
        // win over the one near b=0.0 despite both carrying equal discrimination.
        let profile = LearnerProfile::new("l1");
        let config = EngineConfig::default();
        let weight_table = TopicWeightTable::jee_seed();
        let topics = vec![TopicId::new("MATH:algebra")];
        let mut candidates_by_topic = HashMap::new();
        candidates_by_topic.insert(
            TopicId::new("MATH:algebra"),
            vec![
                Item {
                    id: ItemId::new("near-zero"),
                    topic_id: TopicId::new("MATH:algebra"),
                    item_type: ItemType::SingleChoice,
                    difficulty_tier: DifficultyTier::Easy,
                    irt: IrtParams::new(0.05, 1.5, 0.25).unwrap(),
                },
                Item {
                    id: ItemId::new("near-point-nine"),
                    topic_id: TopicId::new("MATH:algebra"),
                    item_type: ItemType::SingleChoice,
                    difficulty_tier: DifficultyTier::Medium,
                    irt: IrtParams::new(0.9, 1.5, 0.25).unwrap(),
                },
            ],
        );
        let mut rng = SequenceRng::new(vec![0]);

        let quiz = compose_quiz(
            &profile,
            &topics,
            &candidates_by_topic,
            &[],
            &HashSet::new(),
            &weight_table,
            &config,
            LearningPhase::Exploration,
            Utc::now(),
            &mut rng,
        );

        assert_eq!(quiz.item_ids[0], ItemId::new("near-point-nine"));
    }

    #[test]
    fn recovery_phase_delegates_to_circuit_breaker_composition() {
        let mut profile = LearnerProfile::new("l1");
        let topics = [
            "PHY:mechanics",
            "MATH:calculus",
            "CHEM:organic_chemistry",
            "MATH:algebra",
        ];
        for (i, topic) in topics.iter().enumerate() {
            profile.topic_abilities.insert(
                TopicId::new(*topic),
                TopicAbility {
                    theta: -2.0 + i as f64 * 0.2,
                    se: 0.3,
                    attempts: 5,
                    accuracy: Some(0.2),
                    last_updated: None,
                },
            );
        }
        let config = EngineConfig::default();
        let weight_table = TopicWeightTable::jee_seed();
        let topic_ids: Vec<TopicId> = topics.iter().map(|t| TopicId::new(*t)).collect();

        let mut candidates_by_topic = HashMap::new();
        for topic in &topic_ids {
            let items: Vec<Item> = (0..5)
                .map(|i| {
                    let mut it = item(&format!("{topic}-{i}"), topic.as_str());
                    it.irt = IrtParams::new(0.5, 1.2, 0.25).unwrap();
                    it
                })
                .collect();
            candidates_by_topic.insert(topic.clone(), items);
        }

        let mut rng = SequenceRng::new(vec![0, 1, 2]);
        let quiz = compose_quiz(
            &profile,
            &topic_ids,
            &candidates_by_topic,
            &[],
            &HashSet::new(),
            &weight_table,
            &config,
            LearningPhase::Recovery,
            Utc::now(),
            &mut rng,
        );
        assert_eq!(quiz.phase, LearningPhase::Recovery);
        assert!(quiz.item_ids.len() <= config.quiz_length);
    }
}
