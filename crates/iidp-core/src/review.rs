/// Review selector: picks a single previously-mastered item as a
/// spaced-repetition candidate for a quiz's review slot (§4.7).
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::{ItemId, Response, TopicId};

/// Priority tier by days since the learner last answered an item correctly.
/// Higher tiers are more overdue for review; `None` (under a day) means the
/// item is too fresh to be a review candidate at all.
fn tier(days: i64) -> Option<u8> {
    if days >= 30 {
        Some(5)
    } else if days >= 14 {
        Some(4)
    } else if days >= 7 {
        Some(3)
    } else if days >= 3 {
        Some(2)
    } else if days >= 1 {
        Some(1)
    } else {
        None
    }
}

/// Collapses a response log down to, per item, the most recent correct
/// answer and the topic it belongs to. A learner may have answered the same
/// item correctly more than once; the most recent attempt is what should
/// drive "how overdue is this for review".
fn latest_correct_by_item(
    correct_responses: &[Response],
) -> HashMap<ItemId, (TopicId, DateTime<Utc>)> {
    let mut latest: HashMap<ItemId, (TopicId, DateTime<Utc>)> = HashMap::new();
    for r in correct_responses {
        latest
            .entry(r.item_id.clone())
            .and_modify(|(topic, ts)| {
                if r.timestamp > *ts {
                    *topic = r.topic_id.clone();
                    *ts = r.timestamp;
                }
            })
            .or_insert_with(|| (r.topic_id.clone(), r.timestamp));
    }
    latest
}

/// Picks the single best review candidate: among items previously answered
/// correctly and not in `recent_set`, the one maximizing `(tier, days_since)`
/// lexicographically, breaking ties on `ItemId` ascending for determinism.
/// Returns `None` if nothing qualifies.
pub fn pick_review_item(
    correct_responses: &[Response],
    recent_set: &HashSet<ItemId>,
    now: DateTime<Utc>,
) -> Option<(TopicId, ItemId)> {
    let mut scored: Vec<(ItemId, TopicId, u8, i64)> = latest_correct_by_item(correct_responses)
        .into_iter()
        .filter(|(id, _)| !recent_set.contains(id))
        .filter_map(|(id, (topic, ts))| {
            let days = (now - ts).num_days();
            tier(days).map(|t| (id, topic, t, days))
        })
        .collect();

    scored.sort_by(|(id_a, _, tier_a, days_a), (id_b, _, tier_b, days_b)| {
        tier_b
            .cmp(tier_a)
            .then_with(|| days_b.cmp(days_a))
            .then_with(|| id_a.cmp(id_b))
    });

    scored.into_iter().next().map(|(id, topic, _, _)| (topic, id))
}

/// Picks a review candidate restricted to `topics` and a specific
/// `[min_days, max_days)` staleness window, used by the circuit breaker's
/// recovery quiz (§4.6), which wants an item answered correctly 7-14 days
/// ago from the learner's weak topics specifically rather than the general
/// five-tier ranking above.
pub fn pick_item_in_window(
    correct_responses: &[Response],
    topics: &HashSet<TopicId>,
    recent_set: &HashSet<ItemId>,
    now: DateTime<Utc>,
    min_days: i64,
    max_days: i64,
) -> Option<(TopicId, ItemId)> {
    let mut candidates: Vec<(ItemId, TopicId, i64)> = latest_correct_by_item(correct_responses)
        .into_iter()
        .filter(|(id, (topic, _))| topics.contains(topic) && !recent_set.contains(id))
        .map(|(id, (topic, ts))| (id, topic, (now - ts).num_days()))
        .filter(|(_, _, days)| *days >= min_days && *days < max_days)
        .collect();

    candidates.sort_by(|(id_a, _, days_a), (id_b, _, days_b)| {
        days_b.cmp(days_a).then_with(|| id_a.cmp(id_b))
    });
    candidates.into_iter().next().map(|(id, topic, _)| (topic, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn correct_response(item: &str, topic: &str, days_ago: i64, now: DateTime<Utc>) -> Response {
        Response {
            learner_id: "l1".into(),
            item_id: ItemId::new(item),
            topic_id: TopicId::new(topic),
            is_correct: true,
            elapsed_seconds: 20,
            theta_before: 0.0,
            theta_after: 0.0,
            delta_theta: 0.0,
            se_before: 0.3,
            se_after: 0.3,
            timestamp: now - Duration::days(days_ago),
        }
    }

    #[test]
    fn items_younger_than_a_day_are_excluded() {
        let now = Utc::now();
        let responses = vec![correct_response("i1", "PHY:mechanics", 0, now)];
        assert!(pick_review_item(&responses, &HashSet::new(), now).is_none());
    }

    #[test]
    fn critical_tier_beats_lower_tiers() {
        let now = Utc::now();
        let responses = vec![
            correct_response("stale", "PHY:mechanics", 40, now),
            correct_response("fresh", "MATH:calculus", 2, now),
        ];
        let (_, picked) = pick_review_item(&responses, &HashSet::new(), now).unwrap();
        assert_eq!(picked, ItemId::new("stale"));
    }

    #[test]
    fn within_a_tier_more_stale_wins() {
        let now = Utc::now();
        let responses = vec![
            correct_response("a", "PHY:mechanics", 35, now),
            correct_response("b", "MATH:calculus", 60, now),
        ];
        let (_, picked) = pick_review_item(&responses, &HashSet::new(), now).unwrap();
        assert_eq!(picked, ItemId::new("b"));
    }

    #[test]
    fn recent_set_excludes_an_otherwise_qualifying_item() {
        let now = Utc::now();
        let responses = vec![correct_response("seen", "PHY:mechanics", 40, now)];
        let mut recent = HashSet::new();
        recent.insert(ItemId::new("seen"));
        assert!(pick_review_item(&responses, &recent, now).is_none());
    }

    #[test]
    fn most_recent_correct_attempt_wins_when_an_item_was_answered_twice() {
        let now = Utc::now();
        let responses = vec![
            correct_response("i1", "PHY:mechanics", 40, now),
            correct_response("i1", "PHY:mechanics", 2, now),
        ];
        let (_, picked) = pick_review_item(&responses, &HashSet::new(), now).unwrap();
        assert_eq!(picked, ItemId::new("i1"));
    }

    #[test]
    fn window_pick_restricts_to_given_topics_and_day_range() {
        let now = Utc::now();
        let responses = vec![
            correct_response("in_window", "PHY:mechanics", 10, now),
            correct_response("too_fresh", "PHY:mechanics", 2, now),
            correct_response("wrong_topic", "MATH:calculus", 10, now),
        ];
        let mut topics = HashSet::new();
        topics.insert(TopicId::new("PHY:mechanics"));
        let (_, picked) =
            pick_item_in_window(&responses, &topics, &HashSet::new(), now, 7, 14).unwrap();
        assert_eq!(picked, ItemId::new("in_window"));
    }
}
