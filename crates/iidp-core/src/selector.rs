/// Item selector: given a topic and a target theta, picks the single best
/// candidate item (§4.5). Applies a strict filter first and relaxes it in
/// stages rather than failing outright, so a quiz still fills when the
/// catalog is thin for a topic.
use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::domain::{Item, ItemId, TopicId};
use crate::irt;

/// Why a candidate set at a given relaxation stage was accepted; surfaced so
/// callers/tests can tell how far the cascade had to fall back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxationStage {
    /// Topic match, not recently answered, `a >= a_min`, within the optimal
    /// difficulty window — all four filters of §4.5.
    Strict,
    /// Constraint (3), `a >= a_min`, dropped.
    DiscriminationRelaxed,
    /// Constraints (3) and (4) (difficulty window) both dropped; recency
    /// is still honored.
    DifficultyRelaxed,
    /// Every constraint but topic match dropped, including recency. Not part
    /// of §4.5's mandated cascade, but needed so a quiz doesn't come up short
    /// when a topic's entire catalog has been recently answered.
    RecencyRelaxed,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub item_id: ItemId,
    pub stage: RelaxationStage,
}

/// Picks the item within `candidates` (already filtered to the right subject
/// if the caller cares) maximizing Fisher information at `target_theta`,
/// breaking ties by `ItemId` ascending for determinism.
fn best_by_fisher_info<'a>(candidates: impl Iterator<Item = &'a Item>, target_theta: f64) -> Option<&'a Item> {
    candidates
        .max_by(|a, b| {
            let info_a = irt::fisher_info(target_theta, &a.irt);
            let info_b = irt::fisher_info(target_theta, &b.irt);
            info_a
                .partial_cmp(&info_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.id.cmp(&a.id))
        })
}

/// Selects the best item for `topic` at `target_theta`, cascading through
/// [`RelaxationStage`]s until a candidate is found: the strict filter (all
/// four constraints of §4.5), then constraint (3) `a_min` dropped, then
/// constraint (4) the difficulty window also dropped, then (as an
/// implementation extension) recency itself dropped. Returns `None` only
/// when no item in `candidates` belongs to `topic` at all — the caller
/// should treat that as exhausted for this topic and try the next-ranked one.
pub fn select_item(
    candidates: &[Item],
    topic: &TopicId,
    target_theta: f64,
    recently_answered: &HashSet<ItemId>,
    config: &EngineConfig,
) -> Option<Selection> {
    select_item_with_a_min(
        candidates,
        topic,
        target_theta,
        recently_answered,
        config.min_discrimination,
        config,
    )
}

/// As [`select_item`] but with an explicit discrimination floor rather than
/// `config.min_discrimination`, for callers (exploration's first-contact
/// items, tests) that need a specific `a_min`.
pub fn select_item_with_a_min(
    candidates: &[Item],
    topic: &TopicId,
    target_theta: f64,
    recently_answered: &HashSet<ItemId>,
    a_min: f64,
    config: &EngineConfig,
) -> Option<Selection> {
    let same_topic: Vec<&Item> = candidates.iter().filter(|i| &i.topic_id == topic).collect();
    if same_topic.is_empty() {
        return None;
    }

    let strict = same_topic.iter().copied().filter(|i| {
        !recently_answered.contains(&i.id)
            && i.irt.a >= a_min
            && (i.irt.b - target_theta).abs() <= config.optimal_difficulty_window
    });
    if let Some(item) = best_by_fisher_info(strict, target_theta) {
        return Some(Selection {
            item_id: item.id.clone(),
            stage: RelaxationStage::Strict,
        });
    }

    let discrimination_relaxed = same_topic.iter().copied().filter(|i| {
        !recently_answered.contains(&i.id)
            && (i.irt.b - target_theta).abs() <= config.optimal_difficulty_window
    });
    if let Some(item) = best_by_fisher_info(discrimination_relaxed, target_theta) {
        return Some(Selection {
            item_id: item.id.clone(),
            stage: RelaxationStage::DiscriminationRelaxed,
        });
    }

    let difficulty_relaxed = same_topic
        .iter()
        .copied()
        .filter(|i| !recently_answered.contains(&i.id));
    if let Some(item) = best_by_fisher_info(difficulty_relaxed, target_theta) {
        return Some(Selection {
            item_id: item.id.clone(),
            stage: RelaxationStage::DifficultyRelaxed,
        });
    }

    let recency_relaxed = same_topic.iter().copied();
    best_by_fisher_info(recency_relaxed, target_theta).map(|item| Selection {
        item_id: item.id.clone(),
        stage: RelaxationStage::RecencyRelaxed,
    })
}

/// Selects an item for `topic` within a fixed `(min_b, max_b)` difficulty
/// band and `a_min` discrimination floor, used by the circuit breaker's
/// recovery composition (§4.6) rather than a continuous target theta. Falls
/// back by relaxing `a_min` first, then the `b` band, but never selects an
/// item in `excluded` — the recovery quiz must not resurface a recently
/// answered item even when every other constraint has to give.
pub fn select_constrained(
    candidates: &[Item],
    topic: &TopicId,
    b_range: (f64, f64),
    a_min: f64,
    excluded: &HashSet<ItemId>,
) -> Option<ItemId> {
    let target_theta = (b_range.0 + b_range.1) / 2.0;
    let same_topic: Vec<&Item> = candidates.iter().filter(|i| &i.topic_id == topic).collect();

    let strict = same_topic.iter().copied().filter(|i| {
        !excluded.contains(&i.id)
            && i.irt.a >= a_min
            && i.irt.b >= b_range.0
            && i.irt.b <= b_range.1
    });
    if let Some(item) = best_by_fisher_info(strict, target_theta) {
        return Some(item.id.clone());
    }

    let discrimination_relaxed = same_topic
        .iter()
        .copied()
        .filter(|i| !excluded.contains(&i.id) && i.irt.b >= b_range.0 && i.irt.b <= b_range.1);
    if let Some(item) = best_by_fisher_info(discrimination_relaxed, target_theta) {
        return Some(item.id.clone());
    }

    let band_relaxed = same_topic.iter().copied().filter(|i| !excluded.contains(&i.id));
    best_by_fisher_info(band_relaxed, target_theta).map(|item| item.id.clone())
}
