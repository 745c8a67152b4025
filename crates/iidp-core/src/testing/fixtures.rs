/// Sample JEE catalog data for tests: a handful of items per topic across
/// all three subjects, spanning easy/medium/hard difficulty tiers.
use crate::config::difficulty_tier_for_b;
use crate::domain::{Item, IrtParams, ItemId, ItemType, TopicId};

fn item(id: &str, topic: &str, b: f64, a: f64, c: f64) -> Item {
    Item {
        id: ItemId::new(id),
        topic_id: TopicId::new(topic),
        item_type: ItemType::SingleChoice,
        difficulty_tier: difficulty_tier_for_b(b),
        irt: IrtParams::new(b, a, c).unwrap(),
    }
}

/// A small but structurally representative catalog: 5 topics, 4 items each,
/// spread across the difficulty tiers the selector's filter cascade cares
/// about.
pub fn sample_catalog() -> Vec<Item> {
    let mut items = Vec::new();
    let topics = [
        "PHY:mechanics",
        "PHY:optics",
        "CHEM:organic_chemistry",
        "MATH:calculus",
        "MATH:algebra",
    ];
    for topic in topics {
        for (i, (b, a, c)) in [
            (0.4, 1.2, 0.25),
            (1.0, 1.5, 0.25),
            (1.6, 1.7, 0.2),
            (2.4, 1.9, 0.15),
        ]
        .into_iter()
        .enumerate()
        {
            items.push(item(&format!("{topic}-{i}"), topic, b, a, c));
        }
    }
    items
}

pub fn sample_topics() -> Vec<TopicId> {
    sample_catalog()
        .iter()
        .map(|i| i.topic_id.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect()
}
