/// In-memory `Repository` used by engine-level tests in place of the
/// sqlite-backed implementation.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{Item, ItemId, LearnerProfile, Quiz, Response, Result, TopicId};
use crate::ports::{EngineEvent, Repository};

#[derive(Default)]
pub struct InMemoryRepository {
    items: Mutex<HashMap<ItemId, Item>>,
    profiles: Mutex<HashMap<String, LearnerProfile>>,
    responses: Mutex<Vec<Response>>,
    quizzes: Mutex<Vec<Quiz>>,
    events: Mutex<Vec<EngineEvent>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Vec<Item>) -> Self {
        let repo = Self::new();
        let mut items = repo.items.lock().unwrap();
        for item in catalog {
            items.insert(item.id.clone(), item);
        }
        drop(items);
        repo
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<Item>> {
        Ok(self.items.lock().unwrap().get(item_id).cloned())
    }

    async fn query_items(&self, topic_id: &TopicId) -> Result<Vec<Item>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| &i.topic_id == topic_id)
            .cloned()
            .collect())
    }

    async fn list_topics(&self) -> Result<Vec<TopicId>> {
        let mut topics: Vec<TopicId> = self
            .items
            .lock()
            .unwrap()
            .values()
            .map(|i| i.topic_id.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        topics.sort();
        Ok(topics)
    }

    async fn get_profile(&self, learner_id: &str) -> Result<Option<LearnerProfile>> {
        Ok(self.profiles.lock().unwrap().get(learner_id).cloned())
    }

    async fn put_profile(&self, profile: &LearnerProfile) -> Result<()> {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.learner_id.clone(), profile.clone());
        Ok(())
    }

    async fn append_response(&self, response: &Response) -> Result<()> {
        self.responses.lock().unwrap().push(response.clone());
        Ok(())
    }

    async fn recent_responses(&self, learner_id: &str, limit: usize) -> Result<Vec<Response>> {
        let responses = self.responses.lock().unwrap();
        let mut matching: Vec<Response> = responses
            .iter()
            .filter(|r| r.learner_id == learner_id)
            .cloned()
            .collect();
        if matching.len() > limit {
            matching = matching.split_off(matching.len() - limit);
        }
        Ok(matching)
    }

    async fn correct_responses(
        &self,
        learner_id: &str,
        since: chrono::DateTime<chrono::Utc>,
        until: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Response>> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.learner_id == learner_id
                    && r.is_correct
                    && r.timestamp >= since
                    && r.timestamp <= until
            })
            .cloned()
            .collect())
    }

    async fn put_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.quizzes.lock().unwrap().push(quiz.clone());
        Ok(())
    }

    async fn log_event(&self, event: &EngineEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
