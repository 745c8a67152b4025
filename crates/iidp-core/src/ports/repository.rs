/// The single abstract persistence boundary the engine depends on (§5).
///
/// One trait, not one per aggregate, because every operation the engine
/// performs against storage is part of a single learner-scoped unit of work;
/// splitting it into a content port and a user port (as the mobile app this
/// crate's storage layer is modeled on does) would just push the transaction
/// boundary into the caller.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Item, ItemId, LearnerProfile, Quiz, Response, Result, TopicId};

/// A domain event worth recording for observability/audit but not itself
/// part of the read model (e.g. `circuit_breaker_triggered`, `phase_switched`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineEvent {
    pub learner_id: String,
    pub kind: String,
    pub detail: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetches a single catalog item. `Ok(None)` means the id is unknown, not
    /// a transient failure.
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<Item>>;

    /// Candidate items for a topic, for the selector's filter cascade.
    /// Implementations are free to pre-filter by subject but must not filter
    /// by difficulty or recency themselves — that's the selector's job.
    async fn query_items(&self, topic_id: &TopicId) -> Result<Vec<Item>>;

    /// All distinct topic ids known to the catalog, for the exploration
    /// ranker's candidate pool.
    async fn list_topics(&self) -> Result<Vec<TopicId>>;

    /// Loads a learner's profile. `Ok(None)` means this learner has never
    /// been seen — the caller should run the initial-assessment path.
    async fn get_profile(&self, learner_id: &str) -> Result<Option<LearnerProfile>>;

    /// Persists a learner's profile. Implementations must make this an
    /// atomic replace of the prior row (see §7 no-partial-write invariant).
    async fn put_profile(&self, profile: &LearnerProfile) -> Result<()>;

    /// Appends one response to the immutable log.
    async fn append_response(&self, response: &Response) -> Result<()>;

    /// The learner's most recent `limit` responses, oldest first, for the
    /// circuit breaker's failure-streak check and the selector's recency
    /// exclusion set.
    async fn recent_responses(&self, learner_id: &str, limit: usize) -> Result<Vec<Response>>;

    /// Every response in `[since, until]` where the learner answered
    /// correctly, for the review selector's candidate pool (§4.7) and the
    /// circuit breaker's recovery review slot (§4.6).
    async fn correct_responses(
        &self,
        learner_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Response>>;

    /// Persists a composed quiz's metadata (not its items — those are
    /// already durable in the catalog).
    async fn put_quiz(&self, quiz: &Quiz) -> Result<()>;

    /// Appends a structured engine event for audit/observability.
    async fn log_event(&self, event: &EngineEvent) -> Result<()>;
}
