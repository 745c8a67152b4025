//! PostgreSQL-backed [`Repository`] implementation.
//!
//! The catalog (items, topics) lives in plain relational columns since the
//! selector filters on them directly. The learner profile — a nested
//! structure of per-topic ability state that changes shape as topics are
//! added — is stored as a single JSONB column per learner rather than
//! normalized; persisted state layout is explicitly opaque to the engine
//! (§6), and the port's `put_profile` already requires an atomic whole-row
//! replace, which a JSONB column gives for free.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use iidp_core::ports::repository::EngineEvent;
use iidp_core::{Item, ItemId, LearnerProfile, Quiz, Repository, Response, Result, TopicId};

use crate::error::map_sqlx_error;

#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"SELECT item_id, topic_id, item_type, difficulty_tier, irt_b, irt_a, irt_c
               FROM items WHERE item_id = $1"#,
        )
        .bind(item_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn query_items(&self, topic_id: &TopicId) -> Result<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"SELECT item_id, topic_id, item_type, difficulty_tier, irt_b, irt_a, irt_c
               FROM items WHERE topic_id = $1"#,
        )
        .bind(topic_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_topics(&self) -> Result<Vec<TopicId>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT topic_id FROM topics")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(|(id,)| TopicId::new(id)).collect())
    }

    async fn get_profile(&self, learner_id: &str) -> Result<Option<LearnerProfile>> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            "SELECT profile FROM learner_profiles WHERE learner_id = $1",
        )
        .bind(learner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|(json,)| {
            serde_json::from_value(json)
                .map_err(|e| iidp_core::IidpError::Precondition(e.to_string()))
        })
        .transpose()
    }

    async fn put_profile(&self, profile: &LearnerProfile) -> Result<()> {
        let json = serde_json::to_value(profile)
            .map_err(|e| iidp_core::IidpError::Precondition(e.to_string()))?;
        sqlx::query(
            r#"INSERT INTO learner_profiles (learner_id, profile, updated_at)
               VALUES ($1, $2, now())
               ON CONFLICT (learner_id) DO UPDATE SET profile = $2, updated_at = now()"#,
        )
        .bind(&profile.learner_id)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        tracing::debug!(learner_id = %profile.learner_id, "profile persisted");
        Ok(())
    }

    async fn append_response(&self, response: &Response) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO responses
               (learner_id, item_id, topic_id, is_correct, elapsed_seconds,
                theta_before, theta_after, delta_theta, se_before, se_after, recorded_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(&response.learner_id)
        .bind(response.item_id.as_str())
        .bind(response.topic_id.as_str())
        .bind(response.is_correct)
        .bind(response.elapsed_seconds as i32)
        .bind(response.theta_before)
        .bind(response.theta_after)
        .bind(response.delta_theta)
        .bind(response.se_before)
        .bind(response.se_after)
        .bind(response.timestamp)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        tracing::debug!(
            learner_id = %response.learner_id,
            item_id = %response.item_id.as_str(),
            is_correct = response.is_correct,
            "response recorded"
        );
        Ok(())
    }

    async fn recent_responses(&self, learner_id: &str, limit: usize) -> Result<Vec<Response>> {
        let rows = sqlx::query_as::<_, ResponseRow>(
            r#"SELECT learner_id, item_id, topic_id, is_correct, elapsed_seconds,
                      theta_before, theta_after, delta_theta, se_before, se_after, recorded_at
               FROM responses WHERE learner_id = $1
               ORDER BY recorded_at DESC LIMIT $2"#,
        )
        .bind(learner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        // The port documents oldest-first; the query above is newest-first
        // for an efficient LIMIT, so flip it back.
        let mut responses: Vec<Response> = rows.into_iter().map(Into::into).collect();
        responses.reverse();
        Ok(responses)
    }

    async fn correct_responses(
        &self,
        learner_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Response>> {
        let rows = sqlx::query_as::<_, ResponseRow>(
            r#"SELECT learner_id, item_id, topic_id, is_correct, elapsed_seconds,
                      theta_before, theta_after, delta_theta, se_before, se_after, recorded_at
               FROM responses
               WHERE learner_id = $1 AND is_correct = true
                 AND recorded_at >= $2 AND recorded_at <= $3
               ORDER BY recorded_at ASC"#,
        )
        .bind(learner_id)
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn put_quiz(&self, quiz: &Quiz) -> Result<()> {
        let item_ids: Vec<String> = quiz.item_ids.iter().map(|id| id.as_str().to_string()).collect();
        let topics: Vec<String> = quiz.topics.iter().map(|t| t.as_str().to_string()).collect();
        sqlx::query(
            r#"INSERT INTO quizzes
               (quiz_id, learner_id, quiz_number, phase, item_ids, topics, created_at, short_quiz)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (quiz_id) DO UPDATE SET
                 item_ids = $5, topics = $6, short_quiz = $8"#,
        )
        .bind(&quiz.id)
        .bind(&quiz.learner_id)
        .bind(quiz.quiz_number as i32)
        .bind(format!("{:?}", quiz.phase))
        .bind(serde_json::to_value(&item_ids).unwrap())
        .bind(serde_json::to_value(&topics).unwrap())
        .bind(quiz.created_at)
        .bind(quiz.short_quiz)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        if quiz.short_quiz {
            tracing::warn!(quiz_id = %quiz.id, learner_id = %quiz.learner_id, "short quiz persisted");
        }
        Ok(())
    }

    async fn log_event(&self, event: &EngineEvent) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO engine_events (learner_id, kind, detail, occurred_at)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&event.learner_id)
        .bind(&event.kind)
        .bind(&event.detail)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        tracing::info!(learner_id = %event.learner_id, kind = %event.kind, "engine event logged");
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    item_id: String,
    topic_id: String,
    item_type: String,
    difficulty_tier: String,
    irt_b: f64,
    irt_a: f64,
    irt_c: f64,
}

impl TryFrom<ItemRow> for Item {
    type Error = iidp_core::IidpError;

    fn try_from(row: ItemRow) -> std::result::Result<Self, Self::Error> {
        use iidp_core::{DifficultyTier, IrtParams, ItemType};

        let item_type = match row.item_type.as_str() {
            "single_choice" => ItemType::SingleChoice,
            "numeric" => ItemType::Numeric,
            other => {
                return Err(iidp_core::IidpError::Precondition(format!(
                    "unknown item_type {other}"
                )))
            }
        };
        let difficulty_tier = match row.difficulty_tier.as_str() {
            "easy" => DifficultyTier::Easy,
            "medium" => DifficultyTier::Medium,
            "hard" => DifficultyTier::Hard,
            other => {
                return Err(iidp_core::IidpError::Precondition(format!(
                    "unknown difficulty_tier {other}"
                )))
            }
        };
        let irt = IrtParams::new(row.irt_b, row.irt_a, row.irt_c)?;

        Ok(Item {
            id: ItemId::new(row.item_id),
            topic_id: TopicId::new(row.topic_id),
            item_type,
            difficulty_tier,
            irt,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ResponseRow {
    learner_id: String,
    item_id: String,
    topic_id: String,
    is_correct: bool,
    elapsed_seconds: i32,
    theta_before: f64,
    theta_after: f64,
    delta_theta: f64,
    se_before: f64,
    se_after: f64,
    recorded_at: DateTime<Utc>,
}

impl From<ResponseRow> for Response {
    fn from(row: ResponseRow) -> Self {
        Response {
            learner_id: row.learner_id,
            item_id: ItemId::new(row.item_id),
            topic_id: TopicId::new(row.topic_id),
            is_correct: row.is_correct,
            elapsed_seconds: row.elapsed_seconds as u32,
            theta_before: row.theta_before,
            theta_after: row.theta_after,
            delta_theta: row.delta_theta,
            se_before: row.se_before,
            se_after: row.se_after,
            timestamp: row.recorded_at,
        }
    }
}
