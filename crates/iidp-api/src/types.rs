//! Wire-facing request/response schemas. Field shapes mirror the domain
//! entities in §3 directly; these types exist only to decouple the JSON
//! boundary from the engine's internal structs (e.g. a submitted assessment
//! response has no `theta_before`/`theta_after` yet).
use chrono::{DateTime, Utc};
use iidp_core::{ItemId, LearnerProfile, Quiz, Response, TopicId};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AssessmentResponseInput {
    #[validate(length(min = 1))]
    pub item_id: String,
    #[validate(length(min = 1))]
    pub topic_id: String,
    pub is_correct: bool,
    pub elapsed_seconds: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartAssessmentRequest {
    #[validate(length(min = 1))]
    pub learner_id: String,
    /// Empty is valid (§6): a learner with no prior responses still gets a
    /// fresh cold-start profile.
    pub responses: Vec<AssessmentResponseInput>,
}

impl From<&AssessmentResponseInput> for Response {
    fn from(input: &AssessmentResponseInput) -> Self {
        Response {
            learner_id: String::new(),
            item_id: ItemId::new(input.item_id.clone()),
            topic_id: TopicId::new(input.topic_id.clone()),
            is_correct: input.is_correct,
            elapsed_seconds: input.elapsed_seconds,
            theta_before: 0.0,
            theta_after: 0.0,
            delta_theta: 0.0,
            se_before: 0.0,
            se_after: 0.0,
            timestamp: input.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LearnerProfileSummary {
    pub learner_id: String,
    pub overall_theta: f64,
    pub overall_percentile: f64,
    pub completed_quiz_count: u32,
    pub learning_phase: String,
}

impl From<&LearnerProfile> for LearnerProfileSummary {
    fn from(profile: &LearnerProfile) -> Self {
        Self {
            learner_id: profile.learner_id.clone(),
            overall_theta: profile.overall_theta,
            overall_percentile: iidp_core::irt::theta_to_percentile(profile.overall_theta),
            completed_quiz_count: profile.completed_quiz_count,
            learning_phase: format!("{:?}", profile.learning_phase).to_lowercase(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitResponseRequest {
    #[validate(length(min = 1))]
    pub learner_id: String,
    #[validate(length(min = 1))]
    pub item_id: String,
    pub is_correct: bool,
    pub elapsed_seconds: u32,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponseReply {
    pub theta_before: f64,
    pub theta_after: f64,
    pub delta_theta: f64,
}

impl From<&Response> for SubmitResponseReply {
    fn from(r: &Response) -> Self {
        Self {
            theta_before: r.theta_before,
            theta_after: r.theta_after,
            delta_theta: r.delta_theta,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NextQuizRequest {
    #[validate(length(min = 1))]
    pub learner_id: String,
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub quiz_id: String,
    pub learner_id: String,
    pub quiz_number: u32,
    pub phase: String,
    pub item_ids: Vec<String>,
    pub topics: Vec<String>,
    pub short_quiz: bool,
}

impl From<&Quiz> for QuizResponse {
    fn from(quiz: &Quiz) -> Self {
        Self {
            quiz_id: quiz.id.clone(),
            learner_id: quiz.learner_id.clone(),
            quiz_number: quiz.quiz_number,
            phase: format!("{:?}", quiz.phase).to_lowercase(),
            item_ids: quiz.item_ids.iter().map(|id| id.as_str().to_string()).collect(),
            topics: quiz.topics.iter().map(|t| t.as_str().to_string()).collect(),
            short_quiz: quiz.short_quiz,
        }
    }
}
