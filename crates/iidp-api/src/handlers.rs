//! The three wire-facing endpoints (§6): `POST /assessment`, `POST
//! /response`, `POST /quiz`.
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use validator::Validate;

use iidp_core::ItemId;

use crate::error::ApiError;
use crate::types::{
    AssessmentResponseInput, LearnerProfileSummary, NextQuizRequest, QuizResponse,
    StartAssessmentRequest, SubmitResponseReply, SubmitResponseRequest,
};
use crate::AppState;

fn validation_error(err: validator::ValidationErrors) -> ApiError {
    ApiError(iidp_core::IidpError::Precondition(err.to_string()))
}

pub async fn start_assessment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartAssessmentRequest>,
) -> Result<Json<LearnerProfileSummary>, ApiError> {
    req.validate().map_err(validation_error)?;

    let responses: Vec<iidp_core::Response> = req
        .responses
        .iter()
        .map(|r: &AssessmentResponseInput| {
            let mut response = iidp_core::Response::from(r);
            response.learner_id = req.learner_id.clone();
            response
        })
        .collect();

    let profile = state
        .engine
        .start_assessment(&req.learner_id, &responses)
        .await?;
    Ok(Json(LearnerProfileSummary::from(&profile)))
}

pub async fn submit_response(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitResponseRequest>,
) -> Result<Json<SubmitResponseReply>, ApiError> {
    req.validate().map_err(validation_error)?;

    let response = state
        .engine
        .submit_response(
            &req.learner_id,
            &ItemId::new(req.item_id),
            req.is_correct,
            req.elapsed_seconds,
        )
        .await?;
    Ok(Json(SubmitResponseReply::from(&response)))
}

pub async fn next_quiz(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NextQuizRequest>,
) -> Result<Json<QuizResponse>, ApiError> {
    req.validate().map_err(validation_error)?;

    let quiz = state.engine.next_quiz(&req.learner_id).await?;
    Ok(Json(QuizResponse::from(&quiz)))
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: &'static str,
}

pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let database = match iidp_storage::check_connection(&state.pool).await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };
    Json(ReadyResponse {
        status: if database == "connected" { "ok" } else { "degraded" },
        database,
    })
}
