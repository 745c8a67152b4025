//! Thin HTTP client over the assessment server's three endpoints.
use anyhow::{bail, Result};
use serde_json::{json, Value};

pub async fn start_assessment(server: &str, learner_id: &str) -> Result<Value> {
    post(server, "/v1/assessment", &json!({ "learner_id": learner_id, "responses": [] })).await
}

pub async fn submit_response(
    server: &str,
    learner_id: &str,
    item_id: &str,
    is_correct: bool,
    elapsed_seconds: u32,
) -> Result<Value> {
    post(
        server,
        "/v1/response",
        &json!({
            "learner_id": learner_id,
            "item_id": item_id,
            "is_correct": is_correct,
            "elapsed_seconds": elapsed_seconds,
        }),
    )
    .await
}

pub async fn next_quiz(server: &str, learner_id: &str) -> Result<Value> {
    post(server, "/v1/quiz", &json!({ "learner_id": learner_id })).await
}

async fn post(server: &str, path: &str, body: &Value) -> Result<Value> {
    let url = format!("{server}{path}");
    let response = reqwest::Client::new().post(&url).json(body).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await?;
        bail!("request to {path} failed with status {status}: {error_text}");
    }

    Ok(response.json().await?)
}
