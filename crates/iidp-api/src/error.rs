//! Maps the engine's [`IidpError`] taxonomy onto HTTP status codes (§7).
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use iidp_core::IidpError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub struct ApiError(pub IidpError);

impl From<IidpError> for ApiError {
    fn from(err: IidpError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IidpError::NotFound(_) => StatusCode::NOT_FOUND,
            IidpError::Precondition(_) => StatusCode::BAD_REQUEST,
            IidpError::InsufficientCandidates => StatusCode::UNPROCESSABLE_ENTITY,
            IidpError::Conflict(_) => StatusCode::CONFLICT,
            IidpError::TransientIo(_) => StatusCode::SERVICE_UNAVAILABLE,
            IidpError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        };
        if matches!(self.0, IidpError::TransientIo(_)) {
            tracing::error!("transient storage error: {}", self.0);
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}
