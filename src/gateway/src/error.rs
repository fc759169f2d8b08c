use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Request-level failures of the order endpoint.
///
/// The display text is what the caller sees in the `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Error reading request body")]
    BodyRead(#[source] axum::Error),

    #[error("Invalid request payload")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Failed to produce order")]
    Publish(#[from] amqp::PublishError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::BodyRead(_) | Self::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
