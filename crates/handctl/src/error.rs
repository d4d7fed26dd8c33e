//! Request-level failures and how they are reported to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use handctl_image::DecodeError;
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong while turning a request into a [`Command`].
///
/// [`Command`]: crate::gesture::Command
#[derive(Debug, Error)]
pub enum GestureError {
    /// The request body did not carry an `image` field.
    #[error("No image received")]
    Input,

    /// The `image` field could not be turned into a frame.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The hand detector failed or panicked.
    #[error("hand detection failed: {0:#}")]
    Detection(anyhow::Error),
}

impl GestureError {
    pub fn status(&self) -> StatusCode {
        match self {
            GestureError::Input => StatusCode::BAD_REQUEST,
            GestureError::Decode(_) | GestureError::Detection(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GestureError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        log::warn!("request failed ({}): {}", status, message);
        (status, Json(json!({ "error": message }))).into_response()
    }
}
