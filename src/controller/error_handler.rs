//! Centralized handling of controller failures.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ControllerError;

/// `status` of the fallback envelope.
pub const FALLBACK_STATUS: &str = "ERROR";
/// `message` of the fallback envelope.
pub const FALLBACK_MESSAGE: &str = "Internal server error";
/// `error` of the fallback envelope when details are hidden.
pub const FALLBACK_PLACEHOLDER: &str = "Unknown error";

/// Body written by the fallback handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always [`FALLBACK_STATUS`].
    pub status: String,
    /// Always [`FALLBACK_MESSAGE`].
    pub message: String,
    /// Error text or [`FALLBACK_PLACEHOLDER`].
    pub error: String,
}

impl ErrorEnvelope {
    /// Envelope for `err`.
    pub fn new(err: &ControllerError, expose_details: bool) -> Self {
        let error = if expose_details {
            err.to_string()
        } else {
            FALLBACK_PLACEHOLDER.to_string()
        };

        Self {
            status: FALLBACK_STATUS.to_string(),
            message: FALLBACK_MESSAGE.to_string(),
            error,
        }
    }
}

/// Turns a controller failure into the response for the request.
///
/// Every controller delegates infrastructure failures (selector errors,
/// service errors, panics, status resolution) here. Share one handler
/// between controllers to keep error bodies uniform.
#[derive(Clone)]
pub struct ErrorHandler {
    handle: Arc<dyn Fn(ControllerError) -> Response + Send + Sync>,
}

impl ErrorHandler {
    /// Handler from a function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ControllerError) -> Response + Send + Sync + 'static,
    {
        Self {
            handle: Arc::new(f),
        }
    }

    /// HTTP 500 with an [`ErrorEnvelope`].
    pub fn fallback(expose_details: bool) -> Self {
        Self::new(move |err| fallback_response(&err, expose_details))
    }

    /// Produce the response for `err`.
    pub fn handle(&self, err: ControllerError) -> Response {
        (self.handle)(err)
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::fallback(true)
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler").finish_non_exhaustive()
    }
}

/// HTTP 500 carrying the fallback envelope for `err`.
pub fn fallback_response(err: &ControllerError, expose_details: bool) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorEnvelope::new(err, expose_details)),
    )
        .into_response()
}
