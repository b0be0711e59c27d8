//! Unified error types for controllers and status resolution.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

use crate::controller::RequestKey;
use crate::status::StatusGroup;

/// Status key resolution errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// Name is not part of any status group.
    #[error("unknown status key: {0}")]
    UnknownStatusKey(String),

    /// Key exists but belongs to the wrong group.
    #[error("status key {key} belongs to the {actual} group, expected {expected}")]
    GroupMismatch {
        /// The offending key.
        key: String,
        /// Group the key belongs to.
        actual: StatusGroup,
        /// Group(s) that were allowed.
        expected: &'static str,
    },
}

/// Errors raised while extracting service input from a request.
#[derive(Error, Debug)]
pub enum SelectorError {
    /// Reading the request body failed (e.g. limit exceeded).
    #[error("failed to read request body: {0}")]
    Body(#[source] Arc<axum::Error>),

    /// Request body is not JSON.
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Path parameters could not be extracted.
    #[error("failed to extract path parameters: {0}")]
    Params(String),

    /// Query string could not be parsed.
    #[error("failed to parse query string: {0}")]
    Query(String),

    /// A named value is absent from the request.
    #[error("missing {location} value `{name}`")]
    Missing {
        /// Request section that was searched.
        location: RequestKey,
        /// Name of the value.
        name: String,
    },

    /// Selected value does not match the service input type.
    #[error("failed to deserialize service input: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// Selector panicked.
    #[error("selector panicked: {0}")]
    Panicked(String),

    /// Custom selector failure.
    #[error("{0}")]
    Invalid(String),
}

/// Infrastructure failures inside a controller pipeline.
///
/// Business failures are not errors here; services report them as the
/// error variant of a [`crate::ServiceResponse`].
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Input selection failed.
    #[error("input selection failed: {0}")]
    Selector(#[from] SelectorError),

    /// Service function returned an error.
    #[error("service failed: {0}")]
    Service(#[source] anyhow::Error),

    /// Service function panicked.
    #[error("service panicked: {0}")]
    ServicePanicked(String),

    /// Service returned a status the table cannot resolve.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Response body could not be serialized.
    #[error("failed to serialize service response: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ControllerError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Selector(_) => "selector",
            Self::Service(_) => "service",
            Self::ServicePanicked(_) => "service_panic",
            Self::Status(_) => "status",
            Self::Serialize(_) => "serialize",
        }
    }
}

/// Errors decoding a [`crate::ServiceResponse`] from JSON.
#[derive(Error, Debug)]
pub enum ResponseError {
    /// The `status` key is absent or not a string.
    #[error("service response has no string `status` field")]
    MissingStatus,

    /// The `status` key is not in the table.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Remaining fields do not match the variant.
    #[error("malformed service response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Render a panic payload as text.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        let err = ControllerError::from(SelectorError::Invalid("bad".into()));
        assert_eq!(err.kind(), "selector");
        assert_eq!(err.to_string(), "input selection failed: bad");

        let err = ControllerError::Service(anyhow::anyhow!("db down"));
        assert_eq!(err.kind(), "service");
        assert_eq!(err.to_string(), "service failed: db down");

        let err = ControllerError::from(StatusError::UnknownStatusKey("NOPE".into()));
        assert_eq!(err.kind(), "status");
        assert_eq!(err.to_string(), "unknown status key: NOPE");
    }

    #[test]
    fn missing_value_names_location() {
        let err = SelectorError::Missing {
            location: RequestKey::Params,
            name: "id".into(),
        };
        assert_eq!(err.to_string(), "missing params value `id`");
    }

    #[test]
    fn panic_payloads_are_rendered() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42_u8)), "unknown panic payload");
    }
}
