//! Tagged success/error results returned by service functions.

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ResponseError;
use crate::status::{
    ClientErrorStatus, ErrorStatus, ServerErrorStatus, StatusGroup, StatusKey, StatusTable,
    SuccessStatus,
};

/// Successful service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSuccess<T = Value> {
    /// 2xx status key.
    pub status: SuccessStatus,
    /// Human readable message.
    pub message: String,
    /// Optional payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Business-level failure reported by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceFailure<E = Value> {
    /// 4xx or 5xx status key.
    pub status: ErrorStatus,
    /// Human readable message.
    pub message: String,
    /// Failure detail.
    pub error: E,
}

/// Result of a service function.
///
/// Serializes untagged, so the JSON body is either
/// `{"status", "message", "data"?}` or `{"status", "message", "error"}`.
/// Decoding picks the variant from the group of the `status` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServiceResponse<T = Value, E = Value> {
    /// Success group status.
    Success(ServiceSuccess<T>),
    /// Client or server error group status.
    Error(ServiceFailure<E>),
}

impl<T, E> ServiceResponse<T, E> {
    /// Build a success response.
    pub fn success(status: SuccessStatus, message: impl Into<String>, data: Option<T>) -> Self {
        Self::Success(ServiceSuccess {
            status,
            message: message.into(),
            data,
        })
    }

    /// `OK` with a payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::success(SuccessStatus::Ok, message, Some(data))
    }

    /// `CREATED` with a payload.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::success(SuccessStatus::Created, message, Some(data))
    }

    /// Build an error response.
    pub fn error(status: impl Into<ErrorStatus>, message: impl Into<String>, error: E) -> Self {
        Self::Error(ServiceFailure {
            status: status.into(),
            message: message.into(),
            error,
        })
    }

    /// `BAD_REQUEST` failure.
    pub fn bad_request(message: impl Into<String>, error: E) -> Self {
        Self::error(ClientErrorStatus::BadRequest, message, error)
    }

    /// `NOT_FOUND` failure.
    pub fn not_found(message: impl Into<String>, error: E) -> Self {
        Self::error(ClientErrorStatus::NotFound, message, error)
    }

    /// `INTERNAL_SERVER_ERROR` failure.
    pub fn internal(message: impl Into<String>, error: E) -> Self {
        Self::error(ServerErrorStatus::InternalServerError, message, error)
    }

    /// Status key of the active variant.
    pub fn status(&self) -> StatusKey {
        match self {
            Self::Success(success) => success.status.into(),
            Self::Error(failure) => failure.status.into(),
        }
    }

    /// HTTP code of the active variant.
    pub fn http_status(&self) -> StatusCode {
        self.status().http_status()
    }

    /// Message of the active variant.
    pub fn message(&self) -> &str {
        match self {
            Self::Success(success) => &success.message,
            Self::Error(failure) => &failure.message,
        }
    }

    /// Whether this is the success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl<T: DeserializeOwned, E: DeserializeOwned> ServiceResponse<T, E> {
    /// Decode from JSON, failing on unknown status keys.
    pub fn from_value(value: Value) -> Result<Self, ResponseError> {
        let name = value
            .get("status")
            .and_then(Value::as_str)
            .ok_or(ResponseError::MissingStatus)?;
        let key = StatusTable::global().key(name)?;

        let response = match key.group() {
            StatusGroup::Success => Self::Success(serde_json::from_value(value)?),
            StatusGroup::ClientError | StatusGroup::ServerError => {
                Self::Error(serde_json::from_value(value)?)
            }
        };
        Ok(response)
    }
}

impl<'de, T: DeserializeOwned, E: DeserializeOwned> Deserialize<'de> for ServiceResponse<T, E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn success_serializes_without_missing_data() {
        let response: ServiceResponse =
            ServiceResponse::success(SuccessStatus::NoContent, "gone", None);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "NO_CONTENT", "message": "gone"})
        );

        let response: ServiceResponse = ServiceResponse::created("ok", json!({"id": 1}));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "CREATED", "message": "ok", "data": {"id": 1}})
        );
    }

    #[test]
    fn error_serializes_with_detail() {
        let response: ServiceResponse = ServiceResponse::not_found("missing", json!("no such id"));
        assert_eq!(response.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "NOT_FOUND", "message": "missing", "error": "no such id"})
        );
    }

    #[test]
    fn decoding_follows_status_group() {
        let response: ServiceResponse =
            serde_json::from_value(json!({"status": "ACCEPTED", "message": "queued"})).unwrap();
        assert!(response.is_success());
        assert_eq!(response.status().code(), 202);

        let response: ServiceResponse = serde_json::from_value(
            json!({"status": "SERVICE_UNAVAILABLE", "message": "later", "error": {"retry": 5}}),
        )
        .unwrap();
        assert!(!response.is_success());
        assert_eq!(response.message(), "later");
        assert_eq!(response.status().code(), 503);
    }

    #[test]
    fn decoding_rejects_unknown_or_missing_status() {
        let err = ServiceResponse::<Value, Value>::from_value(
            json!({"status": "TEAPOT", "message": "x"}),
        )
        .unwrap_err();
        assert!(matches!(err, ResponseError::Status(StatusError::UnknownStatusKey(_))));

        let err = ServiceResponse::<Value, Value>::from_value(json!({"message": "x"})).unwrap_err();
        assert!(matches!(err, ResponseError::MissingStatus));
    }

    #[test]
    fn error_variant_requires_detail() {
        let err = ServiceResponse::<Value, String>::from_value(
            json!({"status": "CONFLICT", "message": "dup"}),
        )
        .unwrap_err();
        assert!(matches!(err, ResponseError::Json(_)));
    }

    #[test]
    fn typed_payloads() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Item {
            id: u32,
        }

        let response: ServiceResponse<Item, String> = ServiceResponse::ok("found", Item { id: 7 });
        let encoded = serde_json::to_string(&response).unwrap();
        let decoded: ServiceResponse<Item, String> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, response);
    }
}
