//! Symbolic HTTP status keys, one enum per status group.

use std::fmt;
use std::str::FromStr;

use axum::http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::error::StatusError;

use super::table::StatusTable;

/// Status group a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum StatusGroup {
    /// 2xx keys.
    Success,
    /// 4xx keys.
    ClientError,
    /// 5xx keys.
    ServerError,
}

/// Success status keys (2xx).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    IntoStaticStr,
    Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SuccessStatus {
    /// Request succeeded (200).
    #[default]
    Ok,
    /// Resource created (201).
    Created,
    /// Accepted, processing pending (202).
    Accepted,
    /// Succeeded without content (204).
    NoContent,
    /// Partial content returned (206).
    PartialContent,
}

impl SuccessStatus {
    /// Numeric HTTP status.
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::Created => StatusCode::CREATED,
            Self::Accepted => StatusCode::ACCEPTED,
            Self::NoContent => StatusCode::NO_CONTENT,
            Self::PartialContent => StatusCode::PARTIAL_CONTENT,
        }
    }
}

/// Client error status keys (4xx).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientErrorStatus {
    /// Malformed request (400).
    BadRequest,
    /// Authentication required (401).
    Unauthorized,
    /// Access denied (403).
    Forbidden,
    /// Resource not found (404).
    NotFound,
    /// HTTP method not allowed (405).
    MethodNotAllowed,
    /// Request took too long (408).
    RequestTimeout,
    /// Conflicts with the resource state (409).
    Conflict,
    /// Semantically invalid input (422).
    UnprocessableEntity,
    /// Rate limit exceeded (429).
    TooManyRequests,
}

impl ClientErrorStatus {
    /// Numeric HTTP status.
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Self::Conflict => StatusCode::CONFLICT,
            Self::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

/// Server error status keys (5xx).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerErrorStatus {
    /// Generic server failure (500).
    InternalServerError,
    /// Invalid upstream response (502).
    BadGateway,
    /// Temporarily unavailable (503).
    ServiceUnavailable,
    /// Upstream timed out (504).
    GatewayTimeout,
}

impl ServerErrorStatus {
    /// Numeric HTTP status.
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Any known status key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
    /// Key from the success group.
    Success(SuccessStatus),
    /// Key from the client error group.
    ClientError(ClientErrorStatus),
    /// Key from the server error group.
    ServerError(ServerErrorStatus),
}

impl StatusKey {
    /// Group this key belongs to.
    pub fn group(self) -> StatusGroup {
        match self {
            Self::Success(_) => StatusGroup::Success,
            Self::ClientError(_) => StatusGroup::ClientError,
            Self::ServerError(_) => StatusGroup::ServerError,
        }
    }

    /// Symbolic name, e.g. `"NOT_FOUND"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success(s) => s.into(),
            Self::ClientError(s) => s.into(),
            Self::ServerError(s) => s.into(),
        }
    }

    /// Numeric HTTP status.
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::Success(s) => s.http_status(),
            Self::ClientError(s) => s.http_status(),
            Self::ServerError(s) => s.http_status(),
        }
    }

    /// Numeric HTTP status as an integer.
    pub fn code(self) -> u16 {
        self.http_status().as_u16()
    }

    /// Whether this key reports a failure (4xx or 5xx).
    pub fn is_error(self) -> bool {
        !matches!(self, Self::Success(_))
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusKey {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusTable::global().key(s)
    }
}

impl From<SuccessStatus> for StatusKey {
    fn from(status: SuccessStatus) -> Self {
        Self::Success(status)
    }
}

impl From<ClientErrorStatus> for StatusKey {
    fn from(status: ClientErrorStatus) -> Self {
        Self::ClientError(status)
    }
}

impl From<ServerErrorStatus> for StatusKey {
    fn from(status: ServerErrorStatus) -> Self {
        Self::ServerError(status)
    }
}

impl Serialize for StatusKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Status key of a failed service call: a client or server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// 4xx key.
    Client(ClientErrorStatus),
    /// 5xx key.
    Server(ServerErrorStatus),
}

impl ErrorStatus {
    /// Numeric HTTP status.
    pub fn http_status(self) -> StatusCode {
        StatusKey::from(self).http_status()
    }

    /// Symbolic name.
    pub fn as_str(self) -> &'static str {
        StatusKey::from(self).as_str()
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match StatusTable::global().key(s)? {
            StatusKey::ClientError(status) => Ok(Self::Client(status)),
            StatusKey::ServerError(status) => Ok(Self::Server(status)),
            key @ StatusKey::Success(_) => Err(StatusError::GroupMismatch {
                key: key.as_str().to_string(),
                actual: key.group(),
                expected: "client-error or server-error",
            }),
        }
    }
}

impl From<ClientErrorStatus> for ErrorStatus {
    fn from(status: ClientErrorStatus) -> Self {
        Self::Client(status)
    }
}

impl From<ServerErrorStatus> for ErrorStatus {
    fn from(status: ServerErrorStatus) -> Self {
        Self::Server(status)
    }
}

impl From<ErrorStatus> for StatusKey {
    fn from(status: ErrorStatus) -> Self {
        match status {
            ErrorStatus::Client(s) => Self::ClientError(s),
            ErrorStatus::Server(s) => Self::ServerError(s),
        }
    }
}

impl Serialize for ErrorStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
