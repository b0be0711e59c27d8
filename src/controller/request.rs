//! Buffered request view handed to selectors.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::SelectorError;

/// Request section a key-list selector can pick.
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
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestKey {
    /// Parsed JSON body.
    Body,
    /// Path parameters of the matched route.
    Params,
    /// Query string values.
    Query,
    /// Request headers.
    Headers,
    /// Values attached by earlier middlewares.
    Locals,
}

/// Per-request values written by middlewares and readable by selectors.
///
/// Stored in the request extensions until the terminal stage buffers the
/// request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Locals(Map<String, Value>);

impl Locals {
    /// Get a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Set a value on the locals of `req`, creating them if needed.
    pub fn insert_into(req: &mut Request, key: impl Into<String>, value: impl Into<Value>) {
        match req.extensions_mut().get_mut::<Locals>() {
            Some(locals) => {
                locals.insert(key, value);
            }
            None => {
                let mut locals = Locals::default();
                locals.insert(key, value);
                req.extensions_mut().insert(locals);
            }
        }
    }

    /// Locals attached to `req`, if any.
    pub fn of(req: &Request) -> Option<&Locals> {
        req.extensions().get::<Locals>()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no value is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// As a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Buffered request body.
///
/// Only `application/json` (and `+json`) bodies are read. Read failures
/// and JSON errors surface when a selector asks for the body.
#[derive(Debug, Clone, Default)]
pub(crate) enum RequestBody {
    /// Absent, empty or not JSON.
    #[default]
    None,
    /// Raw JSON bytes, decoded on access.
    Json(Bytes),
    /// Read failed, e.g. the body exceeded the limit.
    Unreadable(Arc<axum::Error>),
}

/// Everything a selector may read from an inbound request.
#[derive(Debug, Clone, Default)]
pub struct ServiceRequest {
    /// HTTP method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Path parameters of the matched route.
    pub params: HashMap<String, String>,
    /// Query string values.
    pub query: HashMap<String, String>,
    pub(crate) body: RequestBody,
    /// Values attached by middlewares.
    pub locals: Locals,
}

impl ServiceRequest {
    /// Buffer `req`, reading at most `body_limit` bytes of a JSON body.
    pub async fn from_request(req: Request, body_limit: usize) -> Result<Self, SelectorError> {
        let (mut parts, body) = req.into_parts();

        // Outside a router no params are recorded.
        let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await;
        let params = match params {
            Ok(Path(params)) => params,
            Err(PathRejection::MissingPathParams(_)) => HashMap::new(),
            Err(rejection) => return Err(SelectorError::Params(rejection.body_text())),
        };

        let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|rejection| SelectorError::Query(rejection.body_text()))?;

        let locals = parts.extensions.remove::<Locals>().unwrap_or_default();
        let body = if is_json(&parts.headers) {
            read_body(body, body_limit).await
        } else {
            RequestBody::None
        };

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            params,
            query,
            body,
            locals,
        })
    }

    /// Replace the body with `value`.
    pub fn with_json_body(mut self, value: &Value) -> Self {
        self.body = RequestBody::Json(Bytes::from(value.to_string()));
        self
    }

    /// JSON body, `Null` when it is empty or not `application/json`.
    pub fn body(&self) -> Result<Value, SelectorError> {
        match &self.body {
            RequestBody::None => Ok(Value::Null),
            RequestBody::Json(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                Ok(Value::Null)
            }
            RequestBody::Json(bytes) => {
                serde_json::from_slice(bytes).map_err(SelectorError::InvalidJson)
            }
            RequestBody::Unreadable(err) => Err(SelectorError::Body(Arc::clone(err))),
        }
    }

    /// Path parameter by name.
    pub fn param(&self, name: &str) -> Result<&str, SelectorError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| missing(RequestKey::Params, name))
    }

    /// Query value by name.
    pub fn query_value(&self, name: &str) -> Result<&str, SelectorError> {
        self.query
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| missing(RequestKey::Query, name))
    }

    /// Header value by name, if it is visible ASCII.
    pub fn header(&self, name: &str) -> Result<&str, SelectorError> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| missing(RequestKey::Headers, name))
    }

    /// One request section as JSON.
    pub fn section(&self, key: RequestKey) -> Result<Value, SelectorError> {
        let value = match key {
            RequestKey::Body => self.body()?,
            RequestKey::Params => string_map(&self.params),
            RequestKey::Query => string_map(&self.query),
            RequestKey::Headers => headers_to_value(&self.headers),
            RequestKey::Locals => self.locals.to_value(),
        };
        Ok(value)
    }

    /// JSON object holding the listed sections under their key names.
    pub fn extract<I>(&self, keys: I) -> Result<Value, SelectorError>
    where
        I: IntoIterator<Item = RequestKey>,
    {
        let object = keys
            .into_iter()
            .map(|key| Ok((key.to_string(), self.section(key)?)))
            .collect::<Result<Map<_, _>, SelectorError>>()?;
        Ok(Value::Object(object))
    }
}

fn missing(location: RequestKey, name: &str) -> SelectorError {
    SelectorError::Missing {
        location,
        name: name.to_string(),
    }
}

// `application/json` or any `+json` media type, parameters ignored.
fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

async fn read_body(body: Body, limit: usize) -> RequestBody {
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => RequestBody::Json(bytes),
        Err(err) => RequestBody::Unreadable(Arc::new(err)),
    }
}

fn string_map(map: &HashMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

// Repeated headers are joined with ", ".
fn headers_to_value(headers: &HeaderMap) -> Value {
    let mut object = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        object.insert(name.as_str().to_string(), Value::String(joined));
    }
    Value::Object(object)
}
