//! Input selectors: pure functions from a buffered request to service input.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SelectorError;

use super::request::{RequestKey, ServiceRequest};

type SelectFn<I> = dyn Fn(&ServiceRequest) -> Result<I, SelectorError> + Send + Sync;

/// Extracts the input a service function needs from a request.
pub struct Selector<I> {
    select: Arc<SelectFn<I>>,
    label: &'static str,
}

impl<I> Selector<I> {
    /// Selector from an arbitrary extraction function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ServiceRequest) -> Result<I, SelectorError> + Send + Sync + 'static,
    {
        Self {
            select: Arc::new(f),
            label: "custom",
        }
    }

    /// Run the selector.
    pub fn select(&self, request: &ServiceRequest) -> Result<I, SelectorError> {
        (self.select)(request)
    }

    /// Short description for logs.
    pub fn label(&self) -> &'static str {
        self.label
    }

    fn labelled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}

impl<I: DeserializeOwned> Selector<I> {
    /// Use the entire request body as input.
    pub fn body() -> Self {
        Self::new(|request| decode(request.body()?)).labelled("body")
    }

    /// Use an object of the listed request sections as input, e.g.
    /// `{"body": .., "params": ..}` for `[Body, Params]`.
    pub fn keys<K>(keys: K) -> Self
    where
        K: IntoIterator<Item = RequestKey>,
    {
        let keys: Vec<RequestKey> = keys.into_iter().collect();
        Self::new(move |request| decode(request.extract(keys.iter().copied())?)).labelled("keys")
    }

    /// Build a JSON value from the request and decode it as input.
    pub fn json<F>(f: F) -> Self
    where
        F: Fn(&ServiceRequest) -> Value + Send + Sync + 'static,
    {
        Self::new(move |request| decode(f(request))).labelled("json")
    }
}

impl Selector<String> {
    /// Use one path parameter as input.
    pub fn param(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |request| request.param(&name).map(str::to_string)).labelled("param")
    }

    /// Use one query value as input.
    pub fn query(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |request| request.query_value(&name).map(str::to_string)).labelled("query")
    }
}

impl<I: DeserializeOwned> Default for Selector<I> {
    fn default() -> Self {
        Self::body()
    }
}

impl<I> Clone for Selector<I> {
    fn clone(&self) -> Self {
        Self {
            select: Arc::clone(&self.select),
            label: self.label,
        }
    }
}

impl<I> fmt::Debug for Selector<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector").field("label", &self.label).finish()
    }
}

fn decode<I: DeserializeOwned>(value: Value) -> Result<I, SelectorError> {
    serde_json::from_value(value).map_err(SelectorError::Deserialize)
}
