//! Union lookup table from symbolic status names to HTTP codes.

use std::collections::HashMap;

use axum::http::StatusCode;
use once_cell::sync::Lazy;
use strum::{EnumCount, IntoEnumIterator};

use crate::error::StatusError;

use super::groups::{ClientErrorStatus, ServerErrorStatus, StatusGroup, StatusKey, SuccessStatus};

static STATUS_TABLE: Lazy<StatusTable> = Lazy::new(StatusTable::build);

/// Immutable union of the success, client error and server error groups.
#[derive(Debug)]
pub struct StatusTable {
    /// Keys in declaration order.
    entries: Vec<(StatusKey, StatusCode)>,
    /// Name → key.
    by_name: HashMap<&'static str, StatusKey>,
    /// Key → code.
    codes: HashMap<StatusKey, StatusCode>,
}

impl StatusTable {
    /// Number of known keys across all groups.
    pub const SIZE: usize =
        SuccessStatus::COUNT + ClientErrorStatus::COUNT + ServerErrorStatus::COUNT;

    /// Process-wide table, built on first use.
    pub fn global() -> &'static StatusTable {
        &STATUS_TABLE
    }

    fn build() -> Self {
        let keys = SuccessStatus::iter()
            .map(StatusKey::from)
            .chain(ClientErrorStatus::iter().map(StatusKey::from))
            .chain(ServerErrorStatus::iter().map(StatusKey::from));

        let mut entries = Vec::with_capacity(Self::SIZE);
        let mut by_name = HashMap::with_capacity(Self::SIZE);
        let mut codes = HashMap::with_capacity(Self::SIZE);

        for key in keys {
            let previous = by_name.insert(key.as_str(), key);
            debug_assert!(previous.is_none(), "status key {key} appears in two groups");
            codes.insert(key, key.http_status());
            entries.push((key, key.http_status()));
        }

        Self {
            entries,
            by_name,
            codes,
        }
    }

    /// Resolve a symbolic name such as `"NOT_FOUND"` to its HTTP code.
    pub fn resolve(&self, name: &str) -> Result<StatusCode, StatusError> {
        let key = self.key(name)?;
        self.code_for(key)
    }

    /// Parse a symbolic name into a typed key.
    pub fn key(&self, name: &str) -> Result<StatusKey, StatusError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| StatusError::UnknownStatusKey(name.to_string()))
    }

    /// HTTP code for a typed key.
    pub fn code_for(&self, key: StatusKey) -> Result<StatusCode, StatusError> {
        self.codes
            .get(&key)
            .copied()
            .ok_or_else(|| StatusError::UnknownStatusKey(key.as_str().to_string()))
    }

    /// Whether `name` is a known key.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All keys with their codes, success group first.
    pub fn iter(&self) -> impl Iterator<Item = (StatusKey, StatusCode)> + '_ {
        self.entries.iter().copied()
    }

    /// Keys of a single group.
    pub fn group(&self, group: StatusGroup) -> impl Iterator<Item = StatusKey> + '_ {
        self.entries
            .iter()
            .map(|(key, _)| *key)
            .filter(move |key| key.group() == group)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; the table is never empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve a symbolic name through the global table.
pub fn resolve(name: &str) -> Result<StatusCode, StatusError> {
    StatusTable::global().resolve(name)
}
