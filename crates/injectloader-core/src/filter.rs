//! Dependency filters controlling which `require()` calls get wrapped.
//!
//! A [`FilterSet`] maps dependency paths to a flag. How the flags are read:
//!
//! - no entries: every `require()` call is wrapped
//! - every flag is exactly `true`: every call is wrapped except the listed paths
//! - anything else: only the listed paths are wrapped, whatever their flag
//!
//! Filter sets usually come from a loader query string such as
//! `?./dep&./other=false`, parsed by [`FilterSet::from_query`].

use crate::errors::{InjectError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a [`FilterSet`] selects the calls to wrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Wrap every call
    All,
    /// Wrap every call except the listed paths
    Exclude,
    /// Wrap only the listed paths
    Include,
}

/// Ordered mapping from dependency path to flag value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    entries: IndexMap<String, Value>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, flag: impl Into<Value>) {
        self.entries.insert(path.into(), flag.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    /// Dependency paths in insertion order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn mode(&self) -> FilterMode {
        if self.entries.is_empty() {
            FilterMode::All
        } else if self.entries.values().all(|flag| *flag == Value::Bool(true)) {
            FilterMode::Exclude
        } else {
            FilterMode::Include
        }
    }

    /// Parse a webpack-style loader query string.
    ///
    /// An empty query yields an empty set. Otherwise the query must start with
    /// `?`. A `?{...}` body is read as a JSON object; anything else is split on
    /// `,` and `&`, where `-name` means `false`, `+name` and `name` mean `true`,
    /// and `name=value` keeps the percent-decoded value (`true`, `false` and
    /// `null` become JSON literals). `name[]=value` collects an array.
    pub fn from_query(query: &str) -> Result<Self> {
        if query.is_empty() {
            return Ok(Self::new());
        }

        let body = query.strip_prefix('?').ok_or_else(|| {
            InjectError::Config(format!(
                "a loader query must begin with '?', got '{}'",
                query
            ))
        })?;

        if body.starts_with('{') && body.ends_with('}') {
            let entries: IndexMap<String, Value> = serde_json::from_str(body)
                .map_err(|e| InjectError::Config(format!("invalid JSON query: {}", e)))?;
            return Ok(Self { entries });
        }

        let mut set = Self::new();
        for arg in body.split([',', '&']).filter(|arg| !arg.is_empty()) {
            match arg.split_once('=') {
                Some((name, raw_value)) => {
                    let value = special_value(&decode(raw_value)?);
                    if let Some(name) = name.strip_suffix("[]") {
                        let name = decode(name)?;
                        let slot = set
                            .entries
                            .entry(name)
                            .or_insert_with(|| Value::Array(Vec::new()));
                        if !slot.is_array() {
                            *slot = Value::Array(Vec::new());
                        }
                        if let Value::Array(items) = slot {
                            items.push(value);
                        }
                    } else {
                        set.entries.insert(decode(name)?, value);
                    }
                }
                None => {
                    if let Some(name) = arg.strip_prefix('-') {
                        set.entries.insert(decode(name)?, Value::Bool(false));
                    } else if let Some(name) = arg.strip_prefix('+') {
                        set.entries.insert(decode(name)?, Value::Bool(true));
                    } else {
                        set.entries.insert(decode(arg)?, Value::Bool(true));
                    }
                }
            }
        }

        Ok(set)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(path, flag)| (path.into(), flag.into()))
                .collect(),
        }
    }
}

fn decode(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| InjectError::Config(format!("invalid percent-encoding in '{}': {}", raw, e)))
}

fn special_value(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        other => Value::String(other.to_string()),
    }
}
