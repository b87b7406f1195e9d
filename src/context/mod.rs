//! Filter contexts - the dimension constraints a metric is evaluated under.
//!
//! A [`FilterContext`] is an immutable value. Every builder method returns a
//! new context, which is what lets transforms and pivot groups derive
//! contexts from a shared base without aliasing.
//!
//! Keys are stored in a `BTreeMap`, so serialization is canonical: two
//! contexts with the same constraints produce the same [`FilterContext::cache_key`]
//! no matter the order they were built in.

pub mod filter;
pub mod parse;
pub mod transform;

pub use filter::{matches, FilterValue, RangeFilter};
pub use parse::{parse_filter, parse_filters, FilterParseError};
pub use transform::{ContextTransform, TimeKeys, TransformRegistry};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::Value;

/// Mapping from dimension key to filter value. Absent keys are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterContext {
    filters: BTreeMap<String, FilterValue>,
}

impl FilterContext {
    /// An empty (unconstrained) context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `key` constrained to `value`.
    pub fn with(&self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let mut next = self.clone();
        next.filters.insert(key.into(), value.into());
        next
    }

    /// Return a copy with `key` constrained by a range.
    pub fn with_range(&self, key: impl Into<String>, range: RangeFilter) -> Self {
        self.with(key, FilterValue::Range(range))
    }

    /// Return a copy without any constraint on `key`.
    pub fn without(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.filters.remove(key);
        next
    }

    /// Overlay `other` on top of this context; `other` wins on key collisions.
    pub fn merged_with(&self, other: &FilterContext) -> Self {
        let mut next = self.clone();
        for (key, value) in &other.filters {
            next.filters.insert(key.clone(), value.clone());
        }
        next
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.filters.get(key)
    }

    /// The equality value for `key`, if it is constrained by one.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(FilterValue::as_value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.filters.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Canonical serialization used in evaluation cache keys.
    ///
    /// Whole floats encode as integers, so `1` and `1.0` share a key.
    pub fn cache_key(&self) -> String {
        let canonical: BTreeMap<&str, FilterValue> = self
            .filters
            .iter()
            .map(|(k, v)| (k.as_str(), v.canonical()))
            .collect();
        // Serializing a BTreeMap of plain data cannot fail.
        serde_json::to_string(&canonical).unwrap_or_default()
    }

    /// Parse a context back from its canonical serialization.
    pub fn from_cache_key(key: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(key)
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for FilterContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            filters: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for FilterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}
