//! Per-call evaluation cache.
//!
//! One cache lives for exactly one top-level call (`evaluate_metric`,
//! `evaluate_metrics` or `run_query`) and is owned by it. Entries are keyed by
//! metric name plus the canonical serialization of the filter context, and a
//! computed null is cached like any other value.

use std::collections::HashMap;

use crate::context::FilterContext;

/// Key of one cached evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub metric: String,
    pub context: String,
}

impl CacheKey {
    pub fn new(metric: &str, context: &FilterContext) -> Self {
        Self {
            metric: metric.to_string(),
            context: context.cache_key(),
        }
    }
}

/// Hit/miss counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Memoized metric values for one top-level call.
#[derive(Debug, Default)]
pub struct EvalCache {
    entries: HashMap<CacheKey, Option<f64>>,
    stats: CacheStats,
}

impl EvalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value. The outer `Option` is presence, the inner one the metric value.
    pub fn get(&mut self, key: &CacheKey) -> Option<Option<f64>> {
        match self.entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(*value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, value: Option<f64>) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
