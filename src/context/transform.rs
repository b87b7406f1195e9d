//! Context transforms - pure functions from one filter context to another.
//!
//! These implement time intelligence for context-transform metrics:
//!
//! - **ytd**: replace the period constraint with an inclusive upper bound
//! - **prior_period**: shift the year constraint back by one
//! - **ytd_prior_period**: both, i.e. year-to-date for the prior year
//!
//! Transforms never mutate their input; they build a new context.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{FilterContext, FilterValue, RangeFilter};
use crate::semantic::error::{MetricError, MetricResult};

/// A named context rewrite.
pub type ContextTransform = Arc<dyn Fn(&FilterContext) -> FilterContext + Send + Sync>;

pub const YTD: &str = "ytd";
pub const PRIOR_PERIOD: &str = "prior_period";
pub const YTD_PRIOR_PERIOD: &str = "ytd_prior_period";

/// The dimension keys the built-in time transforms read and rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeKeys {
    /// Year key (e.g., "year")
    pub year_key: String,
    /// Sub-year period key (e.g., "month")
    pub period_key: String,
}

impl Default for TimeKeys {
    fn default() -> Self {
        Self {
            year_key: "year".to_string(),
            period_key: "month".to_string(),
        }
    }
}

/// Registry of named context transforms.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, ContextTransform>,
}

impl TransformRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in time transforms for `keys`.
    pub fn builtin(keys: TimeKeys) -> Self {
        let ytd_keys = keys.clone();
        let prior_keys = keys.clone();
        Self::new()
            .with(YTD, move |ctx| year_to_date(ctx, &ytd_keys))
            .with(PRIOR_PERIOD, move |ctx| prior_period(ctx, &prior_keys))
            .with(YTD_PRIOR_PERIOD, move |ctx| {
                year_to_date(&prior_period(ctx, &keys), &keys)
            })
    }

    /// Register a transform, replacing any existing one with the same name.
    pub fn with<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&FilterContext) -> FilterContext + Send + Sync + 'static,
    {
        self.register(name, transform);
        self
    }

    pub fn register<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(&FilterContext) -> FilterContext + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    /// Move every transform of `other` into this registry, replacing same-named ones.
    pub fn extend(&mut self, other: TransformRegistry) {
        self.transforms.extend(other.transforms);
    }

    pub fn get(&self, name: &str) -> Option<&ContextTransform> {
        self.transforms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Apply a named transform.
    pub fn apply(&self, name: &str, ctx: &FilterContext) -> MetricResult<FilterContext> {
        let transform = self
            .get(name)
            .ok_or_else(|| MetricError::UnknownTransform(name.to_string()))?;
        Ok(transform(ctx))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.names())
            .finish()
    }
}

fn is_constrained(ctx: &FilterContext, key: &str) -> bool {
    ctx.get(key).is_some_and(|v| !v.is_null())
}

/// The tightest upper bound present on `range`, as a range of its own.
///
/// Incomparable bounds keep the first one found, in `to`, `lte`, `lt` order.
fn tightest_upper(range: &RangeFilter) -> Option<RangeFilter> {
    let inclusive = match (&range.to, &range.lte) {
        (Some(to), Some(lte)) if lte.compare(to) == Some(Ordering::Less) => Some(lte),
        (to, lte) => to.as_ref().or(lte.as_ref()),
    };
    match (inclusive, &range.lt) {
        (Some(inc), Some(lt)) if matches!(lt.compare(inc), Some(Ordering::Less | Ordering::Equal)) => {
            Some(RangeFilter::below(lt.clone()))
        }
        (Some(inc), _) => Some(RangeFilter::at_most(inc.clone())),
        (None, Some(lt)) => Some(RangeFilter::below(lt.clone())),
        (None, None) => None,
    }
}

/// Year-to-date: bound the period from above by the requested period.
///
/// Only applies when both the year and the period are constrained. A period
/// that is already a range keeps only its tightest upper bound; a range
/// without one leaves the context unchanged.
pub fn year_to_date(ctx: &FilterContext, keys: &TimeKeys) -> FilterContext {
    if !is_constrained(ctx, &keys.year_key) {
        return ctx.clone();
    }

    let upper = match ctx.get(&keys.period_key) {
        Some(FilterValue::Equals(v)) if !v.is_null() => RangeFilter::at_most(v.clone()),
        Some(FilterValue::Range(r)) => match tightest_upper(r) {
            Some(upper) => upper,
            None => return ctx.clone(),
        },
        _ => return ctx.clone(),
    };

    ctx.with_range(keys.period_key.clone(), upper)
}

/// Prior period: move the year constraint back by one.
///
/// Years that cannot be shifted (non-numeric, or at the integer minimum) are
/// left alone. A year range shifts only when every bound shifts.
pub fn prior_period(ctx: &FilterContext, keys: &TimeKeys) -> FilterContext {
    match ctx.get(&keys.year_key) {
        Some(FilterValue::Equals(year)) => match year.offset(-1) {
            Some(prior) => ctx.with(keys.year_key.clone(), prior),
            None => ctx.clone(),
        },
        Some(FilterValue::Range(range)) => {
            let shifted = range.map_bounds(|b| b.offset(-1));
            if shifted.bound_count() == range.bound_count() {
                ctx.with_range(keys.year_key.clone(), shifted)
            } else {
                ctx.clone()
            }
        }
        None => ctx.clone(),
    }
}
