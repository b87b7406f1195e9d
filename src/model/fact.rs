//! Fact table definitions - native grain plus the measures a table exposes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::{AggregationType, ValueFormat};
use crate::semantic::error::MetricResult;

/// A fact table definition.
///
/// Facts are supplied once by the host and never change afterwards. They define:
/// - The grain (the dimension keys identifying one row)
/// - The measures (logical name → column + default aggregation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactTable {
    /// Logical name for this fact (e.g., "sales")
    pub name: String,

    /// The grain - ordered dimension keys that identify one row
    /// (e.g., `["year", "month", "regionId", "productId"]`)
    pub grain: Vec<String>,

    /// Measures available on this fact, keyed by logical measure name
    pub measures: HashMap<String, FactMeasure>,
}

/// A measure exposed by a fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactMeasure {
    /// Source column to aggregate (e.g., "amount")
    pub column: String,

    /// Aggregation used unless a metric overrides it
    pub default_agg: AggregationType,

    /// Optional display format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ValueFormat>,
}

impl FactTable {
    /// Create a new fact table with an empty grain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grain: vec![],
            measures: HashMap::new(),
        }
    }

    /// Set the grain.
    pub fn with_grain<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grain = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Add a SUM measure.
    pub fn with_sum(self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.with_measure(name, FactMeasure::new(column, AggregationType::Sum))
    }

    /// Add an AVG measure.
    pub fn with_avg(self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.with_measure(name, FactMeasure::new(column, AggregationType::Avg))
    }

    /// Add a COUNT measure.
    pub fn with_count(self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.with_measure(name, FactMeasure::new(column, AggregationType::Count))
    }

    /// Add a generic measure.
    pub fn with_measure(mut self, name: impl Into<String>, measure: FactMeasure) -> Self {
        self.measures.insert(name.into(), measure);
        self
    }

    pub fn measure(&self, name: &str) -> Option<&FactMeasure> {
        self.measures.get(name)
    }

    /// Check whether a dimension key belongs to this table's grain.
    pub fn has_grain_key(&self, key: &str) -> bool {
        self.grain.iter().any(|k| k == key)
    }
}

impl FactMeasure {
    pub fn new(column: impl Into<String>, default_agg: AggregationType) -> Self {
        Self {
            column: column.into(),
            default_agg,
            format: None,
        }
    }

    /// Build a measure from a textual aggregation tag.
    ///
    /// Fails with `UnsupportedAggregation` for anything outside sum/avg/count.
    pub fn with_aggregation_tag(column: impl Into<String>, tag: &str) -> MetricResult<Self> {
        Ok(Self::new(column, tag.parse()?))
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = Some(format);
        self
    }
}
