//! Aggregation and display-format tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::semantic::error::MetricError;

/// How a fact-measure metric collapses its filtered rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    /// Arithmetic sum; missing or non-numeric cells count as 0.
    Sum,
    /// Arithmetic mean over the filtered rows; null over an empty set.
    Avg,
    /// Number of filtered rows. Ignores the column.
    Count,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Avg => "avg",
            AggregationType::Count => "count",
        }
    }
}

impl FromStr for AggregationType {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationType::Sum),
            "avg" | "average" | "mean" => Ok(AggregationType::Avg),
            "count" => Ok(AggregationType::Count),
            _ => Err(MetricError::UnsupportedAggregation(s.to_string())),
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display format attached to a measure or metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    Currency,
    Integer,
    Percent,
}

impl FromStr for ValueFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "currency" => Ok(ValueFormat::Currency),
            "integer" => Ok(ValueFormat::Integer),
            "percent" => Ok(ValueFormat::Percent),
            other => Err(format!("Unknown value format: '{}'", other)),
        }
    }
}
