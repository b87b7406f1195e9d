//! Built-in combinators and aggregators for declaratively defined metrics.
//!
//! Derived and expression metrics normally carry caller-supplied closures.
//! Models loaded from files cannot, so they name one of these instead and the
//! loader turns it into the closure.
//!
//! Division follows null-on-zero: a null or zero denominator yields null.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::metric::{aggregator, combinator, Aggregator, Combinator};
use super::value::cell;

/// A named combinator over dependency values. Null dependencies count as 0
/// except as a denominator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Combine {
    /// Sum of every dependency
    Sum,
    /// Product of every dependency
    Product,
    Difference { minuend: String, subtrahend: String },
    Ratio { numerator: String, denominator: String },
    /// `numerator / denominator * 100`
    Percent { numerator: String, denominator: String },
    /// `(current - previous) / previous * 100`
    Growth { current: String, previous: String },
}

/// A named aggregator over a column of the grain-filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Aggregate {
    /// Number of distinct non-null values
    DistinctCount { column: String },
    /// Smallest numeric value; null when there is none
    Min { column: String },
    /// Largest numeric value; null when there is none
    Max { column: String },
    /// `sum(value * weight) / sum(weight)`
    WeightedAvg { value: String, weight: String },
}

fn divide(numerator: f64, denominator: Option<f64>) -> Option<f64> {
    match denominator {
        Some(d) if d != 0.0 => Some(numerator / d),
        _ => None,
    }
}

impl Combine {
    /// Dependency names this combinator reads by name.
    pub fn referenced(&self) -> Vec<&str> {
        match self {
            Combine::Sum | Combine::Product => vec![],
            Combine::Difference {
                minuend,
                subtrahend,
            } => vec![minuend.as_str(), subtrahend.as_str()],
            Combine::Ratio {
                numerator,
                denominator,
            }
            | Combine::Percent {
                numerator,
                denominator,
            } => vec![numerator.as_str(), denominator.as_str()],
            Combine::Growth { current, previous } => vec![current.as_str(), previous.as_str()],
        }
    }

    pub fn into_combinator(self) -> Combinator {
        match self {
            Combine::Sum => combinator(|deps, _, _| {
                Some(deps.iter().map(|(_, v)| v.unwrap_or(0.0)).sum())
            }),
            Combine::Product => combinator(|deps, _, _| {
                Some(deps.iter().map(|(_, v)| v.unwrap_or(0.0)).product())
            }),
            Combine::Difference {
                minuend,
                subtrahend,
            } => combinator(move |deps, _, _| {
                Some(deps.value_or_zero(&minuend) - deps.value_or_zero(&subtrahend))
            }),
            Combine::Ratio {
                numerator,
                denominator,
            } => combinator(move |deps, _, _| {
                divide(deps.value_or_zero(&numerator), deps.get(&denominator))
            }),
            Combine::Percent {
                numerator,
                denominator,
            } => combinator(move |deps, _, _| {
                divide(deps.value_or_zero(&numerator), deps.get(&denominator)).map(|r| r * 100.0)
            }),
            Combine::Growth { current, previous } => combinator(move |deps, _, _| {
                let prev = deps.get(&previous);
                divide(deps.value_or_zero(&current) - prev.unwrap_or(0.0), prev).map(|r| r * 100.0)
            }),
        }
    }
}

impl Aggregate {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Aggregate::DistinctCount { column }
            | Aggregate::Min { column }
            | Aggregate::Max { column } => vec![column.as_str()],
            Aggregate::WeightedAvg { value, weight } => vec![value.as_str(), weight.as_str()],
        }
    }

    pub fn into_aggregator(self) -> Aggregator {
        match self {
            Aggregate::DistinctCount { column } => aggregator(move |rows, _, _| {
                let distinct: HashSet<String> = rows
                    .iter()
                    .map(|r| cell(r, &column))
                    .filter(|v| !v.is_null())
                    .filter_map(|v| serde_json::to_string(v).ok())
                    .collect();
                Some(distinct.len() as f64)
            }),
            Aggregate::Min { column } => aggregator(move |rows, _, _| {
                rows.iter()
                    .filter_map(|r| cell(r, &column).as_f64())
                    .reduce(f64::min)
            }),
            Aggregate::Max { column } => aggregator(move |rows, _, _| {
                rows.iter()
                    .filter_map(|r| cell(r, &column).as_f64())
                    .reduce(f64::max)
            }),
            Aggregate::WeightedAvg { value, weight } => aggregator(move |rows, _, _| {
                let (weighted, total_weight) = rows.iter().fold((0.0, 0.0), |(acc, wsum), r| {
                    let v = cell(r, &value).as_f64().unwrap_or(0.0);
                    let w = cell(r, &weight).as_f64().unwrap_or(0.0);
                    (acc + v * w, wsum + w)
                });
                divide(weighted, Some(total_weight))
            }),
        }
    }
}
