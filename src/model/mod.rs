//! Definition types: values, fact tables and metrics.

pub mod combine;
pub mod fact;
pub mod metric;
pub mod types;
pub mod value;

pub use combine::{Aggregate, Combine};
pub use fact::{FactMeasure, FactTable};
pub use metric::{
    aggregator, combinator, Aggregator, Combinator, ContextTransformMetric, DependencyValues,
    DerivedMetric, ExpressionMetric, FactMeasureMetric, Metric, MetricKind,
};
pub use types::{AggregationType, ValueFormat};
pub use value::{cell, Row, Value};
