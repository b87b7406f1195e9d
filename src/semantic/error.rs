//! Error types for metric evaluation.
//!
//! Every variant is a caller-input error: an unresolvable name or an invalid
//! definition. Nothing here is transient, so nothing is retried. The first
//! error aborts the whole top-level call, including an entire pivot query.

/// Result type for metric operations.
pub type MetricResult<T> = Result<T, MetricError>;

/// Errors raised while building a registry or evaluating metrics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    /// A requested, dependency or base metric is not registered.
    #[error("Unknown metric: '{0}'")]
    UnknownMetric(String),

    /// A fact table is not registered, or has no rows loaded.
    #[error("Unknown fact table: '{0}'")]
    UnknownFactTable(String),

    /// A fact-measure metric names a measure its fact table does not define.
    #[error("Unknown measure '{measure}' on fact table '{fact_table}'")]
    UnknownFactMeasure { fact_table: String, measure: String },

    /// A context-transform metric names an unregistered transform.
    #[error("Unknown context transform: '{0}'")]
    UnknownTransform(String),

    /// An aggregation tag outside `sum`, `avg` and `count`.
    #[error("Unsupported aggregation: '{0}'. Expected one of: sum, avg, count")]
    UnsupportedAggregation(String),

    /// Derived or context-transform metrics depend on each other in a loop.
    #[error("Cyclic metric definition: {}", .0.join(" -> "))]
    CyclicMetricDefinition(Vec<String>),

    /// Two metrics were registered under the same name.
    #[error("Duplicate metric name: '{0}'")]
    DuplicateMetric(String),
}
