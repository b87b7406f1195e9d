//! Semantic layer - metric registry, evaluation and pivot queries.
//!
//! Callers register fact tables, metrics and context transforms in a
//! [`MetricRegistry`], then evaluate through a [`MetricEngine`]:
//!
//! 1. **Resolve** - look the metric up in the registry
//! 2. **Filter** - narrow fact rows by the context keys inside the metric's grain
//! 3. **Aggregate** - sum/avg/count, a custom aggregator, or a combinator over dependencies
//! 4. **Memoize** - store the value under `(metric, context)` for the rest of the call
//!
//! Derived and transform metrics recurse through the same path, so shared
//! dependencies are computed once per distinct context.

pub mod cache;
pub mod enrich;
pub mod error;
pub mod evaluator;
pub mod grain;
pub mod pivot;
pub mod registry;

pub use cache::{CacheKey, CacheStats, EvalCache};
pub use enrich::{enrich_labels, LabelLookup};
pub use error::{MetricError, MetricResult};
pub use evaluator::MetricEngine;
pub use grain::apply_grain_filters;
pub use pivot::{MetricCell, PivotQuery, PivotRow};
pub use registry::{MetricRegistry, RegistryBuilder};
