//! # Metrica
//!
//! A metric evaluation engine over in-memory fact tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │         Model (fact tables, metrics, transforms)         │
//! │              built in code or via [loader]               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [registry build: duplicate + cycle checks]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    MetricRegistry                        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [MetricEngine + Database]
//! ┌─────────────────────────────────────────────────────────┐
//! │   evaluate ─▶ grain filter ─▶ RowSet ─▶ aggregate        │
//! │      ▲  │                                                │
//! │      └──┘ derived deps / transformed contexts (cached)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [run_query]
//! ┌─────────────────────────────────────────────────────────┐
//! │         Pivot rows (dimensions, labels, values)          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod context;
pub mod database;
pub mod format;
pub mod loader;
pub mod model;
pub mod rows;
pub mod semantic;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::context::{
        matches, FilterContext, FilterValue, RangeFilter, TimeKeys, TransformRegistry,
    };
    pub use crate::database::Database;
    pub use crate::format::{format_value, FormatSettings};
    pub use crate::model::{
        AggregationType, DependencyValues, FactMeasure, FactTable, Metric, MetricKind, Row,
        Value, ValueFormat,
    };
    pub use crate::rows::RowSet;
    pub use crate::semantic::{
        apply_grain_filters, EvalCache, LabelLookup, MetricEngine, MetricError, MetricRegistry,
        MetricResult, PivotQuery, PivotRow,
    };
}
