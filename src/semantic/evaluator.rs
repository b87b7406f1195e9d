//! Recursive metric evaluator.
//!
//! [`MetricEngine`] pairs a [`MetricRegistry`] with the in-memory
//! [`Database`] and evaluates metrics under a [`FilterContext`]:
//!
//! ```text
//! evaluate(name, ctx)
//!     │
//!     ├── cache hit? ─────────────────────────────▶ value
//!     │
//!     ├── fact      ─▶ grain filter ─▶ sum/avg/count
//!     ├── expression─▶ grain filter ─▶ aggregator(rows, db, ctx)
//!     ├── derived   ─▶ evaluate(dep, ctx) for each dep ─▶ combinator
//!     └── transform ─▶ evaluate(base, transform(ctx))
//! ```
//!
//! Every top-level call owns one [`EvalCache`], so a metric shared by several
//! dependents (or by several pivot rows) is computed once per distinct context.

use std::collections::BTreeMap;

use log::{debug, trace};

use super::cache::{CacheKey, EvalCache};
use super::error::{MetricError, MetricResult};
use super::grain::apply_grain_filters;
use super::registry::MetricRegistry;
use crate::context::FilterContext;
use crate::database::Database;
use crate::format::FormatSettings;
use crate::model::{
    cell, AggregationType, ContextTransformMetric, DependencyValues, DerivedMetric,
    ExpressionMetric, FactMeasureMetric, FactTable, MetricKind, Row,
};
use crate::rows::RowSet;

/// Evaluates metrics from a registry against a database.
#[derive(Debug, Clone)]
pub struct MetricEngine<'a> {
    registry: &'a MetricRegistry,
    database: &'a Database,
    format: FormatSettings,
}

impl<'a> MetricEngine<'a> {
    pub fn new(registry: &'a MetricRegistry, database: &'a Database) -> Self {
        Self {
            registry,
            database,
            format: FormatSettings::default(),
        }
    }

    /// Use these settings when rendering display strings in query results.
    pub fn with_format_settings(mut self, format: FormatSettings) -> Self {
        self.format = format;
        self
    }

    pub fn registry(&self) -> &'a MetricRegistry {
        self.registry
    }

    pub fn database(&self) -> &'a Database {
        self.database
    }

    pub fn format_settings(&self) -> &FormatSettings {
        &self.format
    }

    /// Evaluate one metric with a fresh cache.
    pub fn evaluate_metric(&self, name: &str, context: &FilterContext) -> MetricResult<Option<f64>> {
        let mut cache = EvalCache::new();
        self.evaluate(name, context, &mut cache)
    }

    /// Evaluate several metrics under one context, sharing a cache.
    ///
    /// The first failing metric aborts the call.
    pub fn evaluate_metrics<S>(
        &self,
        names: &[S],
        context: &FilterContext,
    ) -> MetricResult<BTreeMap<String, Option<f64>>>
    where
        S: AsRef<str>,
    {
        let mut cache = EvalCache::new();
        let mut values = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            let value = self.evaluate(name, context, &mut cache)?;
            values.insert(name.to_string(), value);
        }
        let stats = cache.stats();
        debug!(
            "Evaluated {} metrics: {} cache entries, {} hits, {} misses",
            values.len(),
            cache.len(),
            stats.hits,
            stats.misses
        );
        Ok(values)
    }

    /// Evaluate `name` under `context`, reading and filling `cache`.
    pub fn evaluate(
        &self,
        name: &str,
        context: &FilterContext,
        cache: &mut EvalCache,
    ) -> MetricResult<Option<f64>> {
        let key = CacheKey::new(name, context);
        if let Some(value) = cache.get(&key) {
            trace!("cache hit: {} {}", name, key.context);
            return Ok(value);
        }

        let metric = self
            .registry
            .metric(name)
            .ok_or_else(|| MetricError::UnknownMetric(name.to_string()))?;

        let value = match &metric.kind {
            MetricKind::FactMeasure(m) => self.evaluate_fact_measure(m, context)?,
            MetricKind::Expression(m) => self.evaluate_expression(m, context)?,
            MetricKind::Derived(m) => self.evaluate_derived(m, context, cache)?,
            MetricKind::ContextTransform(m) => self.evaluate_transform(m, context, cache)?,
        };

        trace!("evaluated {} {} = {:?}", name, key.context, value);
        cache.insert(key, value);
        Ok(value)
    }

    fn fact_definition(&self, name: &str) -> MetricResult<&'a FactTable> {
        self.registry
            .fact_table(name)
            .ok_or_else(|| MetricError::UnknownFactTable(name.to_string()))
    }

    fn fact_rows(&self, name: &str) -> MetricResult<RowSet<'a>> {
        self.database
            .rows(name)
            .ok_or_else(|| MetricError::UnknownFactTable(name.to_string()))
    }

    fn evaluate_fact_measure(
        &self,
        metric: &FactMeasureMetric,
        context: &FilterContext,
    ) -> MetricResult<Option<f64>> {
        let table = self.fact_definition(&metric.fact_table)?;
        let measure = table
            .measure(&metric.measure)
            .ok_or_else(|| MetricError::UnknownFactMeasure {
                fact_table: metric.fact_table.clone(),
                measure: metric.measure.clone(),
            })?;
        let grain = metric.grain.as_deref().unwrap_or(table.grain.as_slice());
        let rows = apply_grain_filters(self.fact_rows(&metric.fact_table)?, context, grain);

        let column = measure.column.as_str();
        let value = match metric.aggregation.unwrap_or(measure.default_agg) {
            AggregationType::Sum => Some(rows.sum(|row| numeric(row, column))),
            AggregationType::Avg => rows.average(|row| numeric(row, column)),
            AggregationType::Count => Some(rows.count() as f64),
        };
        Ok(value)
    }

    fn evaluate_expression(
        &self,
        metric: &ExpressionMetric,
        context: &FilterContext,
    ) -> MetricResult<Option<f64>> {
        let grain = match &metric.grain {
            Some(grain) => grain.as_slice(),
            None => self.fact_definition(&metric.fact_table)?.grain.as_slice(),
        };
        let rows = apply_grain_filters(self.fact_rows(&metric.fact_table)?, context, grain);
        Ok((metric.aggregator)(&rows, self.database, context))
    }

    fn evaluate_derived(
        &self,
        metric: &DerivedMetric,
        context: &FilterContext,
        cache: &mut EvalCache,
    ) -> MetricResult<Option<f64>> {
        let mut deps = DependencyValues::new();
        for dep in &metric.depends_on {
            let value = self.evaluate(dep, context, cache)?;
            deps.insert(dep.as_str(), value);
        }
        Ok((metric.combinator)(&deps, self.database, context))
    }

    fn evaluate_transform(
        &self,
        metric: &ContextTransformMetric,
        context: &FilterContext,
        cache: &mut EvalCache,
    ) -> MetricResult<Option<f64>> {
        let transformed = self.registry.transforms().apply(&metric.transform, context)?;
        self.evaluate(&metric.base, &transformed, cache)
    }
}

/// Numeric cell value; missing and non-numeric cells count as 0.
fn numeric(row: &Row, column: &str) -> f64 {
    cell(row, column).as_f64().unwrap_or(0.0)
}
