//! Pivot queries.
//!
//! A pivot query groups one fact table's rows by a set of dimensions under a
//! base filter and evaluates a bundle of metrics once per group:
//!
//! 1. **Filter** - apply every base filter, using all of the table's columns as the grain
//! 2. **Group** - partition by the dimension projection, in first-encounter order
//! 3. **Evaluate** - each group's values overlay the base filters to form its row context
//! 4. **Render** - format values and attach dimension labels
//!
//! One cache spans the whole query, so a metric under a context that repeats
//! across groups is computed once.

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use super::cache::EvalCache;
use super::enrich::{enrich_labels, LabelLookup};
use super::error::{MetricError, MetricResult};
use super::evaluator::MetricEngine;
use super::grain::apply_grain_filters;
use crate::context::{FilterContext, FilterValue};
use crate::format::format_value;
use crate::model::{cell, Row, Value};

/// A grouped metric request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotQuery {
    /// Fact table whose rows define the groups
    pub fact_table: String,
    /// Row dimensions, in output order
    pub rows: Vec<String>,
    /// Base filters applied to the rows and to every metric
    pub filters: FilterContext,
    /// Metrics evaluated per group, in output order
    pub metrics: Vec<String>,
    /// Label lookups attached to each output row
    pub labels: Vec<LabelLookup>,
}

impl PivotQuery {
    pub fn new(fact_table: impl Into<String>) -> Self {
        Self {
            fact_table: fact_table.into(),
            ..Self::default()
        }
    }

    pub fn with_rows<I, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows = rows.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filters(mut self, filters: FilterContext) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_label(mut self, lookup: LabelLookup) -> Self {
        self.labels.push(lookup);
        self
    }

    pub fn with_labels<I>(mut self, lookups: I) -> Self
    where
        I: IntoIterator<Item = LabelLookup>,
    {
        self.labels.extend(lookups);
        self
    }
}

/// One evaluated metric in a pivot row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCell {
    pub name: String,
    pub value: Option<f64>,
    /// Formatted value; absent for null
    pub display: Option<String>,
}

/// One output row of a pivot query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    /// Group key, in query dimension order
    pub dimensions: Vec<(String, Value)>,
    pub labels: Vec<(String, Value)>,
    pub values: Vec<MetricCell>,
}

impl PivotRow {
    pub fn dimension(&self, key: &str) -> Option<&Value> {
        self.dimensions.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn label(&self, alias: &str) -> Option<&Value> {
        self.labels.iter().find(|(k, _)| k == alias).map(|(_, v)| v)
    }

    pub fn cell(&self, metric: &str) -> Option<&MetricCell> {
        self.values.iter().find(|c| c.name == metric)
    }

    /// The numeric value of `metric`; `None` if it is null or not in the row.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.cell(metric).and_then(|c| c.value)
    }

    /// Flatten into one JSON object: dimensions, then labels, then each
    /// metric's display string (or its raw value when it has none).
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (key, value) in self.dimensions.iter().chain(&self.labels) {
            object.insert(key.clone(), serde_json::to_value(value).unwrap_or_default());
        }
        for metric in &self.values {
            let value = match (&metric.display, metric.value) {
                (Some(display), _) => serde_json::Value::String(display.clone()),
                (None, Some(v)) => serde_json::json!(v),
                (None, None) => serde_json::Value::Null,
            };
            object.insert(metric.name.clone(), value);
        }
        serde_json::Value::Object(object)
    }
}

/// Canonical group key: the JSON encoding of the projected values. A missing
/// field encodes like an explicit null and whole floats encode as integers.
fn group_key(row: &Row, dimensions: &[String]) -> String {
    let projection: Vec<Value> = dimensions.iter().map(|d| cell(row, d).canonical()).collect();
    serde_json::to_string(&projection).unwrap_or_default()
}

impl MetricEngine<'_> {
    /// Run a pivot query.
    ///
    /// Fails with `UnknownFactTable` if the query's fact table has no loaded
    /// rows. Any metric error aborts the whole query.
    pub fn run_query(&self, query: &PivotQuery) -> MetricResult<Vec<PivotRow>> {
        let rows = self
            .database()
            .rows(&query.fact_table)
            .ok_or_else(|| MetricError::UnknownFactTable(query.fact_table.clone()))?;

        let mut columns: BTreeSet<String> = rows.columns();
        if let Some(table) = self.registry().fact_table(&query.fact_table) {
            columns.extend(table.grain.iter().cloned());
        }
        let columns: Vec<String> = columns.into_iter().collect();
        let filtered = apply_grain_filters(rows, &query.filters, &columns);

        let groups = filtered.group_by(|row| group_key(row, &query.rows));
        debug!(
            "Pivot over '{}' by {:?}: {} groups",
            query.fact_table,
            query.rows,
            groups.len()
        );

        let mut cache = EvalCache::new();
        let mut output = Vec::with_capacity(groups.len());

        for group in &groups {
            let Some(first) = group.rows.first() else {
                continue;
            };
            let dimensions: Vec<(String, Value)> = query
                .rows
                .iter()
                .map(|d| (d.clone(), cell(first, d).clone()))
                .collect();

            let group_filters: FilterContext = dimensions
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), FilterValue::Equals(v.clone())))
                .collect();
            let row_context = query.filters.merged_with(&group_filters);

            let mut values = Vec::with_capacity(query.metrics.len());
            for name in &query.metrics {
                let value = self.evaluate(name, &row_context, &mut cache)?;
                let display = format_value(
                    value,
                    self.registry().display_format(name),
                    self.format_settings(),
                );
                values.push(MetricCell {
                    name: name.clone(),
                    value,
                    display,
                });
            }

            let labels = enrich_labels(&dimensions, &query.labels, self.database());
            output.push(PivotRow {
                dimensions,
                labels,
                values,
            });
        }

        let stats = cache.stats();
        debug!(
            "Pivot evaluated {} cells: {} cache entries, {} hits",
            output.len() * query.metrics.len(),
            cache.len(),
            stats.hits
        );
        Ok(output)
    }
}
