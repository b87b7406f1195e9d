//! TOML model definitions and their conversion into registry types.
//!
//! ```toml
//! [fact_tables.sales]
//! grain = ["year", "month", "regionId", "productId"]
//!
//! [fact_tables.sales.measures.amount]
//! column = "amount"
//! agg = "sum"
//! format = "currency"
//!
//! [metrics.revenue]
//! kind = "fact"
//! fact_table = "sales"
//! measure = "amount"
//!
//! [metrics.attainment]
//! kind = "derived"
//! depends_on = ["revenue", "budget"]
//! combine = { op = "percent", numerator = "revenue", denominator = "budget" }
//! format = "percent"
//!
//! [metrics.revenue_ytd]
//! kind = "transform"
//! base = "revenue"
//! transform = "ytd"
//!
//! [[labels]]
//! dimension = "regionId"
//! table = "regions"
//! key = "regionId"
//! label = "regionName"
//! alias = "region"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{LoadError, LoadResult, Model};
use crate::context::TimeKeys;
use crate::model::{
    Aggregate, AggregationType, Combine, FactMeasure, FactTable, Metric, ValueFormat,
};
use crate::semantic::{LabelLookup, MetricRegistry};

/// Top level of a model file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelFile {
    pub fact_tables: BTreeMap<String, FactTableDef>,
    pub metrics: BTreeMap<String, MetricDef>,
    pub labels: Vec<LabelLookup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactTableDef {
    pub grain: Vec<String>,
    pub measures: BTreeMap<String, MeasureDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeasureDef {
    /// Source column; defaults to the measure name
    pub column: Option<String>,
    /// Aggregation tag; defaults to `sum`
    pub agg: Option<String>,
    pub format: Option<String>,
}

/// One metric. Which keys are required depends on `kind`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricDef {
    /// `fact`, `expression`, `derived` or `transform`
    pub kind: String,
    pub description: Option<String>,
    pub format: Option<String>,

    // fact / expression
    pub fact_table: Option<String>,
    pub measure: Option<String>,
    pub agg: Option<String>,
    pub grain: Option<Vec<String>>,
    pub aggregate: Option<Aggregate>,

    // derived
    pub depends_on: Vec<String>,
    pub combine: Option<Combine>,

    // transform
    pub base: Option<String>,
    pub transform: Option<String>,
}

fn parse_format(kind: &'static str, name: &str, format: Option<&str>) -> LoadResult<Option<ValueFormat>> {
    format
        .map(|f| {
            f.parse::<ValueFormat>().map_err(|message| LoadError::InvalidDefinition {
                kind,
                name: name.to_string(),
                message,
            })
        })
        .transpose()
}

fn required<T>(value: Option<T>, field: &'static str, metric: &str) -> LoadResult<T> {
    value.ok_or_else(|| LoadError::MissingField {
        field,
        context: format!("metric '{}'", metric),
    })
}

impl ModelFile {
    pub fn into_model(self, time_keys: TimeKeys) -> LoadResult<Model> {
        let mut builder = MetricRegistry::builder().builtin_transforms(time_keys);

        for (name, def) in self.fact_tables {
            builder = builder.fact_table(def.into_fact_table(name)?);
        }
        for (name, def) in self.metrics {
            builder = builder.metric(def.into_metric(name)?);
        }

        Ok(Model {
            registry: builder.build()?,
            labels: self.labels,
        })
    }
}

impl FactTableDef {
    pub fn into_fact_table(self, name: String) -> LoadResult<FactTable> {
        if self.grain.is_empty() {
            return Err(LoadError::MissingField {
                field: "grain",
                context: format!("fact table '{}'", name),
            });
        }

        let mut table = FactTable::new(name.clone()).with_grain(self.grain);
        for (measure_name, def) in self.measures {
            let column = def.column.unwrap_or_else(|| measure_name.clone());
            let agg = def.agg.as_deref().unwrap_or(AggregationType::Sum.as_str());
            let mut measure = FactMeasure::with_aggregation_tag(column, agg)?;
            if let Some(format) = parse_format("fact table", &name, def.format.as_deref())? {
                measure = measure.with_format(format);
            }
            table = table.with_measure(measure_name, measure);
        }
        Ok(table)
    }
}

impl MetricDef {
    pub fn into_metric(self, name: String) -> LoadResult<Metric> {
        let format = parse_format("metric", &name, self.format.as_deref())?;

        let mut metric = match self.kind.as_str() {
            "fact" => {
                let fact_table = required(self.fact_table, "fact_table", &name)?;
                let measure = required(self.measure, "measure", &name)?;
                let mut metric = Metric::fact_measure(name.clone(), fact_table, measure);
                if let Some(tag) = self.agg.as_deref() {
                    metric = metric.with_aggregation(tag.parse::<AggregationType>()?);
                }
                metric
            }
            "expression" => {
                let fact_table = required(self.fact_table, "fact_table", &name)?;
                let aggregate = required(self.aggregate, "aggregate", &name)?;
                Metric::expression_with(name.clone(), fact_table, aggregate.into_aggregator())
            }
            "derived" => {
                let combine = required(self.combine, "combine", &name)?;
                let mut depends_on = self.depends_on;
                for referenced in combine.referenced() {
                    if !depends_on.iter().any(|d| d == referenced) {
                        depends_on.push(referenced.to_string());
                    }
                }
                if depends_on.is_empty() {
                    return Err(LoadError::InvalidDefinition {
                        kind: "metric",
                        name,
                        message: "derived metric has no dependencies".to_string(),
                    });
                }
                Metric::derived_with(name.clone(), depends_on, combine.into_combinator())
            }
            "transform" => {
                let base = required(self.base, "base", &name)?;
                let transform = required(self.transform, "transform", &name)?;
                Metric::context_transform(name.clone(), base, transform)
            }
            other => {
                return Err(LoadError::InvalidDefinition {
                    kind: "metric",
                    name,
                    message: format!(
                        "unknown kind '{}', expected fact, expression, derived or transform",
                        other
                    ),
                })
            }
        };

        if let Some(grain) = self.grain {
            metric = metric.with_grain(grain);
        }
        if let Some(description) = self.description {
            metric = metric.with_description(description);
        }
        if let Some(format) = format {
            metric = metric.with_format(format);
        }
        Ok(metric)
    }
}
