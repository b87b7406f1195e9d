//! Metric definitions.
//!
//! A metric is one of four kinds, modelled as a closed enum so that the
//! evaluator's match is exhaustive:
//!
//! - [`FactMeasureMetric`] - one aggregation over a fact table column
//! - [`ExpressionMetric`] - a caller-supplied aggregator over grain-filtered rows
//! - [`DerivedMetric`] - a caller-supplied combinator over other metrics' values
//! - [`ContextTransformMetric`] - a base metric under a rewritten context

use std::fmt;
use std::sync::Arc;

use super::types::{AggregationType, ValueFormat};
use crate::context::FilterContext;
use crate::database::Database;
use crate::rows::RowSet;

/// Computes an expression metric from its grain-filtered rows.
pub type Aggregator =
    Arc<dyn Fn(&RowSet<'_>, &Database, &FilterContext) -> Option<f64> + Send + Sync>;

/// Combines already-evaluated dependency values into a derived metric value.
pub type Combinator =
    Arc<dyn Fn(&DependencyValues, &Database, &FilterContext) -> Option<f64> + Send + Sync>;

/// Wrap a closure as an [`Aggregator`].
pub fn aggregator<F>(f: F) -> Aggregator
where
    F: Fn(&RowSet<'_>, &Database, &FilterContext) -> Option<f64> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`Combinator`].
pub fn combinator<F>(f: F) -> Combinator
where
    F: Fn(&DependencyValues, &Database, &FilterContext) -> Option<f64> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A named metric.
#[derive(Clone)]
pub struct Metric {
    pub name: String,
    pub description: Option<String>,
    pub format: Option<ValueFormat>,
    pub kind: MetricKind,
}

/// The four metric shapes.
#[derive(Clone)]
pub enum MetricKind {
    FactMeasure(FactMeasureMetric),
    Expression(ExpressionMetric),
    Derived(DerivedMetric),
    ContextTransform(ContextTransformMetric),
}

/// Aggregates one measure of a fact table.
#[derive(Debug, Clone, PartialEq)]
pub struct FactMeasureMetric {
    pub fact_table: String,
    pub measure: String,
    /// Overrides the measure's default aggregation
    pub aggregation: Option<AggregationType>,
    /// Overrides the fact table's grain. Filter keys outside the grain are ignored.
    pub grain: Option<Vec<String>>,
}

/// Delegates to a caller-supplied aggregator.
#[derive(Clone)]
pub struct ExpressionMetric {
    pub fact_table: String,
    pub grain: Option<Vec<String>>,
    pub aggregator: Aggregator,
}

/// Combines the values of other metrics under the same context.
#[derive(Clone)]
pub struct DerivedMetric {
    /// Dependencies, evaluated in this order
    pub depends_on: Vec<String>,
    pub combinator: Combinator,
}

/// Evaluates a base metric under a transformed context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextTransformMetric {
    pub base: String,
    pub transform: String,
}

/// Evaluated dependency values handed to a derived metric's combinator.
///
/// Keeps the dependency order of the metric definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyValues {
    values: Vec<(String, Option<f64>)>,
}

impl DependencyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// The value of a dependency; `None` if it is null or not a dependency.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| *v)
    }

    /// The value of a dependency, with null coalesced to 0.
    pub fn value_or_zero(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Option<f64>)> for DependencyValues {
    fn from_iter<I: IntoIterator<Item = (S, Option<f64>)>>(iter: I) -> Self {
        let mut deps = Self::new();
        for (name, value) in iter {
            deps.insert(name, value);
        }
        deps
    }
}

impl Metric {
    fn with_kind(name: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            format: None,
            kind,
        }
    }

    /// A fact-measure metric using the measure's default aggregation and the table's grain.
    pub fn fact_measure(
        name: impl Into<String>,
        fact_table: impl Into<String>,
        measure: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            name,
            MetricKind::FactMeasure(FactMeasureMetric {
                fact_table: fact_table.into(),
                measure: measure.into(),
                aggregation: None,
                grain: None,
            }),
        )
    }

    /// An expression metric.
    pub fn expression<F>(name: impl Into<String>, fact_table: impl Into<String>, aggregator: F) -> Self
    where
        F: Fn(&RowSet<'_>, &Database, &FilterContext) -> Option<f64> + Send + Sync + 'static,
    {
        Self::expression_with(name, fact_table, self::aggregator(aggregator))
    }

    /// An expression metric from an already wrapped [`Aggregator`].
    pub fn expression_with(
        name: impl Into<String>,
        fact_table: impl Into<String>,
        aggregator: Aggregator,
    ) -> Self {
        Self::with_kind(
            name,
            MetricKind::Expression(ExpressionMetric {
                fact_table: fact_table.into(),
                grain: None,
                aggregator,
            }),
        )
    }

    /// A derived metric.
    pub fn derived<I, S, F>(name: impl Into<String>, depends_on: I, combinator: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&DependencyValues, &Database, &FilterContext) -> Option<f64> + Send + Sync + 'static,
    {
        Self::derived_with(name, depends_on, self::combinator(combinator))
    }

    /// A derived metric from an already wrapped [`Combinator`].
    pub fn derived_with<I, S>(name: impl Into<String>, depends_on: I, combinator: Combinator) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_kind(
            name,
            MetricKind::Derived(DerivedMetric {
                depends_on: depends_on.into_iter().map(Into::into).collect(),
                combinator,
            }),
        )
    }

    /// A context-transform metric.
    pub fn context_transform(
        name: impl Into<String>,
        base: impl Into<String>,
        transform: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            name,
            MetricKind::ContextTransform(ContextTransformMetric {
                base: base.into(),
                transform: transform.into(),
            }),
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Override the aggregation of a fact-measure metric. No-op for other kinds.
    pub fn with_aggregation(mut self, aggregation: AggregationType) -> Self {
        if let MetricKind::FactMeasure(m) = &mut self.kind {
            m.aggregation = Some(aggregation);
        }
        self
    }

    /// Override the grain of a fact-measure or expression metric. No-op for other kinds.
    pub fn with_grain<I, S>(mut self, grain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let grain = Some(grain.into_iter().map(Into::into).collect());
        match &mut self.kind {
            MetricKind::FactMeasure(m) => m.grain = grain,
            MetricKind::Expression(m) => m.grain = grain,
            MetricKind::Derived(_) | MetricKind::ContextTransform(_) => {}
        }
        self
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Names of the metrics this one evaluates directly.
    pub fn dependencies(&self) -> Vec<&str> {
        match &self.kind {
            MetricKind::Derived(d) => d.depends_on.iter().map(String::as_str).collect(),
            MetricKind::ContextTransform(t) => vec![t.base.as_str()],
            MetricKind::FactMeasure(_) | MetricKind::Expression(_) => vec![],
        }
    }

    /// The fact table this metric reads, if it reads one directly.
    pub fn fact_table(&self) -> Option<&str> {
        match &self.kind {
            MetricKind::FactMeasure(m) => Some(&m.fact_table),
            MetricKind::Expression(m) => Some(&m.fact_table),
            MetricKind::Derived(_) | MetricKind::ContextTransform(_) => None,
        }
    }
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::FactMeasure(_) => "fact",
            MetricKind::Expression(_) => "expression",
            MetricKind::Derived(_) => "derived",
            MetricKind::ContextTransform(_) => "transform",
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("format", &self.format)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Debug for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::FactMeasure(m) => f.debug_tuple("FactMeasure").field(m).finish(),
            MetricKind::Expression(m) => f
                .debug_struct("Expression")
                .field("fact_table", &m.fact_table)
                .field("grain", &m.grain)
                .finish_non_exhaustive(),
            MetricKind::Derived(m) => f
                .debug_struct("Derived")
                .field("depends_on", &m.depends_on)
                .finish_non_exhaustive(),
            MetricKind::ContextTransform(m) => f.debug_tuple("ContextTransform").field(m).finish(),
        }
    }
}
