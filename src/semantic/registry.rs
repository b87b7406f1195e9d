//! Metric registry.
//!
//! Holds the fact table definitions, metric definitions and named context
//! transforms that an engine evaluates against. A registry is assembled with
//! [`RegistryBuilder`] and checked once at build time: duplicate names and
//! cyclic metric definitions are rejected there, so the evaluator never
//! recurses forever.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use super::error::{MetricError, MetricResult};
use crate::context::{FilterContext, TimeKeys, TransformRegistry};
use crate::database::Database;
use crate::model::{FactTable, Metric, MetricKind, ValueFormat};

/// Immutable set of definitions shared by every evaluation.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    fact_tables: HashMap<String, FactTable>,
    metrics: HashMap<String, Metric>,
    transforms: TransformRegistry,
}

/// Collects definitions for a [`MetricRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    fact_tables: Vec<FactTable>,
    metrics: Vec<Metric>,
    transforms: TransformRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fact_table(mut self, table: FactTable) -> Self {
        self.fact_tables.push(table);
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn metrics<I>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = Metric>,
    {
        self.metrics.extend(metrics);
        self
    }

    /// Replace the transform registry wholesale.
    pub fn transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = transforms;
        self
    }

    /// Register the built-in time transforms for the given key names.
    pub fn builtin_transforms(mut self, keys: TimeKeys) -> Self {
        self.transforms.extend(TransformRegistry::builtin(keys));
        self
    }

    /// Register one custom transform, replacing any with the same name.
    pub fn transform<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&FilterContext) -> FilterContext + Send + Sync + 'static,
    {
        self.transforms.register(name, transform);
        self
    }

    /// Validate and freeze the definitions.
    ///
    /// Fails with `DuplicateMetric` if a metric name is registered twice and
    /// with `CyclicMetricDefinition` if metrics reach themselves through
    /// derived dependencies or transform bases.
    pub fn build(self) -> MetricResult<MetricRegistry> {
        let mut metrics = HashMap::with_capacity(self.metrics.len());
        for metric in self.metrics {
            if metrics.contains_key(&metric.name) {
                return Err(MetricError::DuplicateMetric(metric.name));
            }
            metrics.insert(metric.name.clone(), metric);
        }

        let fact_tables = self
            .fact_tables
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();

        let registry = MetricRegistry {
            fact_tables,
            metrics,
            transforms: self.transforms,
        };

        if let Some(cycle) = registry.find_cycles().into_iter().next() {
            return Err(MetricError::CyclicMetricDefinition(cycle));
        }

        debug!(
            "Built metric registry: {} metrics, {} fact tables, {} transforms",
            registry.metrics.len(),
            registry.fact_tables.len(),
            registry.transforms.names().len()
        );
        Ok(registry)
    }
}

impl MetricRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    pub fn fact_table(&self, name: &str) -> Option<&FactTable> {
        self.fact_tables.get(name)
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    pub fn contains_metric(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Metric names, sorted.
    pub fn metric_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.metrics.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Metrics, sorted by name.
    pub fn metrics(&self) -> Vec<&Metric> {
        self.metric_names()
            .into_iter()
            .filter_map(|n| self.metrics.get(n))
            .collect()
    }

    /// Fact tables, sorted by name.
    pub fn fact_tables(&self) -> Vec<&FactTable> {
        let mut tables: Vec<&FactTable> = self.fact_tables.values().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }

    /// The display format of a metric.
    ///
    /// An explicit metric format wins. Otherwise a fact-measure metric takes
    /// its measure's format and a transform metric takes its base's.
    pub fn display_format(&self, name: &str) -> Option<ValueFormat> {
        let metric = self.metrics.get(name)?;
        if metric.format.is_some() {
            return metric.format;
        }
        match &metric.kind {
            MetricKind::FactMeasure(m) => self
                .fact_tables
                .get(&m.fact_table)
                .and_then(|t| t.measure(&m.measure))
                .and_then(|measure| measure.format),
            MetricKind::ContextTransform(t) => self.display_format(&t.base),
            MetricKind::Expression(_) | MetricKind::Derived(_) => None,
        }
    }

    /// Every dangling reference in the registry.
    ///
    /// Evaluation reports these lazily, one at a time. This collects them all
    /// up front, sorted by metric name. When `database` is given, fact tables
    /// without loaded rows are reported as well.
    pub fn validate_references(&self, database: Option<&Database>) -> Vec<MetricError> {
        let mut errors = Vec::new();

        for metric in self.metrics() {
            match &metric.kind {
                MetricKind::FactMeasure(m) => match self.fact_tables.get(&m.fact_table) {
                    None => errors.push(MetricError::UnknownFactTable(m.fact_table.clone())),
                    Some(table) => {
                        if table.measure(&m.measure).is_none() {
                            errors.push(MetricError::UnknownFactMeasure {
                                fact_table: m.fact_table.clone(),
                                measure: m.measure.clone(),
                            });
                        }
                    }
                },
                MetricKind::Expression(_) => {}
                MetricKind::Derived(d) => {
                    for dep in &d.depends_on {
                        if !self.metrics.contains_key(dep) {
                            errors.push(MetricError::UnknownMetric(dep.clone()));
                        }
                    }
                }
                MetricKind::ContextTransform(t) => {
                    if !self.metrics.contains_key(&t.base) {
                        errors.push(MetricError::UnknownMetric(t.base.clone()));
                    }
                    if !self.transforms.contains(&t.transform) {
                        errors.push(MetricError::UnknownTransform(t.transform.clone()));
                    }
                }
            }

            if let (Some(db), Some(table)) = (database, metric.fact_table()) {
                if !db.contains(table) {
                    let err = MetricError::UnknownFactTable(table.to_string());
                    if !errors.contains(&err) {
                        errors.push(err);
                    }
                }
            }
        }

        errors
    }

    /// Dependency cycles among metrics, each as a closed path `a -> ... -> a`.
    ///
    /// Edges run from a derived metric to each dependency and from a transform
    /// metric to its base. References to unknown metrics are not edges.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for name in self.metric_names() {
            nodes.insert(name, graph.add_node(name));
        }
        for (name, metric) in &self.metrics {
            let from = nodes[name.as_str()];
            for dep in metric.dependencies() {
                if let Some(&to) = nodes.get(dep) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .filter_map(|scc| closed_path(&graph, &scc))
            .collect();
        cycles.sort();
        cycles
    }
}

/// Walk one concrete cycle through a strongly connected component, starting
/// at its alphabetically first member.
fn closed_path(graph: &DiGraph<&str, ()>, scc: &[NodeIndex]) -> Option<Vec<String>> {
    let members: HashSet<NodeIndex> = scc.iter().copied().collect();
    let start = *scc.iter().min_by_key(|idx| graph[**idx])?;

    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::new();
    let mut last = None;

    let mut successors: Vec<NodeIndex> = graph.neighbors(start).collect();
    successors.sort_by_key(|idx| graph[*idx]);
    for next in successors {
        if next == start {
            return Some(vec![graph[start].to_string(), graph[start].to_string()]);
        }
        if members.contains(&next) && !parent.contains_key(&next) {
            parent.insert(next, start);
            queue.push_back(next);
        }
    }

    while let Some(node) = queue.pop_front() {
        if graph.contains_edge(node, start) {
            last = Some(node);
            break;
        }
        let mut successors: Vec<NodeIndex> = graph.neighbors(node).collect();
        successors.sort_by_key(|idx| graph[*idx]);
        for next in successors {
            if next != start && members.contains(&next) && !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    let mut path = vec![graph[start].to_string()];
    let mut node = last?;
    let mut reversed = vec![graph[node].to_string()];
    while let Some(&prev) = parent.get(&node) {
        if prev == start {
            break;
        }
        reversed.push(graph[prev].to_string());
        node = prev;
    }
    path.extend(reversed.into_iter().rev());
    path.push(graph[start].to_string());
    Some(path)
}
