use metrica::context::{FilterContext, TimeKeys};
use metrica::database::Database;
use metrica::model::{FactMeasure, FactTable, Metric, ValueFormat, AggregationType};
use metrica::semantic::{MetricError, MetricRegistry, RegistryBuilder};

fn sales() -> FactTable {
    FactTable::new("sales")
        .with_grain(["year", "month", "regionId"])
        .with_measure(
            "amount",
            FactMeasure::new("amount", AggregationType::Sum).with_format(ValueFormat::Currency),
        )
        .with_count("orders", "amount")
}

fn total(name: &str, deps: &[&str]) -> Metric {
    Metric::derived(name, deps.iter().copied(), |d, _, _| {
        Some(d.iter().map(|(_, v)| v.unwrap_or(0.0)).sum())
    })
}

fn base() -> RegistryBuilder {
    MetricRegistry::builder()
        .fact_table(sales())
        .builtin_transforms(TimeKeys::default())
        .metric(Metric::fact_measure("revenue", "sales", "amount"))
}

#[test]
fn test_lookup_after_build() {
    let registry = base()
        .metric(Metric::fact_measure("orders", "sales", "orders"))
        .metric(Metric::context_transform("revenue_ytd", "revenue", "ytd"))
        .build()
        .unwrap();

    assert!(registry.contains_metric("revenue"));
    assert!(!registry.contains_metric("profit"));
    assert_eq!(registry.metric_names(), vec!["orders", "revenue", "revenue_ytd"]);
    assert_eq!(registry.fact_table("sales").map(|t| t.grain.len()), Some(3));
    assert!(registry.transforms().contains("ytd_prior_period"));
    assert!(registry.find_cycles().is_empty());
}

#[test]
fn test_duplicate_metric_rejected() {
    let err = base()
        .metric(Metric::fact_measure("revenue", "sales", "orders"))
        .build()
        .unwrap_err();
    assert_eq!(err, MetricError::DuplicateMetric("revenue".into()));
}

#[test]
fn test_transform_cycle_rejected() {
    let err = base()
        .metric(Metric::context_transform("a", "b", "ytd"))
        .metric(Metric::context_transform("b", "a", "prior_period"))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        MetricError::CyclicMetricDefinition(vec!["a".into(), "b".into(), "a".into()])
    );
}

#[test]
fn test_mixed_cycle_reports_path() {
    let err = base()
        .metric(total("gross", &["revenue", "net"]))
        .metric(total("net", &["gross_py"]))
        .metric(Metric::context_transform("gross_py", "gross", "prior_period"))
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cyclic metric definition: gross -> net -> gross_py -> gross"
    );
}

#[test]
fn test_shared_dependencies_are_not_cycles() {
    let registry = base()
        .metric(Metric::context_transform("revenue_py", "revenue", "prior_period"))
        .metric(total("both", &["revenue", "revenue_py"]))
        .metric(total("doubled", &["both", "revenue"]))
        .build();
    assert!(registry.is_ok());
}

#[test]
fn test_dangling_references_are_found_up_front() {
    let registry = base()
        .metric(total("profit", &["revenue", "cost"]))
        .metric(Metric::fact_measure("margin", "sales", "margin"))
        .metric(Metric::context_transform("revenue_qtd", "revenue", "qtd"))
        .build()
        .unwrap();

    assert_eq!(
        registry.validate_references(None),
        vec![
            MetricError::UnknownFactMeasure {
                fact_table: "sales".into(),
                measure: "margin".into()
            },
            MetricError::UnknownMetric("cost".into()),
            MetricError::UnknownTransform("qtd".into()),
        ]
    );

    let empty = Database::new();
    let with_db = registry.validate_references(Some(&empty));
    assert!(with_db.contains(&MetricError::UnknownFactTable("sales".into())));
}

#[test]
fn test_display_format_follows_base() {
    let registry = base()
        .metric(Metric::fact_measure("orders", "sales", "orders"))
        .metric(Metric::context_transform("revenue_py", "revenue", "prior_period"))
        .metric(
            Metric::context_transform("orders_py", "orders", "prior_period")
                .with_format(ValueFormat::Integer),
        )
        .build()
        .unwrap();

    assert_eq!(registry.display_format("revenue"), Some(ValueFormat::Currency));
    assert_eq!(registry.display_format("revenue_py"), Some(ValueFormat::Currency));
    assert_eq!(registry.display_format("orders"), None);
    assert_eq!(registry.display_format("orders_py"), Some(ValueFormat::Integer));
    assert_eq!(registry.display_format("missing"), None);
}

#[test]
fn test_custom_transform_registration() {
    let registry = MetricRegistry::builder()
        .transform("all_time", |ctx: &FilterContext| ctx.without("year"))
        .build()
        .unwrap();
    assert_eq!(registry.transforms().names(), vec!["all_time"]);
}
