use std::path::Path;

use metrica::context::{FilterContext, TimeKeys};
use metrica::loader::{load_dataset, load_dataset_file, load_model, load_model_file, LoadError};
use metrica::model::{AggregationType, MetricKind, ValueFormat};
use metrica::semantic::{MetricEngine, MetricError};

const MODEL: &str = include_str!("../fixtures/model.toml");

#[test]
fn test_fixture_model_loads() {
    let model = load_model(MODEL, TimeKeys::default()).unwrap();
    let registry = &model.registry;

    assert_eq!(registry.metric_names().len(), 13);
    assert_eq!(registry.fact_tables().len(), 2);
    assert_eq!(model.labels.len(), 2);
    assert!(registry.validate_references(None).is_empty());

    let sales = registry.fact_table("sales").unwrap();
    assert_eq!(sales.grain, vec!["year", "month", "regionId", "productId"]);
    let quantity = sales.measure("quantity").unwrap();
    assert_eq!(quantity.column, "quantity");
    assert_eq!(quantity.default_agg, AggregationType::Sum);
    assert_eq!(sales.measure("avg_amount").unwrap().column, "amount");

    assert_eq!(
        registry.metric("revenue").and_then(|m| m.description.as_deref()),
        Some("Total sales amount")
    );
    assert_eq!(registry.display_format("revenue_ytd"), Some(ValueFormat::Currency));
    assert_eq!(registry.display_format("attainment"), Some(ValueFormat::Percent));
}

#[test]
fn test_derived_dependencies_include_combine_references() {
    let model = load_model(MODEL, TimeKeys::default()).unwrap();
    let growth = model.registry.metric("yoy_growth").unwrap();
    assert_eq!(growth.dependencies(), vec!["revenue", "revenue_py"]);

    let attainment = model.registry.metric("attainment").unwrap();
    assert_eq!(attainment.dependencies(), vec!["revenue", "budget"]);
}

#[test]
fn test_fixture_paths() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let model = load_model_file(&root.join("model.toml"), TimeKeys::default()).unwrap();
    let db = load_dataset_file(&root.join("sales.json")).unwrap();

    assert_eq!(db.table_names(), vec!["budget", "products", "regions", "sales"]);
    let engine = MetricEngine::new(&model.registry, &db);
    assert_eq!(
        engine
            .evaluate_metric("revenue", &FilterContext::new().with("year", 2025))
            .unwrap(),
        Some(2800.0)
    );
}

#[test]
fn test_custom_time_keys() {
    let model = load_model(
        r#"
[fact_tables.ledger]
grain = ["fy", "period"]

[fact_tables.ledger.measures.amount]

[metrics.spend]
kind = "fact"
fact_table = "ledger"
measure = "amount"

[metrics.spend_ytd]
kind = "transform"
base = "spend"
transform = "ytd"
"#,
        TimeKeys {
            year_key: "fy".into(),
            period_key: "period".into(),
        },
    )
    .unwrap();
    let db = load_dataset(
        r#"{"ledger": [
            {"fy": 2025, "period": 1, "amount": 10},
            {"fy": 2025, "period": 2, "amount": 20},
            {"fy": 2025, "period": 3, "amount": 40}
        ]}"#,
    )
    .unwrap();

    let engine = MetricEngine::new(&model.registry, &db);
    let ctx = FilterContext::new().with("fy", 2025).with("period", 2);
    assert_eq!(engine.evaluate_metric("spend_ytd", &ctx).unwrap(), Some(30.0));
}

#[test]
fn test_fact_metric_aggregation_override() {
    let model = load_model(
        r#"
[fact_tables.sales]
grain = ["year"]

[fact_tables.sales.measures.amount]

[metrics.avg_amount]
kind = "fact"
fact_table = "sales"
measure = "amount"
agg = "avg"
"#,
        TimeKeys::default(),
    )
    .unwrap();
    match &model.registry.metric("avg_amount").unwrap().kind {
        MetricKind::FactMeasure(m) => assert_eq!(m.aggregation, Some(AggregationType::Avg)),
        other => panic!("expected fact measure, got {:?}", other),
    }
}

#[test]
fn test_unsupported_aggregation() {
    let err = load_model(
        r#"
[fact_tables.sales]
grain = ["year"]

[fact_tables.sales.measures.amount]
agg = "median"
"#,
        TimeKeys::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        LoadError::Metric(MetricError::UnsupportedAggregation(ref tag)) if tag == "median"
    ));
}

#[test]
fn test_unknown_metric_kind() {
    let err = load_model(
        "[metrics.x]\nkind = \"window\"\n",
        TimeKeys::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::InvalidDefinition { ref name, .. } if name == "x"));
}

#[test]
fn test_missing_required_field() {
    let err = load_model(
        "[metrics.revenue]\nkind = \"fact\"\nfact_table = \"sales\"\n",
        TimeKeys::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::MissingField { field: "measure", .. }));

    let err = load_model("[fact_tables.sales]\n", TimeKeys::default()).unwrap_err();
    assert!(matches!(err, LoadError::MissingField { field: "grain", .. }));
}

#[test]
fn test_unknown_keys_rejected() {
    let err = load_model(
        "[metrics.revenue]\nkind = \"fact\"\nfactTable = \"sales\"\n",
        TimeKeys::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::Toml(_)));
}

#[test]
fn test_invalid_format() {
    let err = load_model(
        "[metrics.x]\nkind = \"transform\"\nbase = \"y\"\ntransform = \"ytd\"\nformat = \"ratio\"\n",
        TimeKeys::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::InvalidDefinition { kind: "metric", .. }));
}

#[test]
fn test_cyclic_model_rejected() {
    let err = load_model(
        r#"
[metrics.a]
kind = "derived"
combine = { op = "sum" }
depends_on = ["b"]

[metrics.b]
kind = "transform"
base = "a"
transform = "prior_period"
"#,
        TimeKeys::default(),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cyclic metric definition: a -> b -> a"
    );
}

#[test]
fn test_derived_without_dependencies() {
    let err = load_model(
        "[metrics.total]\nkind = \"derived\"\ncombine = { op = \"sum\" }\n",
        TimeKeys::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::InvalidDefinition { ref name, .. } if name == "total"));
}
