use insta::assert_snapshot;

use metrica::context::{FilterContext, TimeKeys};
use metrica::database::Database;
use metrica::format::FormatSettings;
use metrica::loader::{load_dataset, load_model, Model};
use metrica::model::{FactTable, Metric, Row, Value};
use metrica::semantic::{
    LabelLookup, MetricEngine, MetricError, MetricRegistry, PivotQuery, PivotRow,
};

const MODEL: &str = include_str!("../fixtures/model.toml");
const DATASET: &str = include_str!("../fixtures/sales.json");

fn fixture() -> (Model, Database) {
    (
        load_model(MODEL, TimeKeys::default()).unwrap(),
        load_dataset(DATASET).unwrap(),
    )
}

fn region_keys(rows: &[PivotRow]) -> Vec<Value> {
    rows.iter()
        .filter_map(|r| r.dimension("regionId").cloned())
        .collect()
}

#[test]
fn test_pivot_by_region_in_first_encounter_order() {
    let (model, db) = fixture();
    let engine = MetricEngine::new(&model.registry, &db);
    let query = PivotQuery::new("sales")
        .with_rows(["regionId"])
        .with_filters(FilterContext::new().with("year", 2025))
        .with_metrics(["revenue", "budget", "attainment"]);

    let rows = engine.run_query(&query).unwrap();
    assert_eq!(region_keys(&rows), vec![Value::from("NA"), Value::from("EU")]);
    assert_eq!(rows[0].value("revenue"), Some(1950.0));
    assert_eq!(rows[0].value("budget"), Some(1800.0));
    assert_eq!(rows[1].value("revenue"), Some(850.0));
    assert_eq!(rows[1].value("budget"), Some(1000.0));
    assert_eq!(
        rows[1].cell("attainment").and_then(|c| c.display.as_deref()),
        Some("85.0%")
    );
}

#[test]
fn test_pivot_matches_direct_evaluation() {
    let (model, db) = fixture();
    let engine = MetricEngine::new(&model.registry, &db);
    let base = FilterContext::new().with("year", 2025).with("month", 2);
    let query = PivotQuery::new("sales")
        .with_rows(["regionId"])
        .with_filters(base.clone())
        .with_metrics(["revenue_ytd", "revenue_py"]);

    for row in engine.run_query(&query).unwrap() {
        let region = row.dimension("regionId").cloned().unwrap();
        let ctx = base.with("regionId", region);
        for metric in ["revenue_ytd", "revenue_py"] {
            assert_eq!(
                row.value(metric),
                engine.evaluate_metric(metric, &ctx).unwrap()
            );
        }
    }
}

#[test]
fn test_pivot_by_two_dimensions() {
    let (model, db) = fixture();
    let engine = MetricEngine::new(&model.registry, &db);
    let query = PivotQuery::new("sales")
        .with_rows(["regionId", "productId"])
        .with_filters(FilterContext::new().with("year", 2024))
        .with_metrics(["revenue"]);

    let rows = engine.run_query(&query).unwrap();
    let summary: Vec<(String, String, Option<f64>)> = rows
        .iter()
        .map(|r| {
            (
                r.dimensions[0].1.to_string(),
                r.dimensions[1].1.to_string(),
                r.value("revenue"),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("NA".to_string(), "P1".to_string(), Some(1350.0)),
            ("NA".to_string(), "P2".to_string(), Some(480.0)),
            ("EU".to_string(), "P1".to_string(), Some(500.0)),
            ("EU".to_string(), "P2".to_string(), Some(300.0)),
        ]
    );
}

#[test]
fn test_no_matching_rows_yields_no_groups() {
    let (model, db) = fixture();
    let engine = MetricEngine::new(&model.registry, &db);
    let query = PivotQuery::new("sales")
        .with_rows(["regionId"])
        .with_filters(FilterContext::new().with("year", 1999))
        .with_metrics(["revenue"]);
    assert!(engine.run_query(&query).unwrap().is_empty());
}

#[test]
fn test_labels_and_json_output() {
    let (model, db) = fixture();
    let engine = MetricEngine::new(&model.registry, &db);
    let query = PivotQuery::new("sales")
        .with_rows(["regionId"])
        .with_filters(FilterContext::new().with("year", 2025))
        .with_metrics(["revenue", "attainment", "order_count"])
        .with_labels(model.labels.clone());

    let rows = engine.run_query(&query).unwrap();
    assert_eq!(rows[0].label("region"), Some(&Value::from("North America")));
    // productId is not a row dimension
    assert_eq!(rows[0].label("product"), None);

    let text = serde_json::to_string(&rows[0].to_json()).unwrap();
    assert_snapshot!(text, @r#"{"regionId":"NA","region":"North America","revenue":"$1,950.00","attainment":"108.3%","order_count":"2"}"#);
}

#[test]
fn test_custom_format_settings() {
    let (model, db) = fixture();
    let settings = FormatSettings {
        currency_symbol: "€".to_string(),
        decimals: 0,
        percent_decimals: 2,
    };
    let engine = MetricEngine::new(&model.registry, &db).with_format_settings(settings);
    let query = PivotQuery::new("sales")
        .with_rows(["regionId"])
        .with_filters(FilterContext::new().with("year", 2024))
        .with_metrics(["revenue", "attainment"]);

    let rows = engine.run_query(&query).unwrap();
    let na = &rows[0];
    assert_eq!(na.cell("revenue").and_then(|c| c.display.clone()), Some("€1,830".into()));
    assert_eq!(na.cell("attainment").and_then(|c| c.display.clone()), Some("122.00%".into()));
}

fn partial_rows() -> Database {
    let row = |region: Option<&str>, amount: i64| -> Row {
        let mut row = Row::new();
        row.insert("year".into(), Value::Int(2025));
        if let Some(region) = region {
            row.insert("regionId".into(), Value::from(region));
        }
        row.insert("amount".into(), Value::Int(amount));
        row
    };
    Database::new().with_table(
        "sales",
        vec![
            row(Some("NA"), 100),
            row(None, 20),
            row(Some("EU"), 50),
            row(None, 5),
        ],
    )
}

fn simple_registry() -> MetricRegistry {
    MetricRegistry::builder()
        .fact_table(
            FactTable::new("sales")
                .with_grain(["year", "regionId"])
                .with_sum("amount", "amount"),
        )
        .metric(Metric::fact_measure("revenue", "sales", "amount"))
        .build()
        .unwrap()
}

#[test]
fn test_missing_dimension_forms_one_null_group() {
    let registry = simple_registry();
    let db = partial_rows();
    let engine = MetricEngine::new(&registry, &db);
    let query = PivotQuery::new("sales")
        .with_rows(["regionId"])
        .with_metrics(["revenue"])
        .with_label(LabelLookup::new("regionId", "regions", "regionId", "regionName", "region"));

    let rows = engine.run_query(&query).unwrap();
    assert_eq!(
        region_keys(&rows),
        vec![Value::from("NA"), Value::Null, Value::from("EU")]
    );
    // the null group leaves the region unconstrained
    assert_eq!(rows[1].value("revenue"), Some(175.0));
    assert!(rows[1].labels.is_empty());
}

#[test]
fn test_pivot_without_registered_definition() {
    let registry = MetricRegistry::builder()
        .fact_table(FactTable::new("sales").with_grain(["year"]).with_sum("amount", "amount"))
        .metric(Metric::fact_measure("revenue", "sales", "amount"))
        .build()
        .unwrap();
    let db = partial_rows().with_table("regions_raw", partial_rows().table("sales").unwrap().to_vec());
    let engine = MetricEngine::new(&registry, &db);

    // regions_raw has rows but no definition; its columns still filter
    let query = PivotQuery::new("regions_raw")
        .with_rows(["regionId"])
        .with_filters(FilterContext::new().with("regionId", "EU"))
        .with_metrics(["revenue"]);
    let rows = engine.run_query(&query).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].dimension("regionId"), Some(&Value::from("EU")));
    // revenue's own grain has no regionId, so it sees the whole year
    assert_eq!(rows[0].value("revenue"), Some(175.0));
}

#[test]
fn test_errors_abort_the_query() {
    let (model, db) = fixture();
    let engine = MetricEngine::new(&model.registry, &db);

    let unknown_table = PivotQuery::new("returns").with_metrics(["revenue"]);
    assert_eq!(
        engine.run_query(&unknown_table),
        Err(MetricError::UnknownFactTable("returns".into()))
    );

    let unknown_metric = PivotQuery::new("sales")
        .with_rows(["regionId"])
        .with_metrics(["revenue", "profit"]);
    assert_eq!(
        engine.run_query(&unknown_metric),
        Err(MetricError::UnknownMetric("profit".into()))
    );
}

#[test]
fn test_query_from_json() {
    let query: PivotQuery = serde_json::from_str(
        r#"{"fact_table": "sales", "rows": ["regionId"], "filters": {"year": 2025, "month": {"lte": 1}}, "metrics": ["revenue"]}"#,
    )
    .unwrap();
    let (model, db) = fixture();
    let rows = MetricEngine::new(&model.registry, &db).run_query(&query).unwrap();
    assert_eq!(rows[0].value("revenue"), Some(1000.0));
    assert_eq!(rows[1].value("revenue"), Some(400.0));
}

#[test]
fn test_equal_numbers_share_a_group() {
    let row = |year: Value, amount: i64| -> Row {
        let mut row = Row::new();
        row.insert("year".into(), year);
        row.insert("regionId".into(), Value::from("NA"));
        row.insert("amount".into(), Value::Int(amount));
        row
    };
    let db = Database::new().with_table(
        "sales",
        vec![row(Value::Int(2024), 10), row(Value::Float(2024.0), 5)],
    );
    let registry = simple_registry();
    let engine = MetricEngine::new(&registry, &db);
    let query = PivotQuery::new("sales")
        .with_rows(["year"])
        .with_metrics(["revenue"]);

    let rows = engine.run_query(&query).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].dimension("year"), Some(&Value::Int(2024)));
    assert_eq!(rows[0].value("revenue"), Some(15.0));
}

#[test]
fn test_query_with_array_filter_is_rejected() {
    let query = serde_json::from_str::<PivotQuery>(
        r#"{"fact_table": "sales", "filters": {"year": [2024, 2025]}, "metrics": ["revenue"]}"#,
    );
    assert!(query.is_err());
}
