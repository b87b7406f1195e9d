use metrica::context::{
    matches, parse_filter, parse_filters, FilterContext, FilterParseError, FilterValue,
    RangeFilter,
};
use metrica::model::Value;

#[test]
fn test_equality_filter() {
    let filter = FilterValue::from("NA");
    assert!(matches(&Value::from("NA"), &filter));
    assert!(!matches(&Value::from("EU"), &filter));
    assert!(!matches(&Value::Null, &filter));
}

#[test]
fn test_numeric_equality_across_int_and_float() {
    assert!(matches(&Value::Float(2.0), &FilterValue::from(2)));
    assert!(!matches(&Value::from("2"), &FilterValue::from(2)));
}

#[test]
fn test_range_bounds_are_checked_independently() {
    let range = RangeFilter {
        gte: Some(Value::Int(2)),
        lt: Some(Value::Int(5)),
        ..RangeFilter::default()
    };
    let filter = FilterValue::from(range);

    assert!(!matches(&Value::Int(1), &filter));
    assert!(matches(&Value::Int(2), &filter));
    assert!(matches(&Value::Float(4.5), &filter));
    assert!(!matches(&Value::Int(5), &filter));
}

#[test]
fn test_range_never_matches_incomparable_values() {
    let filter = FilterValue::from(RangeFilter::at_most(3));
    assert!(!matches(&Value::Null, &filter));
    assert!(!matches(&Value::from("1"), &filter));
}

#[test]
fn test_empty_range_matches_everything() {
    let filter = FilterValue::from(RangeFilter::default());
    assert!(matches(&Value::Null, &filter));
    assert!(matches(&Value::from("anything"), &filter));
}

#[test]
fn test_string_ranges_compare_lexicographically() {
    let filter = FilterValue::from(RangeFilter::between("2024-01", "2024-06"));
    assert!(matches(&Value::from("2024-03"), &filter));
    assert!(!matches(&Value::from("2024-07"), &filter));
}

#[test]
fn test_context_deserializes_ranges_and_values() {
    let ctx: FilterContext =
        serde_json::from_str(r#"{"year": 2025, "month": {"lte": 2}, "regionId": null}"#).unwrap();

    assert_eq!(ctx.value("year"), Some(&Value::Int(2025)));
    assert_eq!(
        ctx.get("month"),
        Some(&FilterValue::from(RangeFilter::at_most(2)))
    );
    assert!(ctx.get("regionId").is_some_and(FilterValue::is_null));
}

#[test]
fn test_context_from_toml() {
    let ctx: FilterContext = toml::from_str("year = 2025\nmonth = { from = 1, to = 3 }").unwrap();
    assert_eq!(
        ctx.get("month"),
        Some(&FilterValue::from(RangeFilter::between(1, 3)))
    );
}

#[test]
fn test_context_rejects_array_filters() {
    assert!(serde_json::from_str::<FilterContext>(r#"{"year": [2024, 2025]}"#).is_err());
    assert!(serde_json::from_str::<FilterContext>(r#"{"regionId": []}"#).is_err());
    assert!(toml::from_str::<FilterContext>("year = [2024, 2025]").is_err());
}

#[test]
fn test_parse_filter_operators() {
    assert_eq!(
        parse_filter("year=2025").unwrap(),
        ("year".to_string(), FilterValue::from(2025))
    );
    assert_eq!(
        parse_filter("month = 1..3").unwrap(),
        ("month".to_string(), FilterValue::from(RangeFilter::between(1, 3)))
    );
    assert_eq!(
        parse_filter("month>=2").unwrap().1,
        FilterValue::from(RangeFilter::at_least(2))
    );
    assert_eq!(
        parse_filter("month<=2").unwrap().1,
        FilterValue::from(RangeFilter::at_most(2))
    );
    assert_eq!(
        parse_filter("month>2").unwrap().1,
        FilterValue::from(RangeFilter::above(2))
    );
    assert_eq!(
        parse_filter("month<2").unwrap().1,
        FilterValue::from(RangeFilter::below(2))
    );
    assert_eq!(
        parse_filter("regionId=NA").unwrap().1,
        FilterValue::from("NA")
    );
    assert!(parse_filter("regionId=null").unwrap().1.is_null());
}

#[test]
fn test_parse_filters_later_keys_win() {
    let ctx = parse_filters(["year=2024", "regionId=NA", "year=2025"]).unwrap();
    assert_eq!(ctx.len(), 2);
    assert_eq!(ctx.value("year"), Some(&Value::Int(2025)));

    let err = parse_filters(["year=2025", "oops"]).unwrap_err();
    assert_eq!(err, FilterParseError::Malformed("oops".into()));
}
