//! Filter values and the matcher that decides whether a cell satisfies one.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::model::Value;

/// A constraint on one dimension key.
///
/// Deserialization is structural: any object/table is a [`RangeFilter`]
/// (unknown keys ignored, so `{}` matches everything); every primitive is an
/// equality filter. Arrays are neither and fail to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Range(RangeFilter),
    Equals(Value),
}

/// Comparison bounds. Every bound is optional and checked independently.
///
/// `from`/`to` and `gte`/`lte` are inclusive, `gt`/`lt` exclusive.
/// Only an object/table deserializes into a range; arrays are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
}

/// Field layout of a range object; unknown keys are ignored.
#[derive(Deserialize)]
struct RangeFields {
    #[serde(default)]
    from: Option<Value>,
    #[serde(default)]
    to: Option<Value>,
    #[serde(default)]
    gte: Option<Value>,
    #[serde(default)]
    lte: Option<Value>,
    #[serde(default)]
    gt: Option<Value>,
    #[serde(default)]
    lt: Option<Value>,
}

struct RangeVisitor;

impl<'de> Visitor<'de> for RangeVisitor {
    type Value = RangeFilter;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a range object with from/to/gte/lte/gt/lt bounds")
    }

    fn visit_map<A>(self, map: A) -> Result<RangeFilter, A::Error>
    where
        A: MapAccess<'de>,
    {
        let fields = RangeFields::deserialize(de::value::MapAccessDeserializer::new(map))?;
        Ok(RangeFilter {
            from: fields.from,
            to: fields.to,
            gte: fields.gte,
            lte: fields.lte,
            gt: fields.gt,
            lt: fields.lt,
        })
    }
}

impl<'de> Deserialize<'de> for RangeFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RangeVisitor)
    }
}

impl FilterValue {
    /// Null filters impose no constraint and are skipped by the grain filter.
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Equals(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FilterValue::Equals(v) => Some(v),
            FilterValue::Range(_) => None,
        }
    }

    /// Same filter with every value in [`Value::canonical`] form.
    pub fn canonical(&self) -> FilterValue {
        match self {
            FilterValue::Equals(v) => FilterValue::Equals(v.canonical()),
            FilterValue::Range(r) => FilterValue::Range(r.map_bounds(|b| Some(b.canonical()))),
        }
    }
}

macro_rules! equals_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::Equals(value.into())
                }
            }
        )*
    };
}

equals_from!(Value, &str, String, i64, i32, f64, bool);

impl From<RangeFilter> for FilterValue {
    fn from(range: RangeFilter) -> Self {
        FilterValue::Range(range)
    }
}

impl RangeFilter {
    /// Inclusive `from..=to` range.
    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
            ..Self::default()
        }
    }

    pub fn at_most(bound: impl Into<Value>) -> Self {
        Self {
            lte: Some(bound.into()),
            ..Self::default()
        }
    }

    pub fn at_least(bound: impl Into<Value>) -> Self {
        Self {
            gte: Some(bound.into()),
            ..Self::default()
        }
    }

    pub fn below(bound: impl Into<Value>) -> Self {
        Self {
            lt: Some(bound.into()),
            ..Self::default()
        }
    }

    pub fn above(bound: impl Into<Value>) -> Self {
        Self {
            gt: Some(bound.into()),
            ..Self::default()
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.bounds().all(|(_, bound)| bound.is_none())
    }

    /// Number of bounds present.
    pub fn bound_count(&self) -> usize {
        self.bounds().filter(|(_, bound)| bound.is_some()).count()
    }

    /// Check a value against every present bound.
    pub fn contains(&self, value: &Value) -> bool {
        self.bounds().all(|(op, bound)| match bound {
            None => true,
            Some(bound) => match value.compare(bound) {
                None => false,
                Some(ord) => op.accepts(ord),
            },
        })
    }

    /// Apply `f` to every present bound, dropping bounds it cannot map.
    pub fn map_bounds<F>(&self, f: F) -> Self
    where
        F: Fn(&Value) -> Option<Value>,
    {
        let map = |bound: &Option<Value>| bound.as_ref().and_then(&f);
        Self {
            from: map(&self.from),
            to: map(&self.to),
            gte: map(&self.gte),
            lte: map(&self.lte),
            gt: map(&self.gt),
            lt: map(&self.lt),
        }
    }

    fn bounds(&self) -> impl Iterator<Item = (BoundOp, &Option<Value>)> {
        [
            (BoundOp::AtLeast, &self.from),
            (BoundOp::AtMost, &self.to),
            (BoundOp::AtLeast, &self.gte),
            (BoundOp::AtMost, &self.lte),
            (BoundOp::Above, &self.gt),
            (BoundOp::Below, &self.lt),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Copy)]
enum BoundOp {
    AtLeast,
    AtMost,
    Above,
    Below,
}

impl BoundOp {
    /// `ord` is the ordering of the cell value relative to the bound.
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            BoundOp::AtLeast => ord != Ordering::Less,
            BoundOp::AtMost => ord != Ordering::Greater,
            BoundOp::Above => ord == Ordering::Greater,
            BoundOp::Below => ord == Ordering::Less,
        }
    }
}

/// Decide whether a cell value satisfies a filter value.
///
/// Never fails: mismatched kinds simply do not match.
pub fn matches(value: &Value, filter: &FilterValue) -> bool {
    match filter {
        FilterValue::Range(range) => range.contains(value),
        FilterValue::Equals(expected) => value == expected,
    }
}
