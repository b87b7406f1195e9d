//! Filter expressions as written on the command line.
//!
//! | Expression     | Filter                         |
//! |----------------|--------------------------------|
//! | `year=2025`    | equals `2025`                  |
//! | `month=1..3`   | inclusive range `from 1 to 3`  |
//! | `month>=2`     | `gte 2`                        |
//! | `month<=2`     | `lte 2`                        |
//! | `month>2`      | `gt 2`                         |
//! | `month<2`      | `lt 2`                         |
//!
//! Values parse as integer, float, boolean or `null` before falling back to a
//! string; quotes force a string.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use super::{FilterContext, FilterValue, RangeFilter};
use crate::model::Value;

static FILTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_.]*)\s*(>=|<=|=|>|<)\s*(.*?)\s*$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("Invalid filter expression '{0}': expected KEY=VALUE, KEY=FROM..TO or KEY>=VALUE")]
    Malformed(String),

    #[error("Filter expression '{0}' has no value")]
    MissingValue(String),
}

/// A quoted token is always a string; anything else goes through [`Value::parse_token`].
fn parse_value(token: &str) -> Value {
    let quoted = token.len() >= 2
        && ((token.starts_with('"') && token.ends_with('"'))
            || (token.starts_with('\'') && token.ends_with('\'')));
    if quoted {
        Value::String(token[1..token.len() - 1].to_string())
    } else {
        Value::parse_token(token)
    }
}

/// Parse one `KEY<op>VALUE` expression.
pub fn parse_filter(expr: &str) -> Result<(String, FilterValue), FilterParseError> {
    let caps = FILTER_PATTERN
        .captures(expr)
        .ok_or_else(|| FilterParseError::Malformed(expr.to_string()))?;

    let key = caps[1].to_string();
    let op = &caps[2];
    let raw = &caps[3];
    if raw.is_empty() {
        return Err(FilterParseError::MissingValue(expr.to_string()));
    }

    let filter = match op {
        "=" => match raw.split_once("..") {
            Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
                RangeFilter::between(parse_value(from.trim()), parse_value(to.trim())).into()
            }
            Some(_) => return Err(FilterParseError::MissingValue(expr.to_string())),
            None => FilterValue::Equals(parse_value(raw)),
        },
        ">=" => RangeFilter::at_least(parse_value(raw)).into(),
        "<=" => RangeFilter::at_most(parse_value(raw)).into(),
        ">" => RangeFilter::above(parse_value(raw)).into(),
        "<" => RangeFilter::below(parse_value(raw)).into(),
        _ => return Err(FilterParseError::Malformed(expr.to_string())),
    };

    Ok((key, filter))
}

/// Parse several expressions into one context. Later keys replace earlier ones.
pub fn parse_filters<I, S>(exprs: I) -> Result<FilterContext, FilterParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    exprs
        .into_iter()
        .map(|e| parse_filter(e.as_ref()))
        .collect::<Result<Vec<_>, _>>()
        .map(|pairs| pairs.into_iter().collect())
}
