//! Grain-aware filtering.
//!
//! A context constrains a metric only through the keys in that metric's
//! grain. Keys outside the grain are skipped, which is how a coarser-grain
//! metric (a yearly budget, say) ignores a month filter instead of matching
//! nothing.

use crate::context::{matches, FilterContext};
use crate::model::cell;
use crate::rows::RowSet;

/// Narrow `rows` by every non-null filter in `context` whose key is in `grain`.
///
/// Filters are conjunctive, so their order does not matter. The result is
/// still lazy; nothing is scanned until the caller aggregates.
pub fn apply_grain_filters<'a, G>(rows: RowSet<'a>, context: &FilterContext, grain: &[G]) -> RowSet<'a>
where
    G: AsRef<str>,
{
    let mut rows = rows;
    for (key, filter) in context.iter() {
        if filter.is_null() || !grain.iter().any(|g| g.as_ref() == key) {
            continue;
        }
        let key = key.to_string();
        let filter = filter.clone();
        rows = rows.filter(move |row| matches(cell(row, &key), &filter));
    }
    rows
}
