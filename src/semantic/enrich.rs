//! Dimension-label enrichment.
//!
//! Joins a pivot row's dimension keys to human-readable labels held in lookup
//! tables of the database, e.g. `regionId = "NA"` to `region = "North America"`.

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::model::{cell, Value};

/// One dimension-to-label join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelLookup {
    /// Dimension key in the pivot row (e.g., "regionId")
    pub dimension: String,
    /// Lookup table name in the database
    pub table: String,
    /// Join column in the lookup table
    pub key: String,
    /// Label column in the lookup table
    pub label: String,
    /// Output field name for the label
    pub alias: String,
}

impl LabelLookup {
    pub fn new(
        dimension: impl Into<String>,
        table: impl Into<String>,
        key: impl Into<String>,
        label: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            dimension: dimension.into(),
            table: table.into(),
            key: key.into(),
            label: label.into(),
            alias: alias.into(),
        }
    }

    /// The label for `value`, if the lookup table has a matching row.
    pub fn resolve<'a>(&self, value: &Value, database: &'a Database) -> Option<&'a Value> {
        database
            .table(&self.table)?
            .iter()
            .find(|row| cell(row, &self.key) == value)
            .map(|row| cell(row, &self.label))
    }
}

/// Labels for the given dimension values, in lookup order.
///
/// Lookups whose dimension is absent or null, whose table is not loaded, or
/// that find no matching row are skipped.
pub fn enrich_labels(
    dimensions: &[(String, Value)],
    lookups: &[LabelLookup],
    database: &Database,
) -> Vec<(String, Value)> {
    lookups
        .iter()
        .filter_map(|lookup| {
            let (_, value) = dimensions.iter().find(|(k, _)| *k == lookup.dimension)?;
            if value.is_null() {
                return None;
            }
            let label = lookup.resolve(value, database)?;
            Some((lookup.alias.clone(), label.clone()))
        })
        .collect()
}
