//! The in-memory database: fact rows and lookup tables by name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::Row;
use crate::rows::RowSet;

/// Named tables of rows.
///
/// Holds fact tables (keyed by the same name as their `FactTable` definition)
/// and lookup tables used for label enrichment. Read-only during evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    tables: HashMap<String, Vec<Row>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table.
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.insert_table(name, rows);
        self
    }

    pub fn insert_table(&mut self, name: impl Into<String>, rows: Vec<Row>) {
        self.tables.insert(name.into(), rows);
    }

    pub fn table(&self, name: &str) -> Option<&[Row]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    /// An unfiltered row set over a table.
    pub fn rows(&self, name: &str) -> Option<RowSet<'_>> {
        self.table(name).map(RowSet::new)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
