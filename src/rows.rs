//! Lazy row sets over in-memory tables.
//!
//! A [`RowSet`] is a borrowed slice of rows plus a stack of deferred
//! predicates. Filtering only pushes a predicate; rows are visited when a
//! terminal operation (`sum`, `average`, `count`, `group_by`, `iter`) runs.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::model::Row;

type Predicate<'a> = Rc<dyn Fn(&Row) -> bool + 'a>;

/// A deferred, composable view over a table's rows.
#[derive(Clone)]
pub struct RowSet<'a> {
    rows: &'a [Row],
    predicates: Vec<Predicate<'a>>,
}

/// One partition produced by [`RowSet::group_by`].
#[derive(Debug, Clone)]
pub struct Group<'a, K> {
    pub key: K,
    pub rows: Vec<&'a Row>,
}

impl<'a> RowSet<'a> {
    /// Wrap a table's rows without filtering.
    pub fn new(rows: &'a [Row]) -> Self {
        Self {
            rows,
            predicates: Vec::new(),
        }
    }

    /// Narrow the set to rows satisfying `predicate`. Nothing is evaluated yet.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Row) -> bool + 'a,
    {
        self.predicates.push(Rc::new(predicate));
        self
    }

    /// Iterate the rows that pass every predicate.
    pub fn iter(&self) -> impl Iterator<Item = &'a Row> + '_ {
        self.rows
            .iter()
            .filter(move |row| self.predicates.iter().all(|p| p(*row)))
    }

    /// Sum a selector over the set. An empty set sums to 0.
    pub fn sum<F>(&self, selector: F) -> f64
    where
        F: Fn(&Row) -> f64,
    {
        self.iter().map(selector).sum()
    }

    /// Mean of a selector over the set, or `None` when the set is empty.
    pub fn average<F>(&self, selector: F) -> Option<f64>
    where
        F: Fn(&Row) -> f64,
    {
        let (total, n) = self
            .iter()
            .fold((0.0, 0usize), |(total, n), row| (total + selector(row), n + 1));
        if n == 0 {
            None
        } else {
            Some(total / n as f64)
        }
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Partition the set by `key`, in the order keys are first encountered.
    pub fn group_by<K, F>(&self, key: F) -> Vec<Group<'a, K>>
    where
        K: Eq + Hash + Clone,
        F: Fn(&Row) -> K,
    {
        let mut positions: HashMap<K, usize> = HashMap::new();
        let mut groups: Vec<Group<'a, K>> = Vec::new();

        for row in self.iter() {
            let k = key(row);
            match positions.get(&k) {
                Some(&idx) => groups[idx].rows.push(row),
                None => {
                    positions.insert(k.clone(), groups.len());
                    groups.push(Group {
                        key: k,
                        rows: vec![row],
                    });
                }
            }
        }

        groups
    }

    /// Union of the column names of every row in the set.
    pub fn columns(&self) -> BTreeSet<String> {
        self.iter().flat_map(|row| row.keys().cloned()).collect()
    }
}

impl fmt::Debug for RowSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowSet")
            .field("source_rows", &self.rows.len())
            .field("predicates", &self.predicates.len())
            .finish()
    }
}
