//! Per-kind default values kept as data.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::schema::field::FieldSpec;

/// Default wire tokens keyed by entity kind and field name.
///
/// Resource families such as storage backends share one schema but differ in
/// defaults; the table holds the differences so extraction code stays the
/// same for every kind.
#[derive(Debug, Clone)]
pub struct DefaultTable<K> {
    entries: FxHashMap<(K, &'static str), &'static str>,
}

impl<K: Copy + Eq + Hash> DefaultTable<K> {
    /// Builds a table from `(kind, field, default)` rows. Later rows win.
    pub fn from_rows(rows: &[(K, &'static str, &'static str)]) -> Self {
        let mut entries = FxHashMap::with_capacity_and_hasher(rows.len(), Default::default());
        for &(kind, field, default) in rows {
            entries.insert((kind, field), default);
        }
        Self { entries }
    }

    /// Returns the default token for a field of this kind.
    pub fn get(&self, kind: K, field: &'static str) -> Option<&'static str> {
        self.entries.get(&(kind, field)).copied()
    }

    /// Returns `spec` with this kind's default applied, if the table has one.
    pub fn apply<T>(&self, kind: K, spec: &FieldSpec<T>) -> FieldSpec<T> {
        spec.or_default(self.get(kind, spec.name))
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
