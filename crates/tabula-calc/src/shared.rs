//! A mutex-guarded table that shares evaluation snapshots.
//!
//! Mutators take the lock, apply the update, and purge every cache.
//! Readers take the lock, fill the caches if absent, and hand back
//! shared `Arc`s, so concurrent readers observe one computed snapshot
//! per table generation instead of re-evaluating. Invalidation is total;
//! symbol counts are expected to stay small enough that re-evaluating
//! everything is cheap.

use crate::table::{SymbolValue, Table};
use std::sync::{Arc, Mutex, MutexGuard};
use tabula_expr::{Diagnostics, Expression, Value};

/// The cached result of a full [`Table::values`] pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Entries in scheduler visit order, cycled names last.
    pub entries: Vec<SymbolValue>,
    /// Every diagnostic the pass produced.
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Default)]
struct Inner {
    table: Table,
    values: Option<Arc<Snapshot>>,
    names: Option<Arc<Vec<String>>>,
}

impl Inner {
    fn purge(&mut self) {
        self.values = None;
        self.names = None;
    }
}

/// Thread-safe wrapper around [`Table`] with snapshot caching.
#[derive(Debug, Default)]
pub struct SharedTable {
    inner: Mutex<Inner>,
}

impl SharedTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn define(&self, name: &str, expr: Expression) {
        let mut inner = self.lock();
        inner.table.define(name, expr);
        inner.purge();
    }

    pub fn remove(&self, name: &str) {
        let mut inner = self.lock();
        inner.table.remove(name);
        inner.purge();
    }

    pub fn define_func(&self, name: &str, params: Vec<String>, variadic: bool, body: Expression) {
        let mut inner = self.lock();
        inner.table.define_func(name, params, variadic, body);
        inner.purge();
    }

    pub fn remove_func(&self, name: &str) {
        let mut inner = self.lock();
        inner.table.remove_func(name);
        inner.purge();
    }

    /// The shared snapshot of every symbol's value, computing it under
    /// the lock if no cached one exists.
    pub fn values(&self) -> Arc<Snapshot> {
        let mut inner = self.lock();
        if let Some(snapshot) = &inner.values {
            return Arc::clone(snapshot);
        }
        let (entries, diagnostics) = inner.table.values();
        let snapshot = Arc::new(Snapshot {
            entries,
            diagnostics,
        });
        inner.values = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Diagnostics of the current snapshot.
    pub fn diagnostics(&self) -> Diagnostics {
        self.values().diagnostics.clone()
    }

    /// Sorted defined names, shared and cached like [`SharedTable::values`].
    pub fn names(&self) -> Arc<Vec<String>> {
        let mut inner = self.lock();
        if let Some(names) = &inner.names {
            return Arc::clone(names);
        }
        let mut names = inner.table.names_with_prefix("");
        names.sort_unstable();
        let names = Arc::new(names);
        inner.names = Some(Arc::clone(&names));
        names
    }

    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.lock().table.names_with_prefix(prefix)
    }

    pub fn source(&self, name: &str) -> String {
        self.lock().table.source(name).to_string()
    }

    /// Evaluate an expression against the table under the lock. Not
    /// cached; ad-hoc expressions rarely repeat.
    pub fn eval(&self, expr: &Expression) -> (Value, Diagnostics) {
        self.lock().table.eval(expr)
    }

    /// Evaluate one symbol under the lock.
    pub fn value(&self, name: &str) -> (Value, Diagnostics) {
        self.lock().table.value(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_expr::parse_expression;

    fn expr(src: &str, name: &str) -> Expression {
        let (parsed, diags) = parse_expression(src, name);
        assert!(!diags.has_errors());
        parsed
    }

    #[test]
    fn values_snapshot_is_shared_until_invalidated() {
        let table = SharedTable::new();
        table.define("a", expr("1", "a"));

        let first = table.values();
        let second = table.values();
        assert!(Arc::ptr_eq(&first, &second));

        table.define("b", expr("a + 1", "b"));
        let third = table.values();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.entries.len(), 2);
    }

    #[test]
    fn every_mutator_purges_the_caches() {
        let table = SharedTable::new();
        table.define("a", expr("1", "a"));

        let before = table.names();
        table.remove("a");
        assert!(table.names().is_empty());
        assert_eq!(*before, vec!["a".to_string()]);

        let snap = table.values();
        table.define_func("f", vec!["x".into()], false, expr("x", "f"));
        assert!(!Arc::ptr_eq(&snap, &table.values()));

        let snap = table.values();
        table.remove_func("f");
        assert!(!Arc::ptr_eq(&snap, &table.values()));
    }

    #[test]
    fn snapshot_reflects_table_state() {
        let table = SharedTable::new();
        table.define("x", expr("2", "x"));
        table.define("y", expr("x * 3", "y"));

        let snapshot = table.values();
        assert!(!snapshot.diagnostics.has_errors());
        assert_eq!(snapshot.entries[0].symbol, "x");
        assert_eq!(snapshot.entries[1].symbol, "y");
        assert_eq!(snapshot.entries[1].value, Value::Number(6.0));
        assert!(table.diagnostics().is_empty());
    }

    #[test]
    fn shared_table_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedTable>();
    }
}
