//! Directed dependency edges.

use crate::symbol_set::SymbolSet;
use indexmap::IndexMap;

/// A directed multimap of `from -> {to, ...}` edges.
///
/// Inner sets are deleted as soon as they become empty, so
/// [`EdgeSet::from_has_any`] is a constant-time presence test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet(IndexMap<String, SymbolSet>);

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, from: &str, to: &str) {
        self.0.entry(from.to_string()).or_default().add(to);
    }

    pub fn remove(&mut self, from: &str, to: &str) {
        if let Some(targets) = self.0.get_mut(from) {
            targets.remove(to);
            if targets.is_empty() {
                self.0.swap_remove(from);
            }
        }
    }

    pub fn has(&self, from: &str, to: &str) -> bool {
        self.0.get(from).is_some_and(|targets| targets.has(to))
    }

    /// Iterate the targets of `from`; empty when there are none.
    pub fn targets(&self, from: &str) -> impl Iterator<Item = &str> {
        self.0.get(from).into_iter().flat_map(SymbolSet::iter)
    }

    /// Whether `from` has any outgoing edge.
    pub fn from_has_any(&self, from: &str) -> bool {
        self.0.contains_key(from)
    }

    /// Drop every outgoing edge of `from`.
    pub fn remove_from(&mut self, from: &str) {
        self.0.swap_remove(from);
    }

    /// Iterate every `from` that has at least one edge.
    pub fn froms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
