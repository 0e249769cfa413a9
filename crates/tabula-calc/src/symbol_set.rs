//! Unordered membership set for symbol names.

use indexmap::IndexSet;

/// A set of symbol names. Membership order is unspecified; callers that
/// need a presentable order use [`SymbolSet::append_names`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSet(IndexSet<String>);

impl SymbolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str) {
        if !self.0.contains(name) {
            self.0.insert(name.to_string());
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.0.swap_remove(name);
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Append the members to `names` in lexicographic order.
    pub fn append_names(&self, names: &mut Vec<String>) {
        let start = names.len();
        names.extend(self.0.iter().cloned());
        names[start..].sort_unstable();
    }

    /// Remove and return an arbitrary member, or the empty string when
    /// the set is empty.
    pub fn take_any_one(&mut self) -> String {
        self.0.pop().unwrap_or_default()
    }
}
