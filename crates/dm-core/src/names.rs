//! Index -> label maps for environment state vectors.

use std::collections::BTreeMap;

/// Human-readable labels for the elements of a state vector, keyed by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    names: BTreeMap<usize, String>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// `len` labels of the form `prefix[i]`.
    pub fn with_defaults(len: usize, prefix: &str) -> Self {
        let mut map = Self::new();
        map.fill_defaults(len, prefix);
        map
    }

    /// Labels taken in order from `names`.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .enumerate()
                .map(|(i, n)| (i, n.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, index: usize, name: impl Into<String>) {
        self.names.insert(index, name.into());
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(&index).map(String::as_str)
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        self.names.remove(&index)
    }

    /// Remove the label at `index` and move every later label down by one.
    pub fn remove_and_shift(&mut self, index: usize) -> Option<String> {
        let removed = self.names.remove(&index);
        let tail = self.names.split_off(&index);
        self.names
            .extend(tail.into_iter().map(|(i, n)| (i - 1, n)));
        removed
    }

    /// Remove every entry labelled `name`; returns whether anything was removed.
    pub fn remove_name(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|_, n| n != name);
        self.names.len() != before
    }

    /// Index of the first entry labelled `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .find_map(|(i, n)| (n == name).then_some(*i))
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Labels ordered by index.
    pub fn names(&self) -> Vec<String> {
        self.names.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(|(i, n)| (*i, n.as_str()))
    }

    /// Resize to exactly `len` entries: labels at `>= len` are dropped, missing
    /// ones become `prefix[i]`, existing labels are kept.
    pub fn fill_defaults(&mut self, len: usize, prefix: &str) {
        self.names.retain(|i, _| *i < len);
        for i in 0..len {
            self.names
                .entry(i)
                .or_insert_with(|| format!("{prefix}[{i}]"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_are_indexed() {
        let map = NameMap::with_defaults(3, "Input");
        assert_eq!(map.names(), vec!["Input[0]", "Input[1]", "Input[2]"]);
    }

    #[test]
    fn fill_keeps_explicit_labels() {
        let mut map = NameMap::from_names(["pressure", "flow", "level"]);
        map.fill_defaults(5, "Input");
        assert_eq!(map.get(1), Some("flow"));
        assert_eq!(map.get(4), Some("Input[4]"));

        map.fill_defaults(2, "Input");
        assert_eq!(map.names(), vec!["pressure", "flow"]);
    }

    #[test]
    fn remove_by_name() {
        let mut map = NameMap::from_names(["a", "b", "a"]);
        assert!(map.remove_name("a"));
        assert_eq!(map.names(), vec!["b"]);
        assert_eq!(map.index_of("b"), Some(1));
        assert!(!map.remove_name("zzz"));
    }

    #[test]
    fn remove_and_shift_closes_gap() {
        let mut map = NameMap::from_names(["a", "b", "c"]);
        assert_eq!(map.remove_and_shift(1), Some("b".to_string()));
        assert_eq!(map.get(0), Some("a"));
        assert_eq!(map.get(1), Some("c"));
        assert_eq!(map.len(), 2);
    }

    proptest! {
        #[test]
        fn fill_defaults_yields_exact_len(explicit in prop::collection::vec("[a-z]{1,6}", 0..8), len in 0usize..12) {
            let mut map = NameMap::from_names(explicit.clone());
            map.fill_defaults(len, "Obs");
            prop_assert_eq!(map.len(), len);
            for (i, name) in explicit.iter().enumerate().take(len) {
                prop_assert_eq!(map.get(i), Some(name.as_str()));
            }
        }
    }
}
