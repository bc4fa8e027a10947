use std::collections::BTreeMap;

/// Value of a flag nobody has touched yet: "unvisited / neutral".
pub const NEUTRAL: i32 = 1;

/// Per-scene quest and relationship flags.
///
/// Only flags declared when the scene is built can be written; the meaning
/// of each value is specific to the flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionStore {
    flags: BTreeMap<String, i32>,
}

impl ConditionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, initial: i32) {
        self.flags.insert(name.into(), initial);
    }

    pub fn get(&self, name: &str) -> i32 {
        self.flags.get(name).copied().unwrap_or(NEUTRAL)
    }

    /// Writes to undeclared flags are ignored; returns whether the write
    /// landed.
    pub fn set(&mut self, name: &str, value: i32) -> bool {
        match self.flags.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.flags.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<S: Into<String>> FromIterator<(S, i32)> for ConditionStore {
    fn from_iter<T: IntoIterator<Item = (S, i32)>>(iter: T) -> Self {
        let mut store = Self::new();
        for (name, initial) in iter {
            store.declare(name, initial);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_flag_reads_neutral() {
        let store = ConditionStore::new();
        assert_eq!(store.get("bookshelf"), NEUTRAL);
    }

    #[test]
    fn test_set_ignores_undeclared_flag() {
        let mut store: ConditionStore = [("bed", 1)].into_iter().collect();
        assert!(!store.set("tv", 3));
        assert!(!store.contains("tv"));
        assert_eq!(store.get("tv"), NEUTRAL);
    }

    #[test]
    fn test_set_declared_flag() {
        let mut store: ConditionStore = [("bed", 1), ("mirror", 1)].into_iter().collect();
        assert!(store.set("mirror", 2));
        assert_eq!(store.get("mirror"), 2);
        assert_eq!(store.get("bed"), 1);
    }
}
