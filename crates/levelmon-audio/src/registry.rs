use std::collections::{BTreeMap, HashMap};

use crate::level::LevelCell;

/// Read-only query surface over the monitors built at startup. The key set
/// never changes afterwards; there is no hot-plug.
#[derive(Debug, Clone, Default)]
pub struct LevelRegistry {
    cells: HashMap<String, LevelCell>,
}

impl LevelRegistry {
    pub fn new(cells: HashMap<String, LevelCell>) -> Self {
        Self { cells }
    }

    /// Latest published level for `key`, or 0.0 for unknown keys.
    pub fn level(&self, key: &str) -> f64 {
        self.cells.get(key).map(LevelCell::level).unwrap_or(0.0)
    }

    /// Snapshot of every registered key's current level.
    pub fn levels(&self) -> BTreeMap<String, f64> {
        self.cells
            .iter()
            .map(|(key, cell)| (key.clone(), cell.level()))
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_read_as_zero() {
        let registry = LevelRegistry::default();
        assert_eq!(registry.level("studio1"), 0.0);
        assert!(registry.is_empty());
    }

    #[test]
    fn levels_reflect_the_latest_publication() {
        let cell = LevelCell::new();
        let mut cells = HashMap::new();
        cells.insert("studio1".to_string(), cell.clone());
        cells.insert("studio2".to_string(), LevelCell::new());
        let registry = LevelRegistry::new(cells);

        cell.publish(0.5);
        assert_eq!(registry.level("studio1"), 0.5);
        assert_eq!(registry.level("studio2"), 0.0);

        let all = registry.levels();
        assert_eq!(all.len(), 2);
        assert_eq!(all["studio1"], 0.5);
    }
}
