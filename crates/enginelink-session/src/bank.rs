//! Section/key store step handlers use to remember things across matches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A typed bank value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BankValue {
    String(String),
    Fixed(f64),
    Int(i64),
    Bool(bool),
}

/// Errors from persisting a bank.
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("bank persist failed: {0}")]
    Persist(String),
}

/// Named sections of named, typed values.
pub trait Bank: Send {
    fn get(&self, section: &str, key: &str) -> Option<BankValue>;

    /// Stores `value`, creating the section if needed.
    fn set(&mut self, section: &str, key: &str, value: BankValue);

    /// Writes the current contents to the bank's backing store.
    fn persist(&mut self) -> Result<(), BankError>;
}

type Sections = BTreeMap<String, BTreeMap<String, BankValue>>;

/// A bank kept in memory. `persist` snapshots the current contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    sections: Sections,
    persisted: Sections,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section_exists(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn key_exists(&self, section: &str, key: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|keys| keys.contains_key(key))
    }

    pub fn sections_count(&self) -> usize {
        self.sections.len()
    }

    pub fn keys_count(&self, section: &str) -> usize {
        self.sections.get(section).map_or(0, BTreeMap::len)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Keys and values of `section`, in key order.
    pub fn entries(
        &self,
        section: &str,
    ) -> impl Iterator<Item = (&str, &BankValue)> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|keys| keys.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Creates an empty section if it does not exist.
    pub fn create_section(&mut self, section: &str) {
        self.sections.entry(section.to_string()).or_default();
    }

    pub fn remove_section(&mut self, section: &str) -> bool {
        self.sections.remove(section).is_some()
    }

    pub fn remove_key(&mut self, section: &str, key: &str) -> Option<BankValue> {
        self.sections.get_mut(section)?.remove(key)
    }

    /// Whether the contents changed since the last `persist`.
    pub fn is_dirty(&self) -> bool {
        self.sections != self.persisted
    }
}

impl Bank for MemoryBank {
    fn get(&self, section: &str, key: &str) -> Option<BankValue> {
        self.sections.get(section)?.get(key).cloned()
    }

    fn set(&mut self, section: &str, key: &str, value: BankValue) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn persist(&mut self) -> Result<(), BankError> {
        self.persisted = self.sections.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut bank = MemoryBank::new();
        bank.set("score", "wins", BankValue::Int(3));
        bank.set("score", "ratio", BankValue::Fixed(0.75));
        bank.set("player", "name", BankValue::String("Director".into()));

        assert_eq!(bank.get("score", "wins"), Some(BankValue::Int(3)));
        assert_eq!(bank.get("score", "missing"), None);
        assert_eq!(bank.get("missing", "wins"), None);
        assert_eq!(bank.keys_count("score"), 2);
        assert_eq!(bank.sections_count(), 2);
    }

    #[test]
    fn test_overwrite_keeps_one_key() {
        let mut bank = MemoryBank::new();
        bank.set("flags", "seen", BankValue::Bool(false));
        bank.set("flags", "seen", BankValue::Bool(true));
        assert_eq!(bank.keys_count("flags"), 1);
        assert_eq!(bank.get("flags", "seen"), Some(BankValue::Bool(true)));
    }

    #[test]
    fn test_remove_key_and_section() {
        let mut bank = MemoryBank::new();
        bank.set("a", "x", BankValue::Int(1));
        bank.set("a", "y", BankValue::Int(2));

        assert_eq!(bank.remove_key("a", "x"), Some(BankValue::Int(1)));
        assert!(!bank.key_exists("a", "x"));
        assert!(bank.key_exists("a", "y"));
        let entries: Vec<_> = bank.entries("a").collect();
        assert_eq!(entries, vec![("y", &BankValue::Int(2))]);

        assert!(bank.remove_section("a"));
        assert!(!bank.section_exists("a"));
        assert!(!bank.remove_section("a"));
    }

    #[test]
    fn test_persist_clears_dirty() {
        let mut bank = MemoryBank::new();
        bank.create_section("empty");
        assert!(bank.is_dirty());
        bank.persist().unwrap();
        assert!(!bank.is_dirty());
        assert_eq!(bank.section_names().collect::<Vec<_>>(), vec!["empty"]);
    }

    #[test]
    fn test_value_serializes_with_type_tag() {
        let json = serde_json::to_string(&BankValue::Int(5)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":5}"#);
    }
}
