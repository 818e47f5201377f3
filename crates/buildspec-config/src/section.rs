//! Generic section tree.
//!
//! The untyped shape of a recipe: an ordered mapping of keys to either a
//! nested section or a scalar value. Section headers are kept as raw strings
//! here; [`crate::builder`] decides what they mean.

use serde_json::Value;

/// One entry of a [`Section`].
#[derive(Debug, Clone, PartialEq)]
pub enum SectionEntry {
    Section(Section),
    Value(Value),
}

/// Insertion-ordered mapping of key to entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    entries: Vec<(String, SectionEntry)>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a scalar entry.
    pub fn insert_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.insert(key.into(), SectionEntry::Value(value.into()));
    }

    /// Insert or replace a nested section.
    pub fn insert_section(&mut self, key: impl Into<String>, section: Section) {
        self.insert(key.into(), SectionEntry::Section(section));
    }

    fn insert(&mut self, key: String, entry: SectionEntry) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((key, entry)),
        }
    }

    /// Builder-style [`insert_value`](Self::insert_value).
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_value(key, value);
        self
    }

    /// Builder-style [`insert_section`](Self::insert_section).
    pub fn with_section(mut self, key: impl Into<String>, section: Section) -> Self {
        self.insert_section(key, section);
        self
    }

    pub fn get(&self, key: &str) -> Option<&SectionEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let section = Section::new()
            .with_value("b", 1)
            .with_section("> 2.0", Section::new())
            .with_value("a", "x");
        let keys: Vec<&str> = section.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "> 2.0", "a"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let section = Section::new()
            .with_value("a", 1)
            .with_value("b", 2)
            .with_value("a", 3);
        assert_eq!(section.len(), 2);
        assert_eq!(section.iter().next().unwrap().0, "a");
        assert_eq!(section.get("a"), Some(&SectionEntry::Value(Value::from(3))));
    }
}
