//! Specificity-ordered predicate store.
//!
//! Keeps predicates of one dimension sorted from most to least specific and
//! attaches data to each. Inserting a predicate that is ambiguous against one
//! already present fails with a [`RangeConflict`] instead of picking a side.

use std::collections::BTreeMap;
use std::fmt;

use crate::predicate::RangePredicate;

/// Two or more predicates over the same dimension with ambiguous ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeConflict {
    /// The predicate whose insertion failed.
    pub predicate: String,
    /// Already-present predicates it conflicts with.
    pub existing: Vec<String>,
}

impl fmt::Display for RangeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is ambiguous with existing range(s) {}",
            self.predicate,
            self.existing
                .iter()
                .map(|p| format!("'{}'", p))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for RangeConflict {}

/// Data that can absorb a later value for the same predicate.
pub trait Update {
    fn update(&mut self, other: Self);
}

impl Update for () {
    fn update(&mut self, _other: Self) {}
}

impl<K: Ord, V> Update for BTreeMap<K, V> {
    fn update(&mut self, other: Self) {
        self.extend(other);
    }
}

/// Predicates sorted most-specific-first, each with attached data.
#[derive(Debug, Clone)]
pub struct OrderedPredicates<P, D = ()> {
    entries: Vec<(P, D)>,
}

impl<P, D> Default for OrderedPredicates<P, D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<P: RangePredicate, D: Update> OrderedPredicates<P, D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `predicate` with `data`.
    ///
    /// An equal predicate keeps its position; its data is merged with `data`
    /// when `update` is set and replaced otherwise. A new predicate goes
    /// before the first existing one it is stricter than.
    pub fn add(&mut self, predicate: P, data: D, update: bool) -> Result<(), RangeConflict> {
        if let Some(pos) = self.position(&predicate) {
            let slot = &mut self.entries[pos].1;
            if update {
                slot.update(data);
            } else {
                *slot = data;
            }
            return Ok(());
        }

        let mut insert_at = None;
        let mut conflicts = Vec::new();
        for (idx, (existing, _)) in self.entries.iter().enumerate() {
            match predicate.range().is_stricter_than(existing.range()) {
                None => conflicts.push(existing.to_string()),
                Some(true) if insert_at.is_none() => insert_at = Some(idx),
                Some(_) => {}
            }
        }

        if !conflicts.is_empty() {
            return Err(RangeConflict {
                predicate: predicate.to_string(),
                existing: conflicts,
            });
        }

        match insert_at {
            Some(idx) => self.entries.insert(idx, (predicate, data)),
            None => self.entries.push((predicate, data)),
        }
        Ok(())
    }

    /// Fold every entry of `other` into this store, merging data.
    pub fn absorb(&mut self, other: &Self) -> Result<(), RangeConflict>
    where
        D: Clone,
    {
        for (predicate, data) in other.iter_least_specific() {
            self.add(predicate.clone(), data.clone(), true)?;
        }
        Ok(())
    }
}

impl<P: PartialEq, D> OrderedPredicates<P, D> {
    fn position(&self, predicate: &P) -> Option<usize> {
        self.entries.iter().position(|(p, _)| p == predicate)
    }

    pub fn get_data(&self, predicate: &P) -> Option<&D> {
        self.position(predicate).map(|pos| &self.entries[pos].1)
    }

    /// Predicates from most to least specific.
    pub fn predicates(&self) -> impl Iterator<Item = &P> {
        self.entries.iter().map(|(p, _)| p)
    }

    /// Entries from most to least specific.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&P, &D)> {
        self.entries.iter().map(|(p, d)| (p, d))
    }

    /// Entries from least to most specific, the order in which data is applied.
    pub fn iter_least_specific(&self) -> impl Iterator<Item = (&P, &D)> {
        self.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: fmt::Display, D> fmt::Display for OrderedPredicates<P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.entries.iter().map(|(p, _)| p.to_string()).collect();
        write!(f, "[{}]", rendered.join(", "))
    }
}
