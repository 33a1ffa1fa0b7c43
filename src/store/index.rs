//! The ordered secondary index.
//!
//! A [`FieldIndex`] maintains (field value, primary key) entries sorted
//! first by value, then by primary key, so documents sharing a secondary
//! value stay individually addressable. The map from value to the ordered
//! set of primary keys gives the same total order as a flat composite-key
//! tree while keeping removal a direct lookup.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::btree_set::{self, BTreeSet};
use std::ops::Bound;

use crate::error::{Error, Result};

/// An ordered index over one document field.
#[derive(Debug, Default)]
pub struct FieldIndex {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl FieldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry. Inserting an identical (key, primary key) pair
    /// again is a no-op.
    ///
    /// Fails with `EmptyIndexKey` when `key` is the empty string; an empty
    /// key has no position in the order.
    pub fn insert(&mut self, key: &str, primary_key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyIndexKey);
        }
        self.entries
            .entry(key.to_string())
            .or_default()
            .insert(primary_key.to_string());
        Ok(())
    }

    /// Removes an entry, failing with `IndexEntryNotFound` when no such
    /// (key, primary key) pair exists.
    pub fn remove(&mut self, key: &str, primary_key: &str) -> Result<()> {
        let slot = self
            .entries
            .get_mut(key)
            .ok_or(Error::IndexEntryNotFound)?;
        if !slot.remove(primary_key) {
            return Err(Error::IndexEntryNotFound);
        }
        if slot.is_empty() {
            self.entries.remove(key);
        }
        Ok(())
    }

    /// Lazily yields primary keys whose index key lies in `[min, max]`
    /// (either bound may be open), following key order ascending or
    /// descending. Primary keys sharing a key are always yielded in
    /// ascending order, whatever the direction of the key dimension.
    pub fn scan(&self, min: Option<&str>, max: Option<&str>, descending: bool) -> RangeScan<'_> {
        // BTreeMap::range panics on an inverted range; an inverted request
        // simply matches nothing.
        let keys = match (min, max) {
            (Some(lo), Some(hi)) if lo > hi => None,
            _ => {
                let lower = min.map_or(Bound::Unbounded, Bound::Included);
                let upper = max.map_or(Bound::Unbounded, Bound::Included);
                Some(self.entries.range::<str, _>((lower, upper)))
            }
        };

        RangeScan {
            keys,
            current: None,
            descending,
        }
    }

    /// Total number of (key, primary key) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Iterator produced by [`FieldIndex::scan`].
pub struct RangeScan<'a> {
    keys: Option<btree_map::Range<'a, String, BTreeSet<String>>>,
    current: Option<btree_set::Iter<'a, String>>,
    descending: bool,
}

impl<'a> Iterator for RangeScan<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            if let Some(primary_keys) = &mut self.current {
                if let Some(primary_key) = primary_keys.next() {
                    return Some(primary_key);
                }
            }

            let keys = self.keys.as_mut()?;
            let slot = if self.descending {
                keys.next_back()
            } else {
                keys.next()
            };
            match slot {
                Some((_, primary_keys)) => self.current = Some(primary_keys.iter()),
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(scan: RangeScan<'_>) -> Vec<&str> {
        scan.collect()
    }

    fn sample_index() -> FieldIndex {
        let mut index = FieldIndex::new();
        index.insert("Alice", "3").unwrap();
        index.insert("Bob", "1").unwrap();
        index.insert("Charlie", "2").unwrap();
        index
    }

    #[test]
    fn test_insert_rejects_empty_key() {
        let mut index = FieldIndex::new();
        assert!(matches!(index.insert("", "1"), Err(Error::EmptyIndexKey)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut index = FieldIndex::new();
        index.insert("Bob", "1").unwrap();
        index.insert("Bob", "1").unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(collect(index.scan(None, None, false)), vec!["1"]);
    }

    #[test]
    fn test_remove_missing_entry() {
        let mut index = sample_index();
        assert!(matches!(
            index.remove("Bob", "99"),
            Err(Error::IndexEntryNotFound)
        ));
        assert!(matches!(
            index.remove("Zed", "1"),
            Err(Error::IndexEntryNotFound)
        ));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_remove_only_touches_the_pair() {
        let mut index = FieldIndex::new();
        index.insert("Bob", "1").unwrap();
        index.insert("Bob", "2").unwrap();

        index.remove("Bob", "1").unwrap();
        assert_eq!(collect(index.scan(None, None, false)), vec!["2"]);

        index.remove("Bob", "2").unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_full_ascending_and_descending_order() {
        let index = sample_index();
        assert_eq!(
            collect(index.scan(None, None, false)),
            vec!["3", "1", "2"],
            "value order: Alice, Bob, Charlie"
        );
        assert_eq!(collect(index.scan(None, None, true)), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let index = sample_index();
        assert_eq!(collect(index.scan(Some("Bob"), None, false)), vec!["1", "2"]);
        assert_eq!(collect(index.scan(None, Some("Bob"), false)), vec!["3", "1"]);
        assert_eq!(
            collect(index.scan(Some("Bob"), Some("Bob"), false)),
            vec!["1"]
        );
    }

    #[test]
    fn test_inverted_range_matches_nothing() {
        let index = sample_index();
        assert!(collect(index.scan(Some("Charlie"), Some("Alice"), false)).is_empty());
    }

    #[test]
    fn test_ties_keep_primary_keys_ascending() {
        let mut index = FieldIndex::new();
        index.insert("Bob", "9").unwrap();
        index.insert("Bob", "1").unwrap();
        index.insert("Alice", "5").unwrap();
        index.insert("Charlie", "7").unwrap();

        assert_eq!(
            collect(index.scan(None, None, false)),
            vec!["5", "1", "9", "7"]
        );
        // Descending flips key order only; ties stay ascending by primary key.
        assert_eq!(
            collect(index.scan(None, None, true)),
            vec!["7", "1", "9", "5"]
        );
    }

    #[test]
    fn test_scan_is_restartable() {
        let index = sample_index();
        let first: Vec<&str> = index.scan(None, None, false).collect();
        let second: Vec<&str> = index.scan(None, None, false).collect();
        assert_eq!(first, second);
    }
}
