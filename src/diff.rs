//! Diff engine for comparing ordered snapshots of named entities.
//!
//! This module computes the difference between two consistently ordered
//! snapshots (typically desired vs. observed broker addresses) as the
//! added, removed and modified sets the reconciler must act on.

use std::cmp::Ordering;

/// Difference between two ordered snapshots.
///
/// Entries in `added` and `modified` follow the ordering of the new
/// snapshot; entries in `removed` follow the ordering of the old one.
#[derive(Debug, Clone)]
pub struct ChangeSet<T> {
    /// Entities present only in the new snapshot.
    pub added: Vec<T>,
    /// Entities present only in the old snapshot.
    pub removed: Vec<T>,
    /// Entities present in both, with differing fields; carries the new
    /// field values.
    pub modified: Vec<T>,
}

impl<T> ChangeSet<T> {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Returns the total number of changes.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

impl<T> std::fmt::Display for ChangeSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} modified",
            self.added.len(),
            self.removed.len(),
            self.modified.len()
        )
    }
}

/// Computes the changes between two ordered snapshots.
///
/// `compare` is a three-way comparator over each element's key and
/// `equal` a symmetric full-field equality predicate. Elements whose keys
/// compare equal are the same logical resource; unequal fields make the
/// new element `modified`. Returns `None` when the snapshots are
/// identical, letting callers short-circuit a sync cycle.
///
/// Both inputs MUST be pre-sorted consistently with `compare`; unsorted
/// input yields meaningless results. The merge is O(n+m) and does not
/// validate the ordering.
pub fn changes<T, C, E>(old: &[T], new: &[T], compare: C, equal: E) -> Option<ChangeSet<T>>
where
    T: Clone,
    C: Fn(&T, &T) -> Ordering,
    E: Fn(&T, &T) -> bool,
{
    let mut result = ChangeSet {
        added: Vec::new(),
        removed: Vec::new(),
        modified: Vec::new(),
    };

    let mut i = 0;
    let mut j = 0;
    while i < old.len() && j < new.len() {
        match compare(&old[i], &new[j]) {
            Ordering::Less => {
                result.removed.push(old[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                result.added.push(new[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                if !equal(&old[i], &new[j]) {
                    result.modified.push(new[j].clone());
                }
                i += 1;
                j += 1;
            }
        }
    }

    result.removed.extend(old[i..].iter().cloned());
    result.added.extend(new[j..].iter().cloned());

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}
