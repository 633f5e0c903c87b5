//! Cycle-to-cycle channel set comparison.

use serde::Serialize;
use std::collections::BTreeSet;

/// Keys of `previous` that are absent from `current`, sorted ascending.
pub fn removed_keys<K: Ord + Clone>(previous: &BTreeSet<K>, current: &BTreeSet<K>) -> Vec<K> {
    previous.difference(current).cloned().collect()
}

/// Keys of `current` that are absent from `previous`, sorted ascending.
pub fn added_keys<K: Ord + Clone>(previous: &BTreeSet<K>, current: &BTreeSet<K>) -> Vec<K> {
    removed_keys(current, previous)
}

/// Channels that appeared or vanished between two polling cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelDiff {
    pub added: Vec<u32>,
    pub removed: Vec<u32>,
}

impl ChannelDiff {
    /// Compare the id set of the previous cycle with the current one.
    /// With no previous cycle every current id counts as added.
    pub fn between(previous: Option<&BTreeSet<u32>>, current: &BTreeSet<u32>) -> Self {
        match previous {
            Some(previous) => Self {
                added: added_keys(previous, current),
                removed: removed_keys(previous, current),
            },
            None => Self {
                added: current.iter().copied().collect(),
                removed: Vec::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
