//! # Guard
//!
//! Static, configuration-populated sets of DS/shard guard keys and excluded
//! IP ranges. Guard keys are never demoted by [`super::ds_composition`]; the
//! IP predicate here backstops [`super::blacklist::Blacklist::is_valid_ip`].

use crate::crypto::keys::NovaPublicKey;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    ds_guard_keys: BTreeSet<NovaPublicKey>,
    shard_guard_keys: BTreeSet<NovaPublicKey>,
    /// Sorted, non-overlapping inclusive ranges.
    ip_exclusion_ranges: Vec<(u128, u128)>,
}

/// Shared handle to the process-wide guard configuration.
#[derive(Clone, Default)]
pub struct Guard {
    inner: Arc<RwLock<Inner>>,
}

impl Guard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_ds_guard_list(&self, keys: impl IntoIterator<Item = NovaPublicKey>) {
        self.inner.write().ds_guard_keys = keys.into_iter().collect();
    }

    pub fn update_shard_guard_list(&self, keys: impl IntoIterator<Item = NovaPublicKey>) {
        self.inner.write().shard_guard_keys = keys.into_iter().collect();
    }

    pub fn add_to_ds_guard_list(&self, key: NovaPublicKey) {
        self.inner.write().ds_guard_keys.insert(key);
    }

    pub fn add_to_shard_guard_list(&self, key: NovaPublicKey) {
        self.inner.write().shard_guard_keys.insert(key);
    }

    pub fn is_node_in_ds_guard_list(&self, key: &NovaPublicKey) -> bool {
        self.inner.read().ds_guard_keys.contains(key)
    }

    pub fn is_node_in_shard_guard_list(&self, key: &NovaPublicKey) -> bool {
        self.inner.read().shard_guard_keys.contains(key)
    }

    pub fn num_of_ds_guard(&self) -> usize {
        self.inner.read().ds_guard_keys.len()
    }

    pub fn num_of_shard_guard(&self) -> usize {
        self.inner.read().shard_guard_keys.len()
    }

    /// Inserts an inclusive `[low, high]` range, merging it with any
    /// overlapping or adjacent ranges already present so lookup stays O(log n)
    /// over a small, coalesced set.
    pub fn add_to_exclusion_list(&self, low: u128, high: u128) {
        let mut guard = self.inner.write();
        guard.ip_exclusion_ranges.push((low, high));
        guard.ip_exclusion_ranges.sort_unstable();

        let mut merged: Vec<(u128, u128)> = Vec::with_capacity(guard.ip_exclusion_ranges.len());
        for (lo, hi) in guard.ip_exclusion_ranges.drain(..) {
            match merged.last_mut() {
                Some((_, last_hi)) if lo <= last_hi.saturating_add(1) => {
                    *last_hi = (*last_hi).max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        guard.ip_exclusion_ranges = merged;
    }

    pub fn is_valid_ip(&self, ip: u128) -> bool {
        let guard = self.inner.read();
        let idx = guard.ip_exclusion_ranges.partition_point(|(_, hi)| *hi < ip);
        match guard.ip_exclusion_ranges.get(idx) {
            Some((lo, hi)) => !(ip >= *lo && ip <= *hi),
            None => true,
        }
    }
}
