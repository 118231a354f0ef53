//! # Blacklist
//!
//! Process-wide, mutex-guarded set of banned peer identities. No
//! persistence: a restarted node starts with a clean blacklist and lets
//! reputation re-accumulate evidence rather than carrying bans across runs.

use super::peer::{Peer, PeerKey, BROADCAST_IPV4, UNSPECIFIED_IPV4};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Severity of a ban. Strict entries are never bypassed; relaxed entries can
/// be ignored by a caller that explicitly tolerates them (e.g. during initial
/// peer-list bootstrap from a config file).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BanLevel {
    Strict,
    Relaxed,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<PeerKey, BanLevel>,
    exclusion_ranges: Vec<(u128, u128)>,
}

/// Shared handle to the process-wide blacklist. Cheap to clone (`Arc` inside).
#[derive(Clone, Default)]
pub struct Blacklist {
    inner: Arc<Mutex<Inner>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bans `peer` at the given level. Overwrites any existing entry.
    pub fn add(&self, peer: &Peer, level: BanLevel) {
        let key = peer.key();
        self.inner.lock().entries.insert(key, level);
        tracing::warn!(peer = %peer, level = ?level, "blacklisted peer");
    }

    /// Removes any ban on `peer`. No-op if it wasn't banned.
    pub fn remove(&self, peer: &Peer) {
        let key = peer.key();
        if self.inner.lock().entries.remove(&key).is_some() {
            tracing::info!(peer = %peer, "removed peer from blacklist");
        }
    }

    /// `honor_relaxed=true` matches any entry; `false` matches only strict ones.
    pub fn exists(&self, peer: &Peer, honor_relaxed: bool) -> bool {
        let key = peer.key();
        match self.inner.lock().entries.get(&key) {
            Some(BanLevel::Strict) => true,
            Some(BanLevel::Relaxed) => honor_relaxed,
            None => false,
        }
    }

    /// Adds an inclusive IP range that `is_valid_ip` must reject, keeping the
    /// range list sorted for fast lookup.
    pub fn exclude(&self, low: u128, high: u128) {
        let mut guard = self.inner.lock();
        guard.exclusion_ranges.push((low, high));
        guard.exclusion_ranges.sort_unstable();
    }

    /// False for `0.0.0.0`, `255.255.255.255`, and any address inside an
    /// excluded range.
    pub fn is_valid_ip(&self, ip: IpAddr) -> bool {
        if let IpAddr::V4(v4) = ip {
            if v4 == UNSPECIFIED_IPV4 || v4 == BROADCAST_IPV4 {
                return false;
            }
        }

        let value = super::peer::ip_to_u128(ip);
        let guard = self.inner.lock();
        !guard
            .exclusion_ranges
            .iter()
            .any(|(low, high)| value >= *low && value <= *high)
    }

    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        guard.entries.clear();
        guard.exclusion_ranges.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(n: u128) -> Peer {
        Peer::new(n, 9740)
    }

    #[test]
    fn strict_entry_matches_regardless_of_honor_relaxed() {
        let bl = Blacklist::new();
        bl.add(&peer(1), BanLevel::Strict);
        assert!(bl.exists(&peer(1), true));
        assert!(bl.exists(&peer(1), false));
    }

    #[test]
    fn relaxed_entry_only_matches_when_honored() {
        let bl = Blacklist::new();
        bl.add(&peer(1), BanLevel::Relaxed);
        assert!(bl.exists(&peer(1), true));
        assert!(!bl.exists(&peer(1), false));
    }

    #[test]
    fn upgrading_relaxed_to_strict_matches_both() {
        let bl = Blacklist::new();
        bl.add(&peer(1), BanLevel::Relaxed);
        bl.add(&peer(1), BanLevel::Strict);
        assert!(bl.exists(&peer(1), false));
    }

    #[test]
    fn remove_clears_entry() {
        let bl = Blacklist::new();
        bl.add(&peer(1), BanLevel::Strict);
        bl.remove(&peer(1));
        assert!(!bl.exists(&peer(1), true));
    }

    #[test]
    fn unspecified_and_broadcast_ips_are_invalid() {
        let bl = Blacklist::new();
        assert!(!bl.is_valid_ip("0.0.0.0".parse().unwrap()));
        assert!(!bl.is_valid_ip("255.255.255.255".parse().unwrap()));
        assert!(bl.is_valid_ip("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn excluded_range_rejected() {
        let bl = Blacklist::new();
        let low = super::super::peer::ip_to_u128("10.0.0.0".parse().unwrap());
        let high = super::super::peer::ip_to_u128("10.255.255.255".parse().unwrap());
        bl.exclude(low, high);

        assert!(!bl.is_valid_ip("10.1.2.3".parse().unwrap()));
        assert!(bl.is_valid_ip("11.1.2.3".parse().unwrap()));
    }

    #[test]
    fn clear_removes_everything() {
        let bl = Blacklist::new();
        bl.add(&peer(1), BanLevel::Strict);
        bl.exclude(0, 10);
        bl.clear();
        assert!(bl.is_empty());
        assert!(bl.is_valid_ip("0.0.0.5".parse().unwrap()));
    }
}
