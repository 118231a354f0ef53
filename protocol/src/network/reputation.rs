//! # ReputationManager
//!
//! Numeric per-IP reputation feeding the [`super::blacklist::Blacklist`].
//! `punish` decreases a peer's score, `award` increases it; crossing
//! `REP_THRESHOLD` in either direction mutates the blacklist.
//!
//! The original source computes the un-ban condition from
//! `GetReputation(ip) + delta` plus a `BAN_MULTIPLIER` adjustment whose sign
//! is ambiguous. This implementation resolves it as: a peer is un-banned only
//! once its score is *strictly greater than* `REP_THRESHOLD` (SPEC_FULL.md
//! §4.10 / §9).

use super::blacklist::{BanLevel, Blacklist};
use super::peer::Peer;
use crate::config::{REPUTATION_GOOD, REPUTATION_STEP, REP_THRESHOLD, UPPER_REP_THRESHOLD};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    scores: HashMap<u128, i32>,
}

/// Shared handle to the process-wide reputation table.
#[derive(Clone)]
pub struct ReputationManager {
    inner: Arc<Mutex<Inner>>,
    blacklist: Blacklist,
}

impl ReputationManager {
    pub fn new(blacklist: Blacklist) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            blacklist,
        }
    }

    pub fn get_reputation(&self, ip: u128) -> i32 {
        *self.inner.lock().scores.get(&ip).unwrap_or(&REPUTATION_GOOD)
    }

    /// Caps the stored score at `UPPER_REP_THRESHOLD`.
    pub fn set_reputation(&self, ip: u128, score: i32) {
        let capped = score.min(UPPER_REP_THRESHOLD);
        self.inner.lock().scores.insert(ip, capped);
    }

    pub fn is_node_banned(&self, ip: u128) -> bool {
        self.get_reputation(ip) <= REP_THRESHOLD
    }

    /// Decreases `ip`'s score; bans it once the score reaches `REP_THRESHOLD`.
    pub fn punish(&self, ip: u128) {
        let new_score = {
            let mut guard = self.inner.lock();
            let entry = guard.scores.entry(ip).or_insert(REPUTATION_GOOD);
            *entry -= REPUTATION_STEP;
            *entry
        };

        if new_score <= REP_THRESHOLD {
            self.blacklist.add(&Peer::new(ip, 0), BanLevel::Relaxed);
            tracing::warn!(ip = %super::peer::u128_to_ip(ip), score = new_score, "peer banned by reputation");
        }
    }

    /// Increases `ip`'s score (capped); un-bans it once strictly above
    /// `REP_THRESHOLD`.
    pub fn award(&self, ip: u128) {
        let new_score = {
            let mut guard = self.inner.lock();
            let entry = guard.scores.entry(ip).or_insert(REPUTATION_GOOD);
            *entry = (*entry + REPUTATION_STEP).min(UPPER_REP_THRESHOLD);
            *entry
        };

        if new_score > REP_THRESHOLD {
            self.blacklist.remove(&Peer::new(ip, 0));
        }
    }
}
