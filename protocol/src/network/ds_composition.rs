//! # DSComposition
//!
//! Deterministic directory-service committee rotation, run once per
//! finalised DS block. Demotes losers to the back of the committee, inserts
//! winners at the front (or at the guard boundary in guard mode), then ages
//! out the tail so the committee size never changes.

use super::blacklist::Blacklist;
use super::guard::Guard;
use super::peer::Peer;
use crate::config::STORE_DS_COMMITTEE_INTERVAL;
use crate::crypto::keys::NovaPublicKey;
use std::collections::{BTreeMap, VecDeque};

/// One seat in the DS committee.
pub type CommitteeMember = (NovaPublicKey, Peer);

/// Inputs to a single rotation, mirroring the fields of a finalised DS block
/// that the rotation algorithm consumes.
pub struct RotationInput {
    pub block_num: u64,
    pub pow_winners: BTreeMap<NovaPublicKey, Peer>,
    pub remove_pub_keys: Vec<NovaPublicKey>,
}

/// Bookkeeping the rotation writes to when running as a lookup node, mirrors
/// `MinerInfo` in the original source.
#[derive(Default, Debug, Clone)]
pub struct MinerInfo {
    pub ds_nodes_ejected: Vec<NovaPublicKey>,
    pub ds_nodes: Vec<CommitteeMember>,
}

/// Whether guard-mode insertion applies (guards occupy the front of the
/// committee and never shift).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardMode {
    Enabled,
    Disabled,
}

/// Whether this node is a lookup (and therefore maintains `MinerInfo`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRole {
    Lookup,
    NonLookup,
}

/// Rotates `ds_comm` in place according to `input`. Preserves `ds_comm.len()`.
///
/// `self_pub_key` is the identity of this node — when it appears among the
/// winners, its network address is zeroed to avoid self-connect attempts.
pub fn update_ds_committee_composition(
    self_pub_key: &NovaPublicKey,
    ds_comm: &mut VecDeque<CommitteeMember>,
    input: RotationInput,
    guard: &Guard,
    guard_mode: GuardMode,
    blacklist: &Blacklist,
    role: NodeRole,
    miner_info: &mut MinerInfo,
) {
    let original_len = ds_comm.len();

    // Bookkeeping reflects only the current rotation, not the cumulative
    // history across every DS epoch this node has lived through.
    if role == NodeRole::Lookup {
        miner_info.ds_nodes_ejected.clear();
        miner_info.ds_nodes.clear();
    }

    // 1. Demote losers: shuffle each removed key to the back.
    for removed_key in &input.remove_pub_keys {
        if let Some(pos) = ds_comm.iter().position(|(k, _)| k == removed_key) {
            let member = ds_comm.remove(pos).expect("position was just found");
            blacklist.remove(&member.1);
            ds_comm.push_back(member);
        } else {
            tracing::warn!(key = %removed_key, "removed pubkey not found in ds committee");
        }
    }

    // 2. Insert winners, sorted-key order (BTreeMap already guarantees this).
    let num_winners = input.pow_winners.len();
    let insert_at = match guard_mode {
        GuardMode::Enabled => guard.num_of_ds_guard(),
        GuardMode::Disabled => 0,
    };

    for (winner_key, winner_peer) in input.pow_winners.into_iter() {
        let peer = if &winner_key == self_pub_key {
            Peer::default()
        } else {
            winner_peer
        };
        ds_comm.insert(insert_at, (winner_key, peer));
    }

    // 3. Age out the tail, logging before each pop (not after — SPEC_FULL.md
    // §9 calls out logging post-mutation state as a defect).
    for _ in 0..num_winners {
        if let Some(popped) = ds_comm.back() {
            tracing::info!(key = %popped.0, "ejecting ds committee member");
            if role == NodeRole::Lookup {
                miner_info.ds_nodes_ejected.push(popped.0.clone());
            }
            blacklist.remove(&popped.1);
        }
        ds_comm.pop_back();
    }

    debug_assert_eq!(
        ds_comm.len(),
        original_len,
        "ds committee size must be invariant across rotation"
    );

    // 4. Periodic committee snapshot, excluding guards.
    if role == NodeRole::Lookup && input.block_num % STORE_DS_COMMITTEE_INTERVAL == 0 {
        miner_info.ds_nodes = ds_comm
            .iter()
            .filter(|(k, _)| !guard.is_node_in_ds_guard_list(k))
            .cloned()
            .collect();
    }
}
