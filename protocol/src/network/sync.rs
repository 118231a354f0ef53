//! # Block Synchronization Engine
//!
//! When a node boots up for the first time — or wakes up after a long nap —
//! it needs to catch up to the chain tip. This module implements the block sync
//! protocol: the request/response types peers use to exchange chain state, and
//! the `SyncEngine` that orchestrates downloading, validating, and replaying
//! blocks from peers.
//!
//! ## Protocol Overview
//!
//! ```text
//! New Node                           Peer
//! ─────────                         ──────
//!   │  GetChainTip                    │
//!   │──────────────────────────────>  │
//!   │  ChainTip { height, hash }     │
//!   │<──────────────────────────────  │
//!   │                                 │
//!   │  GetBlocks { start, end }       │
//!   │──────────────────────────────>  │
//!   │  Blocks(Vec<Block>)             │
//!   │<──────────────────────────────  │
//!   │  ... (repeat in batches) ...    │
//! ```
//!
//! ## Design Decisions
//!
//! - **Batch downloads.** Requesting blocks one at a time over the network is
//!   painfully slow. We split the gap into configurable batches (default: 100
//!   blocks per request) and can issue up to `max_parallel_requests` concurrent
//!   fetches. The tradeoff is memory — each batch is held in RAM until applied.
//!
//! - **Validate-then-apply.** Every downloaded block is verified (hash integrity,
//!   Merkle root, parent chain linkage) before touching the state tree. A single
//!   invalid block in a batch rejects the entire batch. No partial state corruption.
//!
//! - **Replay execution.** Blocks are not just stored — their transactions are
//!   re-executed against the state tree. This means the syncing node independently
//!   derives the same state root as the rest of the network. Trust is minimized;
//!   the peer only provides blocks, not state.
//!
//! - **Stateless engine.** The `SyncEngine` does not manage network connections.
//!   It provides `process_sync_request` for handling incoming requests and
//!   `apply_blocks` for processing downloaded batches. Transport is the caller's
//!   problem — this keeps the engine testable without a live socket.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::storage::block::Block;
use crate::storage::db::{DbError, NovaDB};
use crate::storage::state::{apply_transfer, StateError, StateTree};
use crate::transaction::types::TransactionType;

// ---------------------------------------------------------------------------
// Sync Request / Response
// ---------------------------------------------------------------------------

/// Messages a syncing node sends to peers.
///
/// These are intentionally simple — the sync protocol is a request-response
/// pattern, not a streaming protocol. Each request gets exactly one response.
/// Complexity lives in the engine, not the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncRequest {
    /// "What's your chain tip?" Lightweight probe to determine whether we
    /// need to sync at all, and how far behind we are.
    GetChainTip,

    /// "Give me blocks in range [start, end)." The primary data transfer
    /// mechanism. `end` is exclusive, matching Rust range conventions.
    GetBlocks { start: u64, end: u64 },

    /// "Give me block at this height." For surgical single-block fetches
    /// (e.g., re-downloading a block that failed validation).
    GetBlock { height: u64 },
}

/// Messages a peer sends back in response to a sync request.
///
/// Errors are encoded in-band as `SyncResponse::Error` rather than at the
/// transport level. This keeps the protocol self-describing and makes it
/// trivial to add new error variants without changing the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncResponse {
    /// The peer's current chain tip: height and block hash.
    ChainTip { height: u64, block_hash: [u8; 32] },

    /// A batch of blocks in ascending height order.
    Blocks(Vec<Block>),

    /// A single block, or None if the peer doesn't have it.
    Block(Option<Block>),

    /// Something went wrong on the peer's side. The string is a
    /// human-readable description for logging, not structured data.
    Error(String),
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for the sync engine.
///
/// Sensible defaults are provided via `Default`. Override individual fields
/// when you know your deployment characteristics (fast local network? bump
/// batch size. Flaky peers? increase retries).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of blocks to request in a single `GetBlocks` call.
    /// Larger batches amortize round-trip latency but use more memory.
    pub batch_size: u64,

    /// Maximum number of concurrent `GetBlocks` requests in flight.
    /// More parallelism = faster sync, but also more memory pressure
    /// and more burden on the serving peer.
    pub max_parallel_requests: usize,

    /// Per-request timeout in milliseconds. If a peer doesn't respond
    /// within this window, the request is considered failed and eligible
    /// for retry.
    pub request_timeout_ms: u64,

    /// How many times to retry a failed request before giving up.
    /// Retries use the same peer — peer rotation is the caller's job.
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_parallel_requests: 4,
            request_timeout_ms: 10_000,
            max_retries: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// SyncResult
// ---------------------------------------------------------------------------

/// Summary of a successful block application batch.
///
/// Returned by `apply_blocks` so the caller can log progress, update metrics,
/// or report sync status to the user without digging into engine internals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    /// Number of blocks successfully validated and persisted.
    pub blocks_applied: u64,

    /// Total number of transactions executed across all applied blocks.
    pub transactions_executed: u64,

    /// Chain height after the last applied block.
    pub final_height: u64,

    /// State root after replaying all transactions.
    pub final_state_root: [u8; 32],
}

// ---------------------------------------------------------------------------
// SyncError
// ---------------------------------------------------------------------------

/// Errors that can occur during block synchronization.
///
/// These are split into "the data is wrong" errors (InvalidBlock, ChainGap,
/// InvalidParentHash) and "the infrastructure broke" errors (StateError,
/// DbError, RequestTimeout, PeerDisconnected). The former indicate a
/// misbehaving peer; the latter are transient and worth retrying.
#[derive(Debug)]
pub enum SyncError {
    /// A block failed integrity verification (hash mismatch, bad Merkle root,
    /// or other structural issue).
    InvalidBlock { height: u64, reason: String },

    /// Expected block at height `expected`, but got `got`. Indicates a gap
    /// or overlap in the downloaded batch.
    ChainGap { expected: u64, got: u64 },

    /// A block's `parent_hash` doesn't match the previous block's hash.
    /// Either the peer is serving a fork or the data is corrupt.
    InvalidParentHash { height: u64 },

    /// A state transition failed during transaction replay.
    StateError(StateError),

    /// Persistence layer failure.
    DbError(DbError),

    /// The peer did not respond within the configured timeout window.
    RequestTimeout,

    /// The peer disconnected mid-sync. Pick a new peer and resume.
    PeerDisconnected,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBlock { height, reason } => {
                write!(f, "invalid block at height {}: {}", height, reason)
            }
            Self::ChainGap { expected, got } => {
                write!(f, "chain gap: expected height {}, got {}", expected, got)
            }
            Self::InvalidParentHash { height } => {
                write!(f, "invalid parent hash at height {}", height)
            }
            Self::StateError(e) => write!(f, "state error: {}", e),
            Self::DbError(e) => write!(f, "database error: {}", e),
            Self::RequestTimeout => write!(f, "request timed out"),
            Self::PeerDisconnected => write!(f, "peer disconnected"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<StateError> for SyncError {
    fn from(e: StateError) -> Self {
        Self::StateError(e)
    }
}

impl From<DbError> for SyncError {
    fn from(e: DbError) -> Self {
        Self::DbError(e)
    }
}

// ---------------------------------------------------------------------------
// SyncEngine
// ---------------------------------------------------------------------------

/// The block synchronization engine.
///
/// Handles both sides of the sync protocol: responding to incoming requests
/// from peers (via `process_sync_request`) and applying downloaded blocks
/// to the local chain (via `apply_blocks`). The engine is transport-agnostic —
/// it neither opens connections nor reads from the network. That's the
/// caller's responsibility.
///
/// ## Thread Safety
///
/// The engine holds `Arc` references to the database and state tree, and
/// the state tree is protected by a `RwLock`. Multiple threads can call
/// `process_sync_request` concurrently (read path). `apply_blocks` acquires
/// a write lock on the state tree and should be serialized by the caller.
pub struct SyncEngine {
    /// Persistent storage for blocks and chain metadata.
    db: Arc<NovaDB>,

    /// Sparse Merkle Tree holding all account states. Protected by RwLock
    /// because sync writes (transaction replay) must be exclusive, while
    /// reads (serving sync requests) can be concurrent.
    state_tree: Arc<RwLock<StateTree>>,

    /// Configuration knobs (batch size, timeouts, etc.).
    config: SyncConfig,
}

impl SyncEngine {
    /// Creates a new sync engine wired to the given storage layer.
    ///
    /// The engine starts idle — no sync activity happens until the caller
    /// invokes `apply_blocks` with downloaded data.
    pub fn new(
        db: Arc<NovaDB>,
        state_tree: Arc<RwLock<StateTree>>,
        config: SyncConfig,
    ) -> Self {
        Self {
            db,
            state_tree,
            config,
        }
    }

    /// Returns the local chain tip: current height and block hash.
    ///
    /// If the database is empty (no blocks persisted), returns height 0 and
    /// the genesis block hash. A fresh node always knows about genesis — it's
    /// hardcoded, not downloaded.
    pub fn local_chain_tip(&self) -> Result<(u64, [u8; 32]), SyncError> {
        match self.db.get_latest_block_height()? {
            Some(height) => {
                let block = self.db.get_block(height)?.ok_or_else(|| SyncError::DbError(
                    DbError::NotFound(format!("block at height {}", height)),
                ))?;
                Ok((height, block.header.hash))
            }
            None => {
                // Empty database — return genesis tip.
                let genesis = Block::genesis();
                Ok((0, genesis.header.hash))
            }
        }
    }

    /// Handles an incoming sync request from a peer.
    ///
    /// This is the "server side" of the sync protocol. A peer sends us a
    /// `SyncRequest`, we look up the answer in our local database, and return
    /// a `SyncResponse`. No state mutation happens here — it's pure reads.
    pub fn process_sync_request(&self, request: SyncRequest) -> SyncResponse {
        match request {
            SyncRequest::GetChainTip => {
                match self.local_chain_tip() {
                    Ok((height, hash)) => SyncResponse::ChainTip {
                        height,
                        block_hash: hash,
                    },
                    Err(e) => SyncResponse::Error(format!("failed to read chain tip: {}", e)),
                }
            }

            SyncRequest::GetBlocks { start, end } => {
                if start >= end {
                    return SyncResponse::Blocks(Vec::new());
                }
                // get_block_range is inclusive on both ends, but our protocol
                // uses [start, end), so we request [start, end - 1].
                match self.db.get_block_range(start, end - 1) {
                    Ok(blocks) => SyncResponse::Blocks(blocks),
                    Err(e) => SyncResponse::Error(format!(
                        "failed to read blocks [{}, {}): {}",
                        start, end, e,
                    )),
                }
            }

            SyncRequest::GetBlock { height } => {
                match self.db.get_block(height) {
                    Ok(block) => SyncResponse::Block(block),
                    Err(e) => SyncResponse::Error(format!(
                        "failed to read block at height {}: {}",
                        height, e,
                    )),
                }
            }
        }
    }

    /// Validates and applies a batch of blocks to the local chain.
    ///
    /// Each block goes through:
    /// 1. **Integrity check** — recompute hash, verify Merkle root.
    /// 2. **Chain linkage** — verify parent hash matches the previous block.
    /// 3. **Transaction replay** — execute every transaction against the state tree.
    /// 4. **Persistence** — write the block and updated metadata to NovaDB.
    ///
    /// If any block fails validation, the entire batch is rejected and the
    /// state tree / database are left in their pre-call state (for the
    /// remaining unprocessed blocks). Blocks that were already applied before
    /// the failure are committed — this is not a transactional rollback.
    ///
    /// The caller should pass blocks in ascending height order, starting from
    /// the block immediately after the local chain tip.
    pub fn apply_blocks(&self, blocks: Vec<Block>) -> Result<SyncResult, SyncError> {
        if blocks.is_empty() {
            let (height, _) = self.local_chain_tip()?;
            let state_root = self.state_tree.read().root();
            return Ok(SyncResult {
                blocks_applied: 0,
                transactions_executed: 0,
                final_height: height,
                final_state_root: state_root,
            });
        }

        let mut blocks_applied = 0u64;
        let mut transactions_executed = 0u64;

        // Determine what the parent hash should be for the first block in the batch.
        let first_height = blocks[0].header.height;
        let expected_parent_hash = if first_height == 0 {
            [0u8; 32] // Genesis block's parent is all zeros.
        } else {
            // Look up the block just before the batch start.
            let prev = self.db.get_block(first_height - 1)?.ok_or_else(|| {
                SyncError::ChainGap {
                    expected: first_height - 1,
                    got: first_height,
                }
            })?;
            prev.header.hash
        };

        let mut prev_hash = expected_parent_hash;
        let mut prev_height = if first_height == 0 { 0 } else { first_height - 1 };

        for (i, block) in blocks.iter().enumerate() {
            // Verify block integrity (hash + Merkle root).
            block.verify().map_err(|reason| SyncError::InvalidBlock {
                height: block.header.height,
                reason,
            })?;

            // Verify height continuity.
            let expected_height = if i == 0 { first_height } else { prev_height + 1 };
            if block.header.height != expected_height {
                return Err(SyncError::ChainGap {
                    expected: expected_height,
                    got: block.header.height,
                });
            }

            // Verify parent hash linkage.
            if i == 0 {
                // For genesis, parent must be all zeros.
                if block.header.height == 0 {
                    if block.header.parent_hash != [0u8; 32] {
                        return Err(SyncError::InvalidParentHash {
                            height: block.header.height,
                        });
                    }
                } else if block.header.parent_hash != prev_hash {
                    return Err(SyncError::InvalidParentHash {
                        height: block.header.height,
                    });
                }
            } else if block.header.parent_hash != prev_hash {
                return Err(SyncError::InvalidParentHash {
                    height: block.header.height,
                });
            }

            // Replay transactions against the state tree.
            {
                let mut tree = self.state_tree.write();
                for tx in &block.transactions {
                    match tx.tx_type {
                        TransactionType::Transfer => {
                            apply_transfer(&mut tree, &tx.sender, &tx.receiver, tx.amount.value)?;
                        }
                        // Non-transfer transaction types are accepted but don't
                        // mutate state yet. Same behavior as BlockProducer.
                        TransactionType::CreditRequest
                        | TransactionType::CreditSettlement
                        | TransactionType::TokenMint
                        | TransactionType::TokenBurn
                        | TransactionType::ConfidentialTransfer => {}
                    }
                    transactions_executed += 1;
                }
            }

            // Persist the block.
            self.db.put_block(block)?;

            blocks_applied += 1;
            prev_hash = block.header.hash;
            prev_height = block.header.height;
        }

        let state_root = self.state_tree.read().root();

        Ok(SyncResult {
            blocks_applied,
            transactions_executed,
            final_height: prev_height,
            final_state_root: state_root,
        })
    }

    /// Validates that a sequence of blocks forms a valid chain.
    ///
    /// Checks:
    /// 1. Each block passes integrity verification (hash + Merkle root).
    /// 2. Heights are contiguous starting from `expected_start`.
    /// 3. Each block's `parent_hash` matches the previous block's hash.
    ///
    /// This is a "dry run" validation — it does not touch the state tree or
    /// database. Useful for pre-validating a batch before committing resources
    /// to apply it.
    pub fn validate_block_chain(
        &self,
        blocks: &[Block],
        expected_start: u64,
    ) -> Result<(), SyncError> {
        for (i, block) in blocks.iter().enumerate() {
            // Integrity check.
            block.verify().map_err(|reason| SyncError::InvalidBlock {
                height: block.header.height,
                reason,
            })?;

            // Height continuity.
            let expected_height = expected_start + i as u64;
            if block.header.height != expected_height {
                return Err(SyncError::ChainGap {
                    expected: expected_height,
                    got: block.header.height,
                });
            }

            // Parent hash linkage (skip for the first block in the batch —
            // the caller is responsible for verifying it chains to the local tip).
            if i > 0 {
                let prev = &blocks[i - 1];
                if block.header.parent_hash != prev.header.hash {
                    return Err(SyncError::InvalidParentHash {
                        height: block.header.height,
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns `true` if we are behind the given remote height.
    ///
    /// A node "needs sync" when the remote chain has blocks we haven't seen.
    /// This is a cheap check — just compares two integers.
    pub fn needs_sync(&self, remote_height: u64) -> bool {
        let local_height = self
            .db
            .get_latest_block_height()
            .ok()
            .flatten()
            .unwrap_or(0);
        remote_height > local_height
    }

    /// Splits the gap between local and remote heights into download batches.
    ///
    /// Returns a list of `(start, end)` pairs where `start` is inclusive and
    /// `end` is exclusive, suitable for `GetBlocks` requests. The batch size
    /// is determined by `config.batch_size`.
    ///
    /// If `local_height >= remote_height`, returns an empty list (nothing to sync).
    pub fn compute_sync_plan(&self, local_height: u64, remote_height: u64) -> Vec<(u64, u64)> {
        if local_height >= remote_height {
            return Vec::new();
        }

        let start = local_height + 1;
        let end = remote_height + 1; // exclusive upper bound
        let batch = self.config.batch_size;

        let mut plan = Vec::new();
        let mut cursor = start;

        while cursor < end {
            let batch_end = std::cmp::min(cursor + batch, end);
            plan.push((cursor, batch_end));
            cursor = batch_end;
        }

        plan
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
