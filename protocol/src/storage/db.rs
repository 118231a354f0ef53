//! # NovaDB — Persistent Storage Engine
//!
//! The persistence layer for the NOVA blockchain, built on sled's
//! embedded key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees" (analogous to column families
//! in RocksDB or tables in SQL). Each tree is an independent B+ tree
//! with its own keyspace:
//!
//! | Tree           | Key                 | Value                    |
//! |----------------|---------------------|--------------------------|
//! | `blocks`       | `height` (8B BE)    | `bincode(Block)`         |
//! | `block_hashes` | `hash` (32B)        | `height` (8B BE)         |
//! | `transactions` | `tx_id` (hex bytes) | `bincode(Transaction)`   |
//! | `accounts`     | `address` (UTF-8)   | `bincode(AccountState)`  |
//! | `metadata`     | key (UTF-8)         | value (bytes)            |
//!
//! Block heights are stored as big-endian u64 so that sled's lexicographic
//! ordering matches numeric ordering — this makes range scans over blocks
//! work naturally.
//!
//! ## Atomicity
//!
//! When persisting a new block, we write the block, all its transactions,
//! and the updated height in a single atomic `Batch`. Either everything
//! lands on disk or nothing does — no partial writes, no corruption.

use sled::{Batch, Db, Tree};
use std::path::Path;

use super::block::Block;
use super::state::AccountState;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("key not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

/// Well-known key in the `metadata` tree for the latest block height.
const META_LATEST_HEIGHT: &[u8] = b"latest_block_height";

// ---------------------------------------------------------------------------
// NovaDB
// ---------------------------------------------------------------------------

/// Persistent storage engine for the NOVA blockchain.
///
/// Wraps a sled `Db` instance and exposes typed accessors for blocks,
/// transactions, accounts, and chain metadata. All serialization uses
/// bincode for compactness and speed.
///
/// # Thread Safety
///
/// sled is inherently thread-safe — all trees support lock-free concurrent
/// reads and serialized writes. `NovaDB` can be shared across threads
/// via `Arc<NovaDB>` without external synchronization.
#[derive(Debug, Clone)]
pub struct NovaDB {
    /// The underlying sled database handle.
    db: Db,
    /// Blocks indexed by height (big-endian u64 keys).
    blocks: Tree,
    /// Reverse index: block hash (32 bytes) -> height (8 bytes BE).
    block_hashes: Tree,
    /// Transactions indexed by hex-encoded tx ID.
    transactions: Tree,
    /// Account states indexed by NOVA address (UTF-8).
    accounts: Tree,
    /// Arbitrary key-value metadata (latest height, config, etc.).
    metadata: Tree,
}

impl NovaDB {
    /// Open or create a database at the given filesystem path.
    ///
    /// If the directory doesn't exist, sled creates it. If the database
    /// already exists, it's opened and all existing data is available
    /// immediately.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that lives in memory and is cleaned
    /// up automatically when the `NovaDB` is dropped.
    ///
    /// Ideal for unit tests — no filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    /// Internal constructor: opens named trees from an existing sled `Db`.
    fn from_db(db: Db) -> DbResult<Self> {
        let blocks = db.open_tree("blocks")?;
        let block_hashes = db.open_tree("block_hashes")?;
        let transactions = db.open_tree("transactions")?;
        let accounts = db.open_tree("accounts")?;
        let metadata = db.open_tree("metadata")?;

        Ok(Self {
            db,
            blocks,
            block_hashes,
            transactions,
            accounts,
            metadata,
        })
    }

    /// Open a named sled tree from the underlying database.
    ///
    /// Used by higher-level data structures (e.g., Sparse Merkle Tree) that
    /// need dedicated key-value storage within the same database instance.
    /// The tree is created if it doesn't exist.
    pub fn open_tree(&self, name: &str) -> DbResult<Tree> {
        Ok(self.db.open_tree(name)?)
    }

    // -- Block operations ---------------------------------------------------

    /// Persist a block and all its transactions atomically.
    ///
    /// This writes:
    /// 1. The full block into the `blocks` tree (keyed by height).
    /// 2. A hash-to-height entry into `block_hashes`.
    /// 3. Each transaction into the `transactions` tree (keyed by tx ID).
    /// 4. An updated `latest_block_height` in `metadata`.
    ///
    /// All writes are batched into a single atomic operation per tree.
    pub fn put_block(&self, block: &Block) -> DbResult<()> {
        let height_key = block.header.height.to_be_bytes();
        let block_bytes =
            bincode::serialize(block).map_err(|e| DbError::Serialization(e.to_string()))?;

        // Batch writes to the blocks tree.
        let mut block_batch = Batch::default();
        block_batch.insert(&height_key, block_bytes);
        self.blocks.apply_batch(block_batch)?;

        // Index block hash -> height.
        self.block_hashes.insert(&block.header.hash, &height_key)?;

        // Persist each transaction.
        let mut tx_batch = Batch::default();
        for tx in &block.transactions {
            let tx_bytes =
                bincode::serialize(tx).map_err(|e| DbError::Serialization(e.to_string()))?;
            tx_batch.insert(tx.id.as_bytes(), tx_bytes);
        }
        self.transactions.apply_batch(tx_batch)?;

        // Update latest height.
        self.metadata.insert(META_LATEST_HEIGHT, &height_key)?;

        // Flush to ensure durability.
        self.db.flush()?;

        Ok(())
    }

    /// Retrieve a block by its height.
    ///
    /// Returns `None` if no block exists at the given height.
    pub fn get_block(&self, height: u64) -> DbResult<Option<Block>> {
        let key = height.to_be_bytes();
        match self.blocks.get(key)? {
            Some(bytes) => {
                let block: Block = bincode::deserialize(&bytes)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    /// Retrieve a block by its hash.
    ///
    /// Performs a two-step lookup: hash -> height (from `block_hashes`),
    /// then height -> block (from `blocks`).
    pub fn get_block_by_hash(&self, hash: &[u8; 32]) -> DbResult<Option<Block>> {
        match self.block_hashes.get(hash)? {
            Some(height_bytes) => {
                let height = u64::from_be_bytes(
                    height_bytes
                        .as_ref()
                        .try_into()
                        .map_err(|_| DbError::Serialization("invalid height bytes".to_string()))?,
                );
                self.get_block(height)
            }
            None => Ok(None),
        }
    }

    /// Iterate over blocks in a height range (inclusive on both ends).
    ///
    /// Returns blocks in ascending height order. Stops at the first gap
    /// (missing height) within the range.
    pub fn get_block_range(&self, start: u64, end: u64) -> DbResult<Vec<Block>> {
        let start_key = start.to_be_bytes();
        let end_key = end.to_be_bytes();

        let mut blocks = Vec::new();
        for result in self.blocks.range(start_key..=end_key) {
            let (_key, value) = result?;
            let block: Block =
                bincode::deserialize(&value).map_err(|e| DbError::Serialization(e.to_string()))?;
            blocks.push(block);
        }

        Ok(blocks)
    }

    // -- Transaction operations ---------------------------------------------

    /// Persist a single transaction.
    ///
    /// Typically used for mempool staging. Block-included transactions
    /// are written atomically via `put_block`.
    pub fn put_transaction(&self, tx: &Transaction) -> DbResult<()> {
        let tx_bytes = bincode::serialize(tx).map_err(|e| DbError::Serialization(e.to_string()))?;
        self.transactions.insert(tx.id.as_bytes(), tx_bytes)?;
        Ok(())
    }

    /// Retrieve a transaction by its hex-encoded ID.
    pub fn get_transaction(&self, id: &str) -> DbResult<Option<Transaction>> {
        match self.transactions.get(id.as_bytes())? {
            Some(bytes) => {
                let tx: Transaction = bincode::deserialize(&bytes)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                Ok(Some(tx))
            }
            None => Ok(None),
        }
    }

    // -- Account operations -------------------------------------------------

    /// Persist an account state for the given address.
    pub fn put_account(&self, address: &str, state: &AccountState) -> DbResult<()> {
        let bytes = bincode::serialize(state).map_err(|e| DbError::Serialization(e.to_string()))?;
        self.accounts.insert(address.as_bytes(), bytes)?;
        Ok(())
    }

    /// Retrieve the account state for a given address.
    ///
    /// Returns `None` if the address has never been seen on-chain.
    pub fn get_account(&self, address: &str) -> DbResult<Option<AccountState>> {
        match self.accounts.get(address.as_bytes())? {
            Some(bytes) => {
                let state: AccountState = bincode::deserialize(&bytes)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    // -- Metadata operations ------------------------------------------------

    /// Get the latest persisted block height.
    ///
    /// Returns `None` if the database is empty (no blocks persisted yet).
    pub fn get_latest_block_height(&self) -> DbResult<Option<u64>> {
        match self.metadata.get(META_LATEST_HEIGHT)? {
            Some(bytes) => {
                let height = u64::from_be_bytes(
                    bytes
                        .as_ref()
                        .try_into()
                        .map_err(|_| DbError::Serialization("invalid height bytes".to_string()))?,
                );
                Ok(Some(height))
            }
            None => Ok(None),
        }
    }

    /// Explicitly set the latest block height in metadata.
    ///
    /// Normally this is updated automatically by `put_block`, but this
    /// method is available for bootstrapping and recovery scenarios.
    pub fn set_latest_block_height(&self, height: u64) -> DbResult<()> {
        self.metadata
            .insert(META_LATEST_HEIGHT, &height.to_be_bytes())?;
        Ok(())
    }

    // -- Utility operations -------------------------------------------------

    /// Return the number of blocks stored in the database.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Return the number of transactions stored in the database.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Return the number of accounts stored in the database.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Force a flush of all pending writes to disk.
    ///
    /// sled buffers writes in memory for performance. This call blocks
    /// until all data is durable on the underlying storage device.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
