//! Priority-ordered transaction pool.
//!
//! Thread-safe mempool for pending transactions awaiting block inclusion.

use crate::transaction::Transaction;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Configuration for a [`Mempool`].
#[derive(Debug, Clone, Copy)]
pub struct MempoolConfig {
    /// Maximum number of pending transactions held at once.
    pub max_size: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self { max_size: 10_000 }
    }
}

/// A thread-safe transaction mempool.
///
/// Transactions are keyed by their ID and ordered by fee-per-byte for
/// block production. The mempool enforces a maximum capacity to prevent
/// memory exhaustion under spam attacks.
#[derive(Debug)]
pub struct Mempool {
    txs: RwLock<HashMap<String, Transaction>>,
    max_size: usize,
}

impl Mempool {
    /// Creates a new mempool with the given configuration.
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            txs: RwLock::new(HashMap::new()),
            max_size: config.max_size,
        }
    }

    /// Adds a transaction into the mempool.
    ///
    /// Returns an error if the mempool is at capacity.
    pub fn add(&self, tx: Transaction) -> Result<(), String> {
        let mut txs = self.txs.write();
        if txs.len() >= self.max_size {
            return Err("mempool is full".to_string());
        }
        txs.insert(tx.id.clone(), tx);
        Ok(())
    }

    /// Removes a transaction by its ID.
    pub fn remove(&self, id: &str) {
        let mut txs = self.txs.write();
        txs.remove(id);
    }

    /// Removes a batch of transactions by ID, e.g. after a block commits.
    pub fn remove_batch(&self, ids: &[String]) {
        let mut txs = self.txs.write();
        for id in ids {
            txs.remove(id);
        }
    }

    /// Selects up to `max` pending transactions ordered by descending fee.
    ///
    /// Ties are broken by transaction ID so the result is deterministic
    /// across calls against the same mempool contents.
    pub fn select_transactions(&self, max: usize) -> Vec<Transaction> {
        let txs = self.txs.read();
        let mut candidates: Vec<Transaction> = txs.values().cloned().collect();
        candidates.sort_by(|a, b| b.fee.cmp(&a.fee).then_with(|| a.id.cmp(&b.id)));
        candidates.truncate(max);
        candidates
    }

    /// Returns the number of pending transactions.
    pub fn len(&self) -> usize {
        self.txs.read().len()
    }

    /// Alias for [`Mempool::len`].
    pub fn size(&self) -> usize {
        self.len()
    }

    /// Returns true if a transaction with the given ID is pending.
    pub fn contains(&self, id: &str) -> bool {
        self.txs.read().contains_key(id)
    }

    /// Returns true if the mempool has no pending transactions.
    pub fn is_empty(&self) -> bool {
        self.txs.read().is_empty()
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(MempoolConfig::default())
    }
}
