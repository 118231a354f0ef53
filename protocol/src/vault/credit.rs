//! # Credit Line Management
//!
//! Credit lines are a first-class primitive in NOVA. Unlike traditional DeFi
//! lending protocols that require over-collateralization, NOVA supports
//! under-collateralized credit based on reputation scoring (handled by the
//! [`crate::credit`] module) and bilateral agreements between providers
//! and borrowers.
//!
//! A [`CreditLine`] is a revocable, time-bounded commitment from a provider
//! to lend up to a fixed limit at an agreed interest rate. The borrower can
//! draw against the line incrementally and repay on their own schedule,
//! as long as they stay within the limit and the line hasn't expired.
//!
//! A [`CreditLineManager`] aggregates multiple credit lines for a single
//! borrower and provides selection logic (e.g., cheapest available line).
//!
//! ## State Machine
//!
//! ```text
//!    ┌──────────┐
//!    │  Active   │ ← normal operating state
//!    └────┬──┬───┘
//!         │  │
//!   freeze│  │ close / expire
//!         │  │
//!    ┌────▼──┘   ┌──────────┐
//!    │  Frozen │──►│  Closed  │ ← terminal state, no further draws
//!    └────┬───┘   └──────────┘
//!         │
//!    default│ (missed payment deadline)
//!         │
//!    ┌────▼──────┐
//!    │ Defaulted  │ ← terminal state, triggers collection process
//!    └────────────┘
//! ```
//!
//! ## Interest Model
//!
//! Interest rates are expressed in **basis points** (bps). 1 bp = 0.01%.
//! So 500 bps = 5.00%. This avoids floating-point entirely and gives us
//! 0.01% granularity, which is more than sufficient for credit products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during credit line operations.
#[derive(Debug, Error)]
pub enum CreditError {
    /// Attempted to draw more than the available credit.
    #[error(
        "credit limit exceeded: available {available}, requested {requested} (line {line_id})"
    )]
    LimitExceeded {
        /// The credit line ID.
        line_id: Uuid,
        /// Currently available credit (limit - used).
        available: u64,
        /// The draw amount that was rejected.
        requested: u64,
    },

    /// Attempted to draw on an inactive credit line.
    #[error("credit line {line_id} is not active (status: {status:?})")]
    NotActive {
        /// The credit line ID.
        line_id: Uuid,
        /// Current status of the line.
        status: CreditLineStatus,
    },

    /// Attempted to draw on an expired credit line.
    #[error("credit line {line_id} expired at {expired_at}")]
    Expired {
        /// The credit line ID.
        line_id: Uuid,
        /// When the line expired.
        expired_at: DateTime<Utc>,
    },

    /// Attempted to repay more than the outstanding balance.
    #[error("repayment {repayment} exceeds outstanding balance {outstanding} (line {line_id})")]
    OverRepayment {
        /// The credit line ID.
        line_id: Uuid,
        /// Current outstanding (used) amount.
        outstanding: u64,
        /// The repayment amount that was rejected.
        repayment: u64,
    },

    /// No credit line found that satisfies the requested criteria.
    #[error("no eligible credit line found for amount {0}")]
    NoEligibleLine(u64),

    /// The credit line has already been closed.
    #[error("credit line {0} is already closed")]
    AlreadyClosed(Uuid),
}

// ---------------------------------------------------------------------------
// CreditLineStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a credit line.
///
/// State transitions are unidirectional: once a line moves to `Closed` or
/// `Defaulted`, it cannot be reactivated. `Frozen` lines can be unfrozen
/// back to `Active` by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditLineStatus {
    /// Line is open for draws and repayments.
    Active,

    /// Line is temporarily suspended. No new draws allowed, but
    /// repayments are still accepted. Can transition back to `Active`.
    Frozen,

    /// Line is permanently closed. No further operations allowed.
    /// Outstanding balance (if any) must still be repaid.
    Closed,

    /// Borrower has missed a payment deadline or violated terms.
    /// Triggers the collection/dispute resolution process.
    Defaulted,
}

impl CreditLineStatus {
    /// Returns `true` if the status allows new draws.
    pub fn allows_draws(&self) -> bool {
        matches!(self, CreditLineStatus::Active)
    }

    /// Returns `true` if the status allows repayments.
    pub fn allows_repayments(&self) -> bool {
        matches!(
            self,
            CreditLineStatus::Active | CreditLineStatus::Frozen | CreditLineStatus::Defaulted
        )
    }

    /// Returns `true` if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CreditLineStatus::Closed | CreditLineStatus::Defaulted)
    }
}

// ---------------------------------------------------------------------------
// CreditLine
// ---------------------------------------------------------------------------

/// A single credit line between a provider and a borrower.
///
/// The credit line defines the maximum amount the borrower can draw,
/// the interest rate, the term, and the current utilization. All amounts
/// are in the smallest unit of the associated token (specified externally
/// by the agreement — the credit line itself is token-agnostic).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreditLine {
    /// Unique identifier for this credit line.
    pub id: Uuid,

    /// NOVA address of the credit provider (lender).
    pub provider: String,

    /// NOVA address of the borrower.
    pub borrower: String,

    /// Maximum amount that can be drawn (in smallest units).
    pub limit: u64,

    /// Amount currently drawn and outstanding (in smallest units).
    ///
    /// Invariant: `used <= limit` (enforced by [`draw`](Self::draw)).
    pub used: u64,

    /// Annual interest rate in basis points.
    ///
    /// Example: 500 = 5.00% APR. Interest accrual is computed
    /// off-chain by the settlement engine; this field is the
    /// contractual rate used for those calculations.
    pub interest_rate_bps: u32,

    /// Credit term in days from `created_at`.
    ///
    /// After `created_at + term_days`, the line expires and no
    /// further draws are allowed. Outstanding balances remain due.
    pub term_days: u32,

    /// When this credit line was created.
    pub created_at: DateTime<Utc>,

    /// When this credit line expires (`created_at + term_days`).
    pub expires_at: DateTime<Utc>,

    /// Current lifecycle status.
    pub status: CreditLineStatus,
}

impl CreditLine {
    /// Creates a new active credit line.
    ///
    /// # Arguments
    ///
    /// * `provider` — Lender's NOVA address.
    /// * `borrower` — Borrower's NOVA address.
    /// * `limit` — Maximum drawable amount.
    /// * `interest_rate_bps` — Annual rate in basis points (e.g., 500 = 5%).
    /// * `term_days` — Duration of the credit line in days.
    pub fn new(
        provider: &str,
        borrower: &str,
        limit: u64,
        interest_rate_bps: u32,
        term_days: u32,
    ) -> Self {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(term_days as i64);

        Self {
            id: Uuid::new_v4(),
            provider: provider.to_string(),
            borrower: borrower.to_string(),
            limit,
            used: 0,
            interest_rate_bps,
            term_days,
            created_at: now,
            expires_at,
            status: CreditLineStatus::Active,
        }
    }

    /// Returns the amount of credit currently available for drawing.
    ///
    /// This is simply `limit - used`. Returns 0 if the line is fully
    /// utilized or if the status doesn't allow draws.
    pub fn available(&self) -> u64 {
        if !self.status.allows_draws() {
            return 0;
        }
        self.limit.saturating_sub(self.used)
    }

    /// Returns the utilization ratio as a percentage (0-100).
    ///
    /// A utilization of 80%+ may trigger risk alerts in the credit
    /// scoring module.
    pub fn utilization_pct(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        (self.used as f64 / self.limit as f64) * 100.0
    }

    /// Returns `true` if the credit line has expired based on the
    /// current wall-clock time.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Returns the interest rate as a human-readable percentage string.
    ///
    /// Example: 500 bps -> "5.00%"
    pub fn interest_rate_display(&self) -> String {
        let pct = self.interest_rate_bps as f64 / 100.0;
        format!("{:.2}%", pct)
    }

    /// Draws (borrows) against this credit line.
    ///
    /// Increases `used` by `amount`. The caller is responsible for
    /// crediting the corresponding funds to the borrower's wallet.
    ///
    /// # Errors
    ///
    /// - [`CreditError::NotActive`] if the line status doesn't allow draws.
    /// - [`CreditError::Expired`] if the line has passed its expiry date.
    /// - [`CreditError::LimitExceeded`] if `amount > available()`.
    pub fn draw(&mut self, amount: u64) -> Result<u64, CreditError> {
        // Check status.
        if !self.status.allows_draws() {
            return Err(CreditError::NotActive {
                line_id: self.id,
                status: self.status,
            });
        }

        // Check expiry.
        if self.is_expired() {
            return Err(CreditError::Expired {
                line_id: self.id,
                expired_at: self.expires_at,
            });
        }

        // Check limit.
        let avail = self.available();
        if amount > avail {
            return Err(CreditError::LimitExceeded {
                line_id: self.id,
                available: avail,
                requested: amount,
            });
        }

        self.used += amount;
        Ok(self.available())
    }

    /// Repays (reduces) the outstanding balance on this credit line.
    ///
    /// Repayments are accepted in any status except `Closed` (where
    /// the balance has already been settled).
    ///
    /// # Errors
    ///
    /// - [`CreditError::AlreadyClosed`] if the line is closed.
    /// - [`CreditError::OverRepayment`] if `amount > used`.
    pub fn repay(&mut self, amount: u64) -> Result<u64, CreditError> {
        if self.status == CreditLineStatus::Closed {
            return Err(CreditError::AlreadyClosed(self.id));
        }

        if amount > self.used {
            return Err(CreditError::OverRepayment {
                line_id: self.id,
                outstanding: self.used,
                repayment: amount,
            });
        }

        self.used -= amount;
        Ok(self.used)
    }

    /// Freezes the credit line, preventing new draws but allowing repayments.
    ///
    /// Typically invoked by the provider when risk thresholds are breached
    /// or during a compliance review.
    pub fn freeze(&mut self) -> Result<(), CreditError> {
        if self.status.is_terminal() {
            return Err(CreditError::AlreadyClosed(self.id));
        }
        self.status = CreditLineStatus::Frozen;
        Ok(())
    }

    /// Unfreezes a frozen credit line back to active status.
    ///
    /// Only valid when current status is `Frozen`.
    pub fn unfreeze(&mut self) -> Result<(), CreditError> {
        if self.status != CreditLineStatus::Frozen {
            return Err(CreditError::NotActive {
                line_id: self.id,
                status: self.status,
            });
        }
        self.status = CreditLineStatus::Active;
        Ok(())
    }

    /// Closes the credit line permanently.
    ///
    /// Should only be called when the outstanding balance is zero.
    /// If there's still an outstanding balance, the settlement engine
    /// should handle final settlement before calling this.
    pub fn close(&mut self) -> Result<(), CreditError> {
        if self.status == CreditLineStatus::Closed {
            return Err(CreditError::AlreadyClosed(self.id));
        }
        self.status = CreditLineStatus::Closed;
        Ok(())
    }

    /// Marks the credit line as defaulted.
    ///
    /// This is a terminal state triggered by missed payment deadlines
    /// or terms violations. Once defaulted, the line cannot be reactivated
    /// — it enters the collection/dispute resolution pipeline.
    pub fn default_line(&mut self) -> Result<(), CreditError> {
        if self.status.is_terminal() {
            return Err(CreditError::AlreadyClosed(self.id));
        }
        self.status = CreditLineStatus::Defaulted;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CreditLineManager
// ---------------------------------------------------------------------------

/// Manages multiple credit lines for a single borrower wallet.
///
/// Provides aggregation queries (total available credit, total outstanding)
/// and selection logic for choosing the best line to draw against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreditLineManager {
    /// All credit lines for this borrower, indexed by UUID.
    lines: Vec<CreditLine>,
}

impl CreditLineManager {
    /// Creates a new empty credit line manager.
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Adds a credit line to the manager.
    pub fn add_line(&mut self, line: CreditLine) {
        self.lines.push(line);
    }

    /// Removes a closed credit line by ID.
    ///
    /// Returns the removed line, or `None` if not found.
    /// Only closed lines can be removed — active/frozen/defaulted lines
    /// must remain for accounting purposes.
    pub fn remove_closed_line(&mut self, line_id: &Uuid) -> Option<CreditLine> {
        if let Some(pos) = self
            .lines
            .iter()
            .position(|l| l.id == *line_id && l.status == CreditLineStatus::Closed)
        {
            Some(self.lines.remove(pos))
        } else {
            None
        }
    }

    /// Returns a reference to a credit line by ID.
    pub fn get_line(&self, line_id: &Uuid) -> Option<&CreditLine> {
        self.lines.iter().find(|l| l.id == *line_id)
    }

    /// Returns a mutable reference to a credit line by ID.
    pub fn get_line_mut(&mut self, line_id: &Uuid) -> Option<&mut CreditLine> {
        self.lines.iter_mut().find(|l| l.id == *line_id)
    }

    /// Returns the total number of credit lines (all statuses).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total available credit across all active, non-expired lines.
    pub fn total_available(&self) -> u64 {
        self.lines
            .iter()
            .filter(|l| l.status.allows_draws() && !l.is_expired())
            .map(|l| l.available())
            .sum()
    }

    /// Returns the total outstanding (used) amount across all lines.
    pub fn total_outstanding(&self) -> u64 {
        self.lines.iter().map(|l| l.used).sum()
    }

    /// Returns the number of active (non-terminal, non-expired) credit lines.
    pub fn active_line_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.status == CreditLineStatus::Active && !l.is_expired())
            .count()
    }

    /// Finds the cheapest credit line with sufficient available credit
    /// to cover the requested `amount`.
    ///
    /// "Cheapest" means the lowest `interest_rate_bps`. Among lines with
    /// equal rates, the one with the most available credit is preferred
    /// (to minimize utilization ratio impact).
    ///
    /// Only considers lines that are:
    /// - Status: `Active`
    /// - Not expired
    /// - Have `available() >= amount`
    ///
    /// Returns `None` if no eligible line exists.
    pub fn best_available_line(&self, amount: u64) -> Option<&CreditLine> {
        self.lines
            .iter()
            .filter(|l| l.status.allows_draws() && !l.is_expired() && l.available() >= amount)
            .min_by(|a, b| {
                // Primary sort: lowest interest rate.
                a.interest_rate_bps
                    .cmp(&b.interest_rate_bps)
                    // Secondary sort: most available credit (descending).
                    .then_with(|| b.available().cmp(&a.available()))
            })
    }

    /// Finds the cheapest line and draws against it.
    ///
    /// Convenience method that combines [`best_available_line`](Self::best_available_line)
    /// and [`CreditLine::draw`].
    ///
    /// # Returns
    ///
    /// The UUID of the line that was drawn against, and the remaining
    /// available credit on that line.
    ///
    /// # Errors
    ///
    /// Returns [`CreditError::NoEligibleLine`] if no line can cover the amount.
    pub fn draw_best_available(&mut self, amount: u64) -> Result<(Uuid, u64), CreditError> {
        // Find the best line's ID first (to avoid borrow issues).
        let line_id = self
            .best_available_line(amount)
            .map(|l| l.id)
            .ok_or(CreditError::NoEligibleLine(amount))?;

        let line = self.get_line_mut(&line_id).unwrap();
        let remaining = line.draw(amount)?;

        Ok((line_id, remaining))
    }

    /// Returns all credit lines (immutable slice).
    pub fn all_lines(&self) -> &[CreditLine] {
        &self.lines
    }

    /// Returns all credit lines from a specific provider.
    pub fn lines_from_provider(&self, provider: &str) -> Vec<&CreditLine> {
        self.lines
            .iter()
            .filter(|l| l.provider == provider)
            .collect()
    }

    /// Returns the weighted average interest rate across all active lines,
    /// weighted by limit size.
    ///
    /// Returns `None` if there are no active lines.
    pub fn weighted_avg_rate_bps(&self) -> Option<u32> {
        let active_lines: Vec<&CreditLine> = self
            .lines
            .iter()
            .filter(|l| l.status == CreditLineStatus::Active)
            .collect();

        if active_lines.is_empty() {
            return None;
        }

        let total_limit: u64 = active_lines.iter().map(|l| l.limit).sum();
        if total_limit == 0 {
            return None;
        }

        let weighted_sum: u64 = active_lines
            .iter()
            .map(|l| l.limit * l.interest_rate_bps as u64)
            .sum();

        Some((weighted_sum / total_limit) as u32)
    }
}

impl Default for CreditLineManager {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
