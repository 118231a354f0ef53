//! # Zero-Knowledge Proof Module
//!
//! Implements the ZKP subsystem for NOVA private transactions using Groth16
//! over the BN254 curve. The core primitive is a balance proof: given a
//! Pedersen commitment `C = balance * G + r * H`, the prover demonstrates
//! knowledge of `(balance, r)` such that the commitment opens correctly
//! **and** `balance >= required_amount`, without revealing either witness.
//!
//! ## Architecture
//!
//! ```text
//! commitment.rs   — Pedersen commitment scheme (setup, commit, verify)
//! circuit.rs      — R1CS arithmetic circuit (BalanceProofCircuit)
//! prover.rs       — Groth16 proof generation (BalanceProver, BalanceProof)
//! verifier.rs     — Groth16 proof verification (BalanceVerifier)
//! ```
//!
//! ## Security Model
//!
//! - **Commitment hiding**: information-theoretically hiding under DLOG.
//! - **Commitment binding**: computationally binding under DLOG on BN254/G1.
//! - **Soundness**: Groth16 knowledge-soundness in the generic group model.
//! - **Range check**: bit-decomposition to 64 bits with boolean enforcement
//!   on every limb — no overflow, no wrap-around.
//!
//! The trusted setup is per-circuit. In production, replace the local
//! ceremony with an MPC-generated SRS (see `prover::BalanceProver::setup`).

pub mod circuit;
pub mod commitment;
pub mod prover;
pub mod verifier;

// Re-export the public API so callers can do `use nova_protocol::zkp::*`.
pub use circuit::BalanceProofCircuit;
pub use commitment::{Commitment, PedersenParams};
pub use prover::{BalanceProof, BalanceProver};
pub use verifier::BalanceVerifier;

/// Number of bits used for range proofs. 64 bits covers the full u64 domain,
/// which is more than sufficient for any sane monetary denomination.
pub const RANGE_BITS: usize = 64;
