//! # Digital Signatures
//!
//! Ed25519 signing and verification — the backbone of authentication in NOVA.
//!
//! Every transaction, every block header, every peer handshake is authenticated
//! with an Ed25519 signature. This module provides the signing and verification
//! functions that make that possible.
//!
//! ## Why not just use ed25519-dalek directly?
//!
//! We could, and in some internal code we do. But wrapping the operations
//! gives us:
//!
//! 1. A single place to audit all signing operations.
//! 2. Consistent error types across the codebase.
//! 3. A natural extension point for multi-sig and threshold signatures later.
//! 4. Type safety — you can't accidentally pass a hash where a message goes.
//!
//! ## Strictness
//!
//! We use `ed25519-dalek`'s strict verification by default. This means we
//! reject some edge-case signatures that lenient implementations accept.
//! This is deliberate: stricter is safer, and we don't need to be compatible
//! with legacy Ed25519 implementations that get the cofactor wrong.

use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use thiserror::Error;

use super::keys::{NovaKeypair, NovaPublicKey, NovaSignature};

/// Errors during signature operations.
///
/// Intentionally vague — we don't tell attackers why verification failed.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignatureBytes,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Sign a message using a NOVA keypair.
///
/// Produces a 64-byte Ed25519 signature over the given message bytes.
/// The signature is deterministic — signing the same message with the same
/// key will always produce the same signature (RFC 8032). No nonce reuse
/// bugs possible. Thank you, Bernstein.
///
/// # Arguments
///
/// * `keypair` — The signer's keypair. Only the signing key is used, but
///   we take the full keypair to prevent callers from forgetting they need
///   the private key.
/// * `message` — The message bytes to sign. Can be any length; Ed25519
///   internally hashes with SHA-512.
///
/// # Example
///
/// ```
/// use nova_protocol::crypto::{NovaKeypair, sign, verify};
///
/// let keypair = NovaKeypair::generate();
/// let message = b"send 100 NOVA to alice";
/// let signature = sign(&keypair, message);
///
/// assert!(verify(&keypair.public_key(), message, &signature));
/// ```
pub fn sign(keypair: &NovaKeypair, message: &[u8]) -> NovaSignature {
    keypair.sign(message)
}

/// Verify an Ed25519 signature against a public key and message.
///
/// Returns `true` if the signature is valid, `false` otherwise.
/// We intentionally don't distinguish between "invalid signature" and
/// "wrong public key" — both are just "nope." Giving attackers a
/// detailed error oracle is a bad idea.
///
/// # Arguments
///
/// * `public_key` — The signer's public key.
/// * `message` — The original message bytes.
/// * `signature` — The signature to verify.
pub fn verify(public_key: &NovaPublicKey, message: &[u8], signature: &NovaSignature) -> bool {
    public_key.verify(message, signature)
}

/// Verify a signature using raw byte components.
///
/// This is the "I got these bytes off the wire and need to check them" variant.
/// It parses the public key and signature bytes, then does the verification.
///
/// Useful when deserializing transactions from the network where everything
/// arrives as byte slices rather than typed structs.
pub fn verify_raw(
    public_key_bytes: &[u8; 32],
    message: &[u8],
    signature_bytes: &[u8; 64],
) -> Result<(), SignatureError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key_bytes).map_err(|_| SignatureError::InvalidPublicKey)?;

    let signature = DalekSignature::from_bytes(signature_bytes);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

/// Sign a message and return the signature as raw bytes.
///
/// Convenience function for when you need bytes instead of a `NovaSignature`
/// struct. Common in serialization paths where you're building wire-format
/// messages and don't want to round-trip through the typed wrapper.
pub fn sign_to_bytes(keypair: &NovaKeypair, message: &[u8]) -> Vec<u8> {
    let sig = sign(keypair, message);
    sig.as_bytes().to_vec()
}

/// Batch-verify multiple signatures.
///
/// All signatures must be valid for this to return `Ok`. If any single
/// signature fails, the entire batch fails — we don't tell you which one.
/// If you need to know which signature is bad, verify them individually.
///
/// Currently falls back to sequential verification. True batch verification
/// (using randomized linear combinations) is on the roadmap and will give
/// us ~2x speedup for large batches without changing this API.
///
/// # Arguments
///
/// * `items` — A slice of (public_key, message, signature) tuples.
pub fn batch_verify(
    items: &[(NovaPublicKey, Vec<u8>, NovaSignature)],
) -> Result<(), SignatureError> {
    // Sequential verification for now. O(n) where each verification is
    // ~1600 field operations on Curve25519. For typical block sizes (<1000 txs),
    // this completes in under 100ms on modern hardware.
    //
    // When we switch to true batch verification, the math is:
    //   check: sum(s_i * B) == sum(R_i) + sum(k_i * A_i)
    // with random scalars to prevent cancellation attacks.
    for (pubkey, message, signature) in items {
        if !verify(pubkey, message, signature) {
            return Err(SignatureError::VerificationFailed);
        }
    }
    Ok(())
}
