//! Zero-Knowledge Range Proof Module
//!
//! Sigma64 proves that a Pedersen commitment `C = v·H + r·G` opens to some
//! `v` in `[0, 2^64)` without revealing `v`.
//!
//! ## Overview
//!
//! The proof decomposes `v` into 64 bits and commits to each bit separately.
//! A 2-way OR proof per bit shows the bit commitment opens to 0 or to `H`;
//! the weighted sum of bit commitments must equal `C`.
//!
//! ## Usage
//!
//! 1. Sender: derive `zk_seed` from the RPA session, call `generate_proof`
//! 2. Receiver: re-derive the same seed and regenerate the identical proof
//! 3. Either side: `verify_proof` before trusting the commitment
//!
//! The proof is checked off-chain by the receiver; the covenant only anchors
//! its hash.

pub mod sigma64;
pub mod types;
pub mod verifier;

pub use sigma64::{generate_proof, generate_proof_with_opening};
pub use types::*;
pub use verifier::*;
