//! StealthCash - confidential token transfers over one-time keys
//!
//! A sender locks a tokenized value under a covenant that only a designated
//! receiver can unlock, without either party's paycode or the amount
//! appearing on-chain in the clear.
//!
//! ## Modules
//!
//! - [`crypto`]: secp256k1 encodings, Pedersen commitments, paycodes, RPA
//!   one-time key derivation and Schnorr signatures
//! - [`zk`]: the Sigma64 range proof
//! - [`envelope`]: canonical framing of a proof and its anchor hashes
//! - [`covenant`]: redeem scripts, guard extraction and the spend state machine
//! - [`tx`]: transactions, token prefixes, signature hashing and signing
//! - [`chain`]: the chain collaborator trait and an in-memory chain
//! - [`flow`]: lock and unlock flows over a chain
//!
//! The range proof is verified off-chain by the receiver before signing.
//! The covenant anchors its hash but does not evaluate it.

pub mod announcement;
pub mod chain;
pub mod covenant;
pub mod crypto;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod flow;
pub mod hash;
pub mod tx;
pub mod zk;

pub use announcement::Announcement;
pub use chain::{ChainClient, MemoryChain, Utxo};
pub use crypto::{Paycode, PaycodeKeys, RpaMode, SecretScalar};
pub use envelope::{
    build_amount_proof_envelope, build_envelope, parse_envelope, verify_amount_proof_envelope,
    verify_anchored_envelope, AmountProofEnvelope, EnvelopeHeader, ParsedEnvelope,
};
pub use error::{Error, ErrorCategory, Result};
pub use flow::FlowParams;


#[cfg(test)]
mod test_vectors;


#[cfg(test)]
mod integration_tests;
