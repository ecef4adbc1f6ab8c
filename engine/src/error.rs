use thiserror::Error;

/// Crate-wide result alias
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse error classes callers branch on.
///
/// Everything except [`ErrorCategory::External`] aborts the whole transfer:
/// outputs are chained, so continuing after a fatal error would leave
/// partially built state behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wrong-length keys, hashes or points, bad encodings, truncated framing
    MalformedInput,
    /// Receiver-side derivation disagrees with what the sender committed to
    ///
    /// Only reported where the committed hash is visible directly (a
    /// pay-to-key-hash output). Behind a covenant the same break shows up as
    /// a [`ErrorCategory::ProofMismatch`].
    DerivationMismatch,
    /// Regenerated proof or commitment disagrees with the on-chain anchor
    ProofMismatch,
    /// Pre-broadcast invariant violated; nothing may be signed
    InvariantFailure,
    /// Failure reported by the chain collaborator
    External,
}

#[derive(Debug, Error)]
pub enum Error {
    // Malformed input
    #[error("Invalid public key - not a valid compressed curve point")]
    InvalidPublicKey,

    #[error("Invalid point encoding in {0}")]
    InvalidPoint(&'static str),

    #[error("Invalid scalar - zero or not below the curve order")]
    InvalidScalar,

    #[error("Invalid length for {what}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown derivation mode: {0}")]
    UnknownMode(u8),

    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("Truncated input while reading {0}")]
    Truncated(&'static str),

    #[error("Trailing bytes after {0}")]
    TrailingBytes(&'static str),

    #[error("Non-minimal CompactSize encoding")]
    NonMinimalVarInt,

    #[error("Bad envelope magic tag")]
    BadMagic,

    #[error("Malformed redeem script: {0}")]
    MalformedScript(&'static str),

    #[error("Malformed token prefix: {0}")]
    MalformedToken(&'static str),

    #[error("Invalid paycode: {0}")]
    InvalidPaycode(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Input index {index} out of range for transaction with {count} inputs")]
    InputIndexOutOfRange { index: usize, count: usize },

    #[error("Output index {index} out of range for transaction with {count} outputs")]
    OutputIndexOutOfRange { index: usize, count: usize },

    // Derivation mismatch
    #[error("One-time key derivation mismatch - expected hash {expected}, derived {derived}")]
    DerivationMismatch { expected: String, derived: String },

    // Proof / commitment mismatch
    #[error("Range proof verification failed")]
    ProofInvalid,

    #[error("Commitment mismatch - regenerated commitment does not match the on-chain token commitment")]
    CommitmentMismatch,

    #[error("Proof hash mismatch - regenerated envelope does not match the covenant anchor")]
    ProofHashMismatch,

    #[error("Covenant mismatch - rebuilt redeem script does not hash to the funded output")]
    CovenantMismatch,

    // Pre-broadcast invariants
    #[error("Guard hash mismatch - unlocking key does not hash to the covenant guard")]
    GuardHashMismatch,

    #[error("Output value mismatch - designated output holds {actual}, unlocker asserts {asserted}")]
    OutputValueMismatch { asserted: u64, actual: u64 },

    #[error("Signature failed local verification")]
    SignatureInvalid,

    #[error("Illegal spend transition from {from} to {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Insufficient funds: have {have} sat, need {need} sat")]
    InsufficientFunds { have: u64, need: u64 },

    // External collaborator
    #[error("Chain error: {0}")]
    Chain(String),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::DerivationMismatch { .. } => ErrorCategory::DerivationMismatch,
            Error::ProofInvalid
            | Error::CommitmentMismatch
            | Error::ProofHashMismatch
            | Error::CovenantMismatch => ErrorCategory::ProofMismatch,
            Error::GuardHashMismatch
            | Error::OutputValueMismatch { .. }
            | Error::SignatureInvalid
            | Error::IllegalTransition { .. }
            | Error::InsufficientFunds { .. } => ErrorCategory::InvariantFailure,
            Error::Chain(_) => ErrorCategory::External,
            _ => ErrorCategory::MalformedInput,
        }
    }

    /// Whether the error must abort the multi-transaction flow
    pub fn is_fatal(&self) -> bool {
        self.category() != ErrorCategory::External
    }

    pub(crate) fn length(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::InvalidLength {
            what,
            expected,
            actual,
        }
    }
}
