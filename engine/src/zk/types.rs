//! Sigma64 Proof Types
//!
//! Fixed-width wire layout, no internal length prefixes:
//! `C || C_0..C_63 || 64 × (A0 || A1 || e0 || z0 || e1 || z1)`

use crate::crypto::{POINT_LEN, SCALAR_LEN};
use crate::error::{Error, Result};

/// Bit width of every range proof
pub const RANGE_BITS: usize = 64;

/// Size of one per-bit OR proof: two points and four scalars
pub const BIT_PROOF_LEN: usize = 2 * POINT_LEN + 4 * SCALAR_LEN; // 194 bytes

/// Size of a serialized Sigma64 proof
pub const PROOF_LEN: usize = POINT_LEN + RANGE_BITS * POINT_LEN + RANGE_BITS * BIT_PROOF_LEN; // 14 561 bytes

/// OR proof that a bit commitment opens to 0 or to `H`
///
/// Branch 0 proves knowledge of `log_G(C_i)`, branch 1 of `log_G(C_i - H)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitProof {
    pub a0: [u8; POINT_LEN],
    pub a1: [u8; POINT_LEN],
    pub e0: [u8; SCALAR_LEN],
    pub z0: [u8; SCALAR_LEN],
    pub e1: [u8; SCALAR_LEN],
    pub z1: [u8; SCALAR_LEN],
}

impl BitProof {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.a0);
        out.extend_from_slice(&self.a1);
        out.extend_from_slice(&self.e0);
        out.extend_from_slice(&self.z0);
        out.extend_from_slice(&self.e1);
        out.extend_from_slice(&self.z1);
    }

    /// Caller guarantees `bytes.len() == BIT_PROOF_LEN`
    fn from_slice(bytes: &[u8]) -> Self {
        let scalar_at = |offset: usize| {
            let mut scalar = [0u8; SCALAR_LEN];
            scalar.copy_from_slice(&bytes[offset..offset + SCALAR_LEN]);
            scalar
        };
        let mut a0 = [0u8; POINT_LEN];
        let mut a1 = [0u8; POINT_LEN];
        a0.copy_from_slice(&bytes[..POINT_LEN]);
        a1.copy_from_slice(&bytes[POINT_LEN..2 * POINT_LEN]);

        let scalars = 2 * POINT_LEN;
        Self {
            a0,
            a1,
            e0: scalar_at(scalars),
            z0: scalar_at(scalars + SCALAR_LEN),
            e1: scalar_at(scalars + 2 * SCALAR_LEN),
            z1: scalar_at(scalars + 3 * SCALAR_LEN),
        }
    }
}

/// Aggregate commitment plus 64 per-bit commitments and OR proofs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sigma64Proof {
    /// `C = v·H + r·G`
    pub commitment: [u8; POINT_LEN],
    /// `C_i = b_i·H + r_i·G`, least significant bit first
    pub bit_commitments: Vec<[u8; POINT_LEN]>,
    pub bit_proofs: Vec<BitProof>,
}

impl Sigma64Proof {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PROOF_LEN);
        out.extend_from_slice(&self.commitment);
        for commitment in &self.bit_commitments {
            out.extend_from_slice(commitment);
        }
        for proof in &self.bit_proofs {
            proof.write_to(&mut out);
        }
        out
    }

    /// Split the fixed-width layout; points are validated by the verifier
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PROOF_LEN {
            return Err(Error::length("sigma64 proof", PROOF_LEN, bytes.len()));
        }
        let mut commitment = [0u8; POINT_LEN];
        commitment.copy_from_slice(&bytes[..POINT_LEN]);

        let bits_end = POINT_LEN + RANGE_BITS * POINT_LEN;
        let bit_commitments = bytes[POINT_LEN..bits_end]
            .chunks_exact(POINT_LEN)
            .map(|chunk| {
                let mut point = [0u8; POINT_LEN];
                point.copy_from_slice(chunk);
                point
            })
            .collect();
        let bit_proofs = bytes[bits_end..]
            .chunks_exact(BIT_PROOF_LEN)
            .map(BitProof::from_slice)
            .collect();

        Ok(Self {
            commitment,
            bit_commitments,
            bit_proofs,
        })
    }
}
