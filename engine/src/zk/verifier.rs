//! Sigma64 proof verification
//!
//! 1. `Σ 2^i·C_i == C` binds the bit commitments to one value
//! 2. per bit: `e0 + e1 == H_s("sigma64/challenge", A0, A1, C_i)`
//! 3. per bit: `z0·G == A0 + e0·C_i` and `z1·G == A1 + e1·(C_i - H)`
//!
//! Any single failure rejects the whole proof.

use k256::{ProjectivePoint, Scalar};
use tracing::debug;

use super::sigma64::{bit_challenge, bit_weight};
use super::types::{BitProof, Sigma64Proof, RANGE_BITS};
use crate::crypto::{decompress, generator_h, parse_scalar};
use crate::error::{Error, Result};

/// Verify a parsed proof
pub fn verify_proof(proof: &Sigma64Proof) -> bool {
    match check_proof(proof) {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "sigma64 proof rejected");
            false
        }
    }
}

/// Parse and verify serialized proof bytes
pub fn verify_proof_bytes(bytes: &[u8]) -> bool {
    match Sigma64Proof::from_bytes(bytes) {
        Ok(proof) => verify_proof(&proof),
        Err(_) => false,
    }
}

fn check_proof(proof: &Sigma64Proof) -> Result<()> {
    if proof.bit_commitments.len() != RANGE_BITS || proof.bit_proofs.len() != RANGE_BITS {
        return Err(Error::ProofInvalid);
    }
    let aggregate = decompress(&proof.commitment)?;
    let h = generator_h();

    let mut sum = ProjectivePoint::IDENTITY;
    for (i, (c_bytes, bit_proof)) in proof
        .bit_commitments
        .iter()
        .zip(&proof.bit_proofs)
        .enumerate()
    {
        let c_i = decompress(c_bytes)?;
        check_bit(c_bytes, &c_i, &h, bit_proof)?;
        sum += c_i * bit_weight(i);
    }

    if sum != aggregate {
        return Err(Error::ProofInvalid);
    }
    Ok(())
}

fn check_bit(
    c_bytes: &[u8; 33],
    c_i: &ProjectivePoint,
    h: &ProjectivePoint,
    bit: &BitProof,
) -> Result<()> {
    let a0 = decompress(&bit.a0)?;
    let a1 = decompress(&bit.a1)?;
    let e0: Scalar = parse_scalar(&bit.e0)?;
    let z0 = parse_scalar(&bit.z0)?;
    let e1 = parse_scalar(&bit.e1)?;
    let z1 = parse_scalar(&bit.z1)?;

    if bit_challenge(&bit.a0, &bit.a1, c_bytes) != e0 + e1 {
        return Err(Error::ProofInvalid);
    }
    if ProjectivePoint::GENERATOR * z0 != a0 + c_i * &e0 {
        return Err(Error::ProofInvalid);
    }
    if ProjectivePoint::GENERATOR * z1 != a1 + (c_i - h) * e1 {
        return Err(Error::ProofInvalid);
    }
    Ok(())
}
