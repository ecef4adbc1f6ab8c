//! Sigma64 proof generation
//!
//! Every bit of the value gets its own Pedersen commitment and a 2-way OR
//! proof that the commitment opens to 0 or to `H`. All randomness is derived
//! from the seed, so sender and receiver rebuild byte-identical proofs.
//!
//! Per bit `i` (purposes feed `tagged("sigma64/derive", seed, i, purpose)`):
//! 1. `r_i` (purpose 0), `C_i = b_i·H + r_i·G`
//! 2. real branch `j = b_i`: `k` (purpose 1), `A_j = k·G`
//! 3. simulated branch `s = 1 - b_i`: `e_s` (purpose 2), `z_s` (purpose 3),
//!    `A_s = z_s·G - e_s·Y_s` with `Y_0 = C_i`, `Y_1 = C_i - H`
//! 4. `e = H_s("sigma64/challenge", A0, A1, C_i)`, `e_j = e - e_s`,
//!    `z_j = k + e_j·r_i`

use k256::{ProjectivePoint, Scalar};
use tracing::debug;

use super::types::{BitProof, Sigma64Proof, RANGE_BITS};
use crate::crypto::{compress, generator_h, pedersen_commit, scalar_bytes, POINT_LEN};
use crate::hash::hash_to_scalar;

const DERIVE_LABEL: &[u8] = b"sigma64/derive";
pub(crate) const CHALLENGE_LABEL: &[u8] = b"sigma64/challenge";

#[derive(Clone, Copy)]
#[repr(u8)]
enum Purpose {
    Blinding = 0,
    Nonce = 1,
    SimulatedChallenge = 2,
    SimulatedResponse = 3,
}

fn derive(seed: &[u8; 32], index: u8, purpose: Purpose) -> Scalar {
    hash_to_scalar(DERIVE_LABEL, &[seed, &[index], &[purpose as u8]])
}

/// Fiat-Shamir challenge for one bit
pub(crate) fn bit_challenge(
    a0: &[u8; POINT_LEN],
    a1: &[u8; POINT_LEN],
    bit_commitment: &[u8; POINT_LEN],
) -> Scalar {
    hash_to_scalar(CHALLENGE_LABEL, &[a0, a1, bit_commitment])
}

/// `2^i` as a scalar
pub(crate) fn bit_weight(index: usize) -> Scalar {
    Scalar::from(1u64 << index)
}

/// Generate the proof for `value` from `seed`
pub fn generate_proof(value: u64, seed: &[u8; 32]) -> Sigma64Proof {
    generate_proof_with_opening(value, seed).0
}

/// Generate the proof and return the aggregate blinding `r = Σ 2^i·r_i`
pub fn generate_proof_with_opening(value: u64, seed: &[u8; 32]) -> (Sigma64Proof, Scalar) {
    let h = generator_h();
    let mut blinding = Scalar::ZERO;
    let mut bit_commitments = Vec::with_capacity(RANGE_BITS);
    let mut bit_proofs = Vec::with_capacity(RANGE_BITS);

    for i in 0..RANGE_BITS {
        let index = i as u8;
        let bit = (value >> i) & 1 == 1;

        let r_i = derive(seed, index, Purpose::Blinding);
        blinding += bit_weight(i) * r_i;

        let c_i = ProjectivePoint::GENERATOR * r_i + if bit { h } else { ProjectivePoint::IDENTITY };
        let c_bytes = compress(&c_i);

        let k = derive(seed, index, Purpose::Nonce);
        let e_sim = derive(seed, index, Purpose::SimulatedChallenge);
        let z_sim = derive(seed, index, Purpose::SimulatedResponse);

        // Statement of the simulated branch
        let y_sim = if bit { c_i } else { c_i - h };
        let a_real = compress(&(ProjectivePoint::GENERATOR * k));
        let a_sim = compress(&(ProjectivePoint::GENERATOR * z_sim - y_sim * e_sim));

        let (a0, a1) = if bit { (a_sim, a_real) } else { (a_real, a_sim) };
        let e = bit_challenge(&a0, &a1, &c_bytes);
        let e_real = e - e_sim;
        let z_real = k + e_real * r_i;

        let (e0, z0, e1, z1) = if bit {
            (e_sim, z_sim, e_real, z_real)
        } else {
            (e_real, z_real, e_sim, z_sim)
        };

        bit_commitments.push(c_bytes);
        bit_proofs.push(BitProof {
            a0,
            a1,
            e0: scalar_bytes(&e0),
            z0: scalar_bytes(&z0),
            e1: scalar_bytes(&e1),
            z1: scalar_bytes(&z1),
        });
    }

    let commitment = compress(&pedersen_commit(value, &blinding));
    debug!(commitment = %hex::encode(commitment), "generated sigma64 proof");

    (
        Sigma64Proof {
            commitment,
            bit_commitments,
            bit_proofs,
        },
        blinding,
    )
}
