//! Pedersen commitments over secp256k1
//!
//! `C = v·H + r·G` where `H` is a second generator with unknown discrete log
//! relative to `G`. `H` is found by try-and-increment over a fixed label, so
//! anyone can recompute it and nobody knows `log_G(H)`.

use std::sync::OnceLock;

use k256::{ProjectivePoint, Scalar};

use super::point::{compress, decompress, POINT_LEN};
use crate::hash::sha256;

/// Label hashed to find the second generator
pub const GENERATOR_H_LABEL: &[u8] = b"stealthcash/pedersen/H";

static GENERATOR_H: OnceLock<ProjectivePoint> = OnceLock::new();

/// The second generator `H`, computed once per process
pub fn generator_h() -> ProjectivePoint {
    *GENERATOR_H.get_or_init(find_generator_h)
}

/// Compressed encoding of `H`
pub fn generator_h_bytes() -> [u8; POINT_LEN] {
    compress(&generator_h())
}

fn find_generator_h() -> ProjectivePoint {
    let mut counter: u32 = 0;
    loop {
        let mut preimage = Vec::with_capacity(GENERATOR_H_LABEL.len() + 4);
        preimage.extend_from_slice(GENERATOR_H_LABEL);
        preimage.extend_from_slice(&counter.to_le_bytes());

        let mut candidate = [0u8; POINT_LEN];
        candidate[0] = 0x02;
        candidate[1..].copy_from_slice(&sha256(&preimage));

        if let Ok(point) = decompress(&candidate) {
            return point;
        }
        counter += 1;
    }
}

/// `C = value·H + blinding·G`
pub fn pedersen_commit(value: u64, blinding: &Scalar) -> ProjectivePoint {
    generator_h() * Scalar::from(value) + ProjectivePoint::GENERATOR * blinding
}

/// Compressed `pedersen_commit`
pub fn commitment_bytes(value: u64, blinding: &Scalar) -> [u8; POINT_LEN] {
    compress(&pedersen_commit(value, blinding))
}
