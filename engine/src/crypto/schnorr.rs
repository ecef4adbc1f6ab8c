//! Schnorr signatures in the chain's 64-byte form
//!
//! `sig = R.x || s` with `e = sha256(R.x || P || m)` and `s = k + e·d`,
//! where `P` is the 33-byte compressed public key. The nonce point must have
//! a quadratic-residue `y`; the signer negates `k` otherwise. Nonces are
//! derived from the secret and the message, so signing is deterministic.

use k256::{
    elliptic_curve::{group::Group, point::AffineCoordinates, sec1::ToEncodedPoint},
    AffinePoint, FieldBytes, FieldElement, ProjectivePoint, Scalar,
};
use sha2::{Digest, Sha256};

use super::point::{compress, decompress, parse_scalar, scalar_bytes, POINT_LEN};
use crate::error::{Error, Result};
use crate::hash::{hash_to_scalar, scalar_from_digest};

/// Size of an encoded signature (without sighash type byte)
pub const SIGNATURE_LEN: usize = 64;

const NONCE_LABEL: &[u8] = b"schnorr/nonce";

fn has_square_y(point: &AffinePoint) -> bool {
    let encoded = point.to_encoded_point(false);
    let Some(y) = encoded.y() else {
        return false;
    };
    let y = FieldElement::from_bytes(y);
    bool::from(y.and_then(|y| y.sqrt()).is_some())
}

fn challenge(r_x: &[u8], pubkey: &[u8; POINT_LEN], msg: &[u8; 32]) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(r_x);
    hasher.update(pubkey);
    hasher.update(msg);
    scalar_from_digest(hasher.finalize().into())
}

/// Sign a 32-byte message hash
pub fn sign(secret: &Scalar, msg: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN]> {
    if *secret == Scalar::ZERO {
        return Err(Error::InvalidScalar);
    }
    let pubkey = compress(&(ProjectivePoint::GENERATOR * secret));

    let mut k = hash_to_scalar(NONCE_LABEL, &[&scalar_bytes(secret), msg, &pubkey]);
    if k == Scalar::ZERO {
        return Err(Error::InvalidScalar);
    }
    let r = (ProjectivePoint::GENERATOR * k).to_affine();
    if !has_square_y(&r) {
        k = -k;
    }
    let r_x: FieldBytes = r.x();

    let e = challenge(&r_x, &pubkey, msg);
    let s = k + e * secret;

    let mut sig = [0u8; SIGNATURE_LEN];
    sig[..32].copy_from_slice(&r_x);
    sig[32..].copy_from_slice(&scalar_bytes(&s));
    Ok(sig)
}

/// Verify a signature against a compressed public key
///
/// Malformed keys or signatures verify as `false`.
pub fn verify(pubkey: &[u8], msg: &[u8; 32], sig: &[u8]) -> bool {
    if sig.len() != SIGNATURE_LEN {
        return false;
    }
    let Ok(point) = decompress(pubkey) else {
        return false;
    };
    let Ok(pubkey) = <[u8; POINT_LEN]>::try_from(pubkey) else {
        return false;
    };
    let (r_x, s) = sig.split_at(32);
    // r must be a field element, s a canonical scalar
    if bool::from(FieldElement::from_bytes(FieldBytes::from_slice(r_x)).is_none()) {
        return false;
    }
    let Ok(s) = parse_scalar(s) else {
        return false;
    };

    let e = challenge(r_x, &pubkey, msg);
    let r = ProjectivePoint::GENERATOR * s - point * e;
    if bool::from(r.is_identity()) {
        return false;
    }
    let r = r.to_affine();
    has_square_y(&r) && r.x().as_slice() == r_x
}
