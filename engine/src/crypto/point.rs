//! Point and scalar encodings for secp256k1
//!
//! Points travel as 33-byte SEC1 compressed encodings, scalars as 32-byte
//! big-endian integers that must be below the curve order.

use k256::{
    elliptic_curve::{group::Group, sec1::ToEncodedPoint, PrimeField},
    FieldBytes, ProjectivePoint, PublicKey, Scalar,
};

use crate::error::{Error, Result};

/// Size of a compressed point
pub const POINT_LEN: usize = 33;

/// Size of an encoded scalar
pub const SCALAR_LEN: usize = 32;

/// Compress a point to 33 bytes.
///
/// The identity has no compressed form; it is written as 33 zero bytes,
/// which every decoder in this crate rejects.
pub fn compress(point: &ProjectivePoint) -> [u8; POINT_LEN] {
    let mut out = [0u8; POINT_LEN];
    if bool::from(point.is_identity()) {
        return out;
    }
    let encoded = point.to_affine().to_encoded_point(true);
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// Decompress a 33-byte point, rejecting the identity and off-curve encodings
pub fn decompress(bytes: &[u8]) -> Result<ProjectivePoint> {
    if bytes.len() != POINT_LEN {
        return Err(Error::length("compressed point", POINT_LEN, bytes.len()));
    }
    if bytes[0] != 0x02 && bytes[0] != 0x03 {
        return Err(Error::InvalidPublicKey);
    }
    let key = PublicKey::from_sec1_bytes(bytes).map_err(|_| Error::InvalidPublicKey)?;
    Ok(key.to_projective())
}

/// Parse a canonical scalar (zero allowed)
pub fn parse_scalar(bytes: &[u8]) -> Result<Scalar> {
    let array: [u8; SCALAR_LEN] = bytes
        .try_into()
        .map_err(|_| Error::length("scalar", SCALAR_LEN, bytes.len()))?;
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(array))).ok_or(Error::InvalidScalar)
}

/// Parse a secret key scalar: canonical and non-zero
pub fn parse_secret(bytes: &[u8]) -> Result<Scalar> {
    let scalar = parse_scalar(bytes)?;
    if scalar == Scalar::ZERO {
        return Err(Error::InvalidScalar);
    }
    Ok(scalar)
}

pub fn scalar_bytes(scalar: &Scalar) -> [u8; SCALAR_LEN] {
    scalar.to_bytes().into()
}

/// `scalar · G`, compressed
pub fn public_from_scalar(scalar: &Scalar) -> [u8; POINT_LEN] {
    compress(&(ProjectivePoint::GENERATOR * scalar))
}
