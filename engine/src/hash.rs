//! Hash primitives shared by every layer
//!
//! - `sha256` / `hash256` (double SHA-256, the chain's txid hash)
//! - `hash160` (RIPEMD-160 over SHA-256, used for key and script hashes)
//! - `tagged` domain-separated hashing and hash-to-scalar reduction

use std::io;

use k256::{elliptic_curve::ops::Reduce, FieldBytes, Scalar, U256};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256
pub fn hash256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// RIPEMD-160(SHA-256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Domain-separated SHA-256
///
/// `sha256(len(label) || label || parts[0] || parts[1] || ...)`
///
/// Labels are protocol constants and always shorter than 256 bytes.
pub fn tagged(label: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([label.len() as u8]);
    hasher.update(label);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Reduce a 32-byte digest modulo the curve order
pub fn scalar_from_digest(digest: [u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(digest))
}

/// `tagged` followed by reduction mod n
pub fn hash_to_scalar(label: &[u8], parts: &[&[u8]]) -> Scalar {
    scalar_from_digest(tagged(label, parts))
}

/// A writer that produces a double SHA-256 over everything written to it.
#[derive(Default)]
pub struct Hash256Writer {
    hash: Sha256,
}

impl Hash256Writer {
    pub fn update(&mut self, data: &[u8]) {
        self.hash.update(data);
    }

    /// Consume the writer and produce the hash result.
    pub fn finish(self) -> [u8; 32] {
        let first = self.hash.finalize();
        Sha256::digest(first).into()
    }
}

impl io::Write for Hash256Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
