//! CLI subcommands

pub mod config;
pub mod covenant;
pub mod demo;
pub mod envelope;
pub mod keygen;
pub mod paycode;

use anyhow::{bail, Context, Result};

/// Decode a fixed-length hex argument
pub fn decode_hex_array<const N: usize>(what: &str, text: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(text.trim()).with_context(|| format!("{what} is not valid hex"))?;
    match bytes.try_into() {
        Ok(array) => Ok(array),
        Err(bytes) => bail!("{what} must be {N} bytes, got {}", bytes.len()),
    }
}

/// Decode a variable-length hex argument, tolerating whitespace and a 0x prefix
pub fn decode_hex(what: &str, text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(body).with_context(|| format!("{what} is not valid hex"))
}
