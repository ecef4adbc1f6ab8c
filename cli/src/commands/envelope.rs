//! Parse and verify an amount envelope

use anyhow::{bail, Result};
use colored::Colorize;
use serde::Serialize;
use stealthcash::envelope::{core_hash, proof_hash};
use stealthcash::zk::Sigma64Proof;
use stealthcash::{parse_envelope, verify_amount_proof_envelope, verify_anchored_envelope};

use super::decode_hex_array;

#[derive(Debug, Serialize)]
pub struct EnvelopeReport {
    pub protocol_tag: String,
    pub range_bits: u8,
    pub ephemeral_pubkey: String,
    pub asset_id: Option<String>,
    pub output_index: u32,
    pub extra_len: usize,
    pub commitment: Option<String>,
    pub core_hash: String,
    pub proof_hash: String,
    pub valid: bool,
}

/// Inspect `bytes`; `valid` reflects the full proof check and, when given, the anchor
pub fn inspect(
    bytes: &[u8],
    expected_commitment: Option<&[u8; 33]>,
    anchor: Option<&[u8; 32]>,
) -> Result<EnvelopeReport> {
    let parsed = parse_envelope(bytes)?;
    let commitment = Sigma64Proof::from_bytes(&parsed.core)
        .ok()
        .map(|proof| hex::encode(proof.commitment));

    Ok(EnvelopeReport {
        protocol_tag: String::from_utf8_lossy(&parsed.header.protocol_tag).into_owned(),
        range_bits: parsed.header.range_bits,
        ephemeral_pubkey: hex::encode(parsed.header.ephemeral_pubkey),
        asset_id: parsed.header.asset_id.map(hex::encode),
        output_index: parsed.header.output_index,
        extra_len: parsed.header.extra.len(),
        commitment,
        core_hash: hex::encode(core_hash(&parsed.core)),
        proof_hash: hex::encode(proof_hash(bytes)),
        valid: match anchor {
            Some(anchor) => verify_anchored_envelope(bytes, anchor, expected_commitment),
            None => verify_amount_proof_envelope(bytes, expected_commitment),
        },
    })
}

pub fn run(
    envelope_hex: &str,
    commitment_hex: Option<&str>,
    proof_hash_hex: Option<&str>,
) -> Result<()> {
    let bytes = super::decode_hex("envelope", envelope_hex)?;
    let expected = commitment_hex
        .map(|text| decode_hex_array::<33>("commitment", text))
        .transpose()?;
    let anchor = proof_hash_hex
        .map(|text| decode_hex_array::<32>("proof hash", text))
        .transpose()?;
    let report = inspect(&bytes, expected.as_ref(), anchor.as_ref())?;

    println!();
    println!("{}", "Amount Envelope".yellow().bold());
    println!();
    println!("  Protocol:     {}", report.protocol_tag);
    println!("  Range bits:   {}", report.range_bits);
    println!("  Ephemeral:    {}", report.ephemeral_pubkey);
    println!(
        "  Asset:        {}",
        report.asset_id.as_deref().unwrap_or("(none)")
    );
    println!("  Output index: {}", report.output_index);
    println!("  Extra:        {} bytes", report.extra_len);
    println!(
        "  Commitment:   {}",
        report.commitment.as_deref().unwrap_or("(unreadable)")
    );
    println!("  Core hash:    {}", report.core_hash);
    println!("  Proof hash:   {}", report.proof_hash);
    println!();

    if !report.valid {
        bail!("Envelope does NOT verify");
    }
    println!("{}", "Envelope verifies".green().bold());
    Ok(())
}
