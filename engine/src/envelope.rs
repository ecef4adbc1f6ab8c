//! Amount envelope
//!
//! Canonical framing that binds a Sigma64 proof to its protocol context:
//!
//! ```text
//! "SCE1" || varbytes(header) || varbytes(core proof)
//!
//! header = varbytes(protocol tag)
//!       || varbytes(range bits, 1 byte)
//!       || varbytes(ephemeral public key, 33)
//!       || varbytes(generator H, 33)
//!       || varbytes(asset id, 0 or 32)
//!       || varbytes(output index, u32 LE)
//!       || varbytes(extra context)
//! ```
//!
//! `core_hash = hash256(core)` names the proof alone; `proof_hash =
//! hash256(envelope)` names the whole context and is anchored on-chain.

use std::io::{Cursor, Read};

use tracing::{debug, warn};

use crate::crypto::{generator_h_bytes, POINT_LEN};
use crate::encoding::{PushChainExt, ReadChainExt};
use crate::error::{Error, Result};
use crate::hash::hash256;
use crate::zk::{generate_proof, verify_proof, Sigma64Proof, RANGE_BITS};

/// Four-byte format tag
pub const ENVELOPE_MAGIC: [u8; 4] = *b"SCE1";

/// Protocol tag for confidential-asset envelopes
pub const DEFAULT_PROTOCOL_TAG: &[u8] = b"stealthcash/ca/v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub protocol_tag: Vec<u8>,
    pub range_bits: u8,
    pub ephemeral_pubkey: [u8; POINT_LEN],
    pub generator_h: [u8; POINT_LEN],
    pub asset_id: Option<[u8; 32]>,
    pub output_index: u32,
    pub extra: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedEnvelope {
    pub header: EnvelopeHeader,
    pub core: Vec<u8>,
}

/// Everything the sender needs from one envelope build
#[derive(Clone, Debug)]
pub struct AmountProofEnvelope {
    pub envelope: Vec<u8>,
    /// Compressed aggregate commitment, carried in the token commitment
    pub commitment: [u8; POINT_LEN],
    pub core_hash: [u8; 32],
    pub proof_hash: [u8; 32],
    pub proof: Sigma64Proof,
}

fn encode_header(header: &EnvelopeHeader) -> Vec<u8> {
    let asset_id: &[u8] = match &header.asset_id {
        Some(id) => id,
        None => &[],
    };
    let fields: [&[u8]; 7] = [
        &header.protocol_tag,
        &[header.range_bits],
        &header.ephemeral_pubkey,
        &header.generator_h,
        asset_id,
        &header.output_index.to_le_bytes(),
        &header.extra,
    ];
    let mut out = Vec::new();
    for field in fields {
        out.push_var_bytes(field);
    }
    out
}

/// Frame a header and core proof bytes
pub fn build_envelope(header: &EnvelopeHeader, core: &[u8]) -> Vec<u8> {
    let header = encode_header(header);
    let mut out = Vec::with_capacity(4 + 9 + header.len() + 9 + core.len());
    out.extend_from_slice(&ENVELOPE_MAGIC);
    out.push_var_bytes(&header);
    out.push_var_bytes(core);
    out
}

fn fixed<const N: usize>(field: Vec<u8>, what: &'static str) -> Result<[u8; N]> {
    let len = field.len();
    field.try_into().map_err(|_| Error::length(what, N, len))
}

fn ensure_consumed(cursor: &mut Cursor<&[u8]>, what: &'static str) -> Result<()> {
    let mut rest = [0u8; 1];
    match cursor.read(&mut rest) {
        Ok(0) => Ok(()),
        _ => Err(Error::TrailingBytes(what)),
    }
}

fn parse_header(bytes: &[u8]) -> Result<EnvelopeHeader> {
    let mut cursor = Cursor::new(bytes);
    let protocol_tag = cursor.read_var_bytes("protocol tag")?;
    let range_bits = fixed::<1>(cursor.read_var_bytes("range bits")?, "range bits")?[0];
    let ephemeral_pubkey = fixed(cursor.read_var_bytes("ephemeral key")?, "ephemeral key")?;
    let generator_h = fixed(cursor.read_var_bytes("generator H")?, "generator H")?;
    let asset_id = cursor.read_var_bytes("asset id")?;
    let asset_id = if asset_id.is_empty() {
        None
    } else {
        Some(fixed(asset_id, "asset id")?)
    };
    let output_index = u32::from_le_bytes(fixed(cursor.read_var_bytes("output index")?, "output index")?);
    let extra = cursor.read_var_bytes("extra context")?;
    ensure_consumed(&mut cursor, "envelope header")?;

    Ok(EnvelopeHeader {
        protocol_tag,
        range_bits,
        ephemeral_pubkey,
        generator_h,
        asset_id,
        output_index,
        extra,
    })
}

/// Exact inverse of [`build_envelope`]
pub fn parse_envelope(bytes: &[u8]) -> Result<ParsedEnvelope> {
    let mut cursor = Cursor::new(bytes);
    let magic = cursor.read_array::<4>("envelope magic")?;
    if magic != ENVELOPE_MAGIC {
        return Err(Error::BadMagic);
    }
    let header = cursor.read_var_bytes("envelope header")?;
    let core = cursor.read_var_bytes("envelope core")?;
    ensure_consumed(&mut cursor, "envelope")?;

    Ok(ParsedEnvelope {
        header: parse_header(&header)?,
        core,
    })
}

pub fn core_hash(core: &[u8]) -> [u8; 32] {
    hash256(core)
}

pub fn proof_hash(envelope: &[u8]) -> [u8; 32] {
    hash256(envelope)
}

/// Generate the proof for `value` and frame it in one call
pub fn build_amount_proof_envelope(
    value: u64,
    zk_seed: &[u8; 32],
    ephemeral_pubkey: &[u8; POINT_LEN],
    asset_id: Option<&[u8; 32]>,
    output_index: u32,
    extra: &[u8],
) -> AmountProofEnvelope {
    let proof = generate_proof(value, zk_seed);
    let core = proof.to_bytes();
    let header = EnvelopeHeader {
        protocol_tag: DEFAULT_PROTOCOL_TAG.to_vec(),
        range_bits: RANGE_BITS as u8,
        ephemeral_pubkey: *ephemeral_pubkey,
        generator_h: generator_h_bytes(),
        asset_id: asset_id.copied(),
        output_index,
        extra: extra.to_vec(),
    };
    let envelope = build_envelope(&header, &core);
    let core_hash = core_hash(&core);
    let proof_hash = proof_hash(&envelope);

    debug!(
        proof_hash = %hex::encode(proof_hash),
        core_hash = %hex::encode(core_hash),
        len = envelope.len(),
        "built amount envelope"
    );

    AmountProofEnvelope {
        envelope,
        commitment: proof.commitment,
        core_hash,
        proof_hash,
        proof,
    }
}

/// Parse and fully check an envelope
///
/// Requires a 64-bit range, the canonical `H`, a valid proof and, when
/// given, an aggregate commitment equal to `expected_commitment`.
pub fn verify_amount_proof_envelope(
    envelope: &[u8],
    expected_commitment: Option<&[u8; POINT_LEN]>,
) -> bool {
    let parsed = match parse_envelope(envelope) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(error = %err, "envelope rejected");
            return false;
        }
    };
    if parsed.header.range_bits as usize != RANGE_BITS {
        warn!(bits = parsed.header.range_bits, "unsupported range width");
        return false;
    }
    if parsed.header.generator_h != generator_h_bytes() {
        warn!("envelope uses a foreign generator H");
        return false;
    }
    let proof = match Sigma64Proof::from_bytes(&parsed.core) {
        Ok(proof) => proof,
        Err(err) => {
            warn!(error = %err, "envelope core is not a proof");
            return false;
        }
    };
    if let Some(expected) = expected_commitment {
        if &proof.commitment != expected {
            warn!("envelope commitment differs from the expected commitment");
            return false;
        }
    }
    verify_proof(&proof)
}

/// Verify an envelope against the proof hash a covenant anchors
///
/// Any change to the envelope bytes, header included, breaks the anchor.
pub fn verify_anchored_envelope(
    envelope: &[u8],
    anchor: &[u8; 32],
    expected_commitment: Option<&[u8; POINT_LEN]>,
) -> bool {
    if proof_hash(envelope) != *anchor {
        warn!(anchor = %hex::encode(anchor), "envelope does not match its anchor");
        return false;
    }
    verify_amount_proof_envelope(envelope, expected_commitment)
}
