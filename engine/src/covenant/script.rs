//! Covenant redeem scripts and standard locking scripts
//!
//! Redeem script layout:
//!
//! ```text
//! [0x20 <proof hash 32> OP_DROP]   optional anchor
//! 0x14 <guard hash 20>             one-time guard key hash
//! <template tail>                  externally supplied
//! ```
//!
//! The anchor is pushed and immediately dropped: it is committed to by the
//! script hash but takes no stack slot when the template runs.

use std::str::FromStr;

use tracing::debug;

use super::opcodes::OpCode;
use super::template::CovenantTemplate;
use crate::crypto::{decompress, POINT_LEN};
use crate::encoding::{
    decode_script_number, push_data, script_number, OP_0, OP_1, OP_1NEGATE, OP_PUSHDATA1,
    OP_PUSHDATA2, OP_PUSHDATA4,
};
use crate::error::{Error, Result};
use crate::hash::{hash160, hash256};

/// Length of a standard pay-to-key-hash locking script
pub const P2PKH_LEN: usize = 25;

/// Script-hash wrapping of the redeem script
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum P2shKind {
    /// `OP_HASH160 <hash160(redeem)> OP_EQUAL`
    P2sh20,
    /// `OP_HASH256 <hash256(redeem)> OP_EQUAL`
    #[default]
    P2sh32,
}

impl P2shKind {
    pub fn locking_script(&self, redeem_script: &[u8]) -> Vec<u8> {
        match self {
            P2shKind::P2sh20 => {
                let mut script = vec![OpCode::Hash160.into(), OpCode::Push20Bytes.into()];
                script.extend_from_slice(&hash160(redeem_script));
                script.push(OpCode::Equal.into());
                script
            }
            P2shKind::P2sh32 => {
                let mut script = vec![OpCode::Hash256.into(), OpCode::Push32Bytes.into()];
                script.extend_from_slice(&hash256(redeem_script));
                script.push(OpCode::Equal.into());
                script
            }
        }
    }
}

impl FromStr for P2shKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "p2sh20" => Ok(P2shKind::P2sh20),
            "p2sh32" => Ok(P2shKind::P2sh32),
            other => Err(Error::ValueOutOfRange(format!("unknown P2SH kind: {other}"))),
        }
    }
}

impl std::fmt::Display for P2shKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            P2shKind::P2sh20 => "p2sh20",
            P2shKind::P2sh32 => "p2sh32",
        })
    }
}

/// Guard key given either as its hash or as the public key itself
#[derive(Clone, Copy, Debug)]
pub enum GuardKey {
    Hash([u8; 20]),
    PublicKey([u8; POINT_LEN]),
}

impl GuardKey {
    pub fn hash(&self) -> Result<[u8; 20]> {
        match self {
            GuardKey::Hash(hash) => Ok(*hash),
            GuardKey::PublicKey(pubkey) => {
                decompress(pubkey)?;
                Ok(hash160(pubkey))
            }
        }
    }
}

/// A built covenant: redeem script and its locking script
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Covenant {
    pub guard_hash: [u8; 20],
    pub proof_hash: Option<[u8; 32]>,
    pub redeem_script: Vec<u8>,
    pub locking_script: Vec<u8>,
    pub kind: P2shKind,
}

/// Prepend the header to `template` and wrap the result
pub fn build_covenant(
    guard: GuardKey,
    proof_hash: Option<&[u8; 32]>,
    template: &CovenantTemplate,
    kind: P2shKind,
) -> Result<Covenant> {
    let guard_hash = guard.hash()?;

    let mut redeem_script = Vec::with_capacity(34 + 21 + template.as_bytes().len());
    if let Some(hash) = proof_hash {
        redeem_script.push(OpCode::Push32Bytes.into());
        redeem_script.extend_from_slice(hash);
        redeem_script.push(OpCode::Drop.into());
    }
    redeem_script.push(OpCode::Push20Bytes.into());
    redeem_script.extend_from_slice(&guard_hash);
    redeem_script.extend_from_slice(template.as_bytes());

    let locking_script = kind.locking_script(&redeem_script);
    debug!(
        guard_hash = %hex::encode(guard_hash),
        anchored = proof_hash.is_some(),
        redeem_len = redeem_script.len(),
        "built covenant"
    );

    Ok(Covenant {
        guard_hash,
        proof_hash: proof_hash.copied(),
        redeem_script,
        locking_script,
        kind,
    })
}

// ============================================================================
// Header Parsing
// ============================================================================

/// Parsed covenant header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CovenantHeader {
    pub proof_hash: Option<[u8; 32]>,
    pub guard_hash: [u8; 20],
    /// Offset of the template tail within the redeem script
    pub template_offset: usize,
}

enum HeaderState {
    Start,
    ExpectDrop([u8; 32]),
    Guard(Option<[u8; 32]>),
}

fn take<const N: usize>(script: &[u8], at: usize, what: &'static str) -> Result<[u8; N]> {
    script
        .get(at..at + N)
        .and_then(|slice| <[u8; N]>::try_from(slice).ok())
        .ok_or(Error::MalformedScript(what))
}

/// Parse the optional proof-hash anchor and the guard hash push
pub fn parse_covenant_header(redeem_script: &[u8]) -> Result<CovenantHeader> {
    let mut pos = 0usize;
    let mut state = HeaderState::Start;

    loop {
        let op = *redeem_script
            .get(pos)
            .ok_or(Error::MalformedScript("script ends inside covenant header"))?;

        state = match state {
            HeaderState::Start if op == OpCode::Push32Bytes as u8 => {
                let hash = take::<32>(redeem_script, pos + 1, "truncated proof hash push")?;
                pos += 1 + 32;
                HeaderState::ExpectDrop(hash)
            }
            HeaderState::Start if op == OpCode::Push20Bytes as u8 => HeaderState::Guard(None),
            HeaderState::Start => {
                return Err(Error::MalformedScript("expected proof hash or guard hash push"))
            }
            HeaderState::ExpectDrop(hash) if op == OpCode::Drop as u8 => {
                pos += 1;
                HeaderState::Guard(Some(hash))
            }
            HeaderState::ExpectDrop(_) => {
                return Err(Error::MalformedScript("proof hash not followed by OP_DROP"))
            }
            HeaderState::Guard(proof_hash) if op == OpCode::Push20Bytes as u8 => {
                let guard_hash = take::<20>(redeem_script, pos + 1, "truncated guard hash push")?;
                return Ok(CovenantHeader {
                    proof_hash,
                    guard_hash,
                    template_offset: pos + 1 + 20,
                });
            }
            HeaderState::Guard(_) => {
                return Err(Error::MalformedScript("expected 20-byte guard hash push"))
            }
        };
    }
}

/// The 20-byte guard hash of a covenant redeem script
pub fn extract_guard_hash(redeem_script: &[u8]) -> Result<[u8; 20]> {
    Ok(parse_covenant_header(redeem_script)?.guard_hash)
}

// ============================================================================
// Standard Scripts
// ============================================================================

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_LEN);
    script.push(OpCode::Dup.into());
    script.push(OpCode::Hash160.into());
    script.push(OpCode::Push20Bytes.into());
    script.extend_from_slice(hash);
    script.push(OpCode::EqualVerify.into());
    script.push(OpCode::CheckSig.into());
    script
}

/// Key hash of a pay-to-key-hash script, if it is one
pub fn p2pkh_hash(script: &[u8]) -> Option<[u8; 20]> {
    match script {
        [0x76, 0xa9, 0x14, hash @ .., 0x88, 0xac] if hash.len() == 20 => hash.try_into().ok(),
        _ => None,
    }
}

/// `push(sig || type) push(pubkey) push(amount) push(redeem)`
pub fn covenant_unlocking_script(
    sig_with_type: &[u8],
    pubkey: &[u8; POINT_LEN],
    amount: u64,
    redeem_script: &[u8],
) -> Result<Vec<u8>> {
    let amount = i64::try_from(amount)
        .map_err(|_| Error::ValueOutOfRange(format!("amount {amount} exceeds script number range")))?;
    let mut script = push_data(sig_with_type);
    script.extend_from_slice(&push_data(pubkey));
    script.extend_from_slice(&push_data(&script_number(amount)));
    script.extend_from_slice(&push_data(redeem_script));
    Ok(script)
}

/// Split a push-only script into its pushed items
pub fn parse_pushes(script: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut items = Vec::new();
    let mut pos = 0usize;
    while pos < script.len() {
        let op = script[pos];
        pos += 1;
        let len = match op {
            OP_0 => 0,
            0x01..=0x4b => op as usize,
            OP_PUSHDATA1 => {
                let len = take::<1>(script, pos, "truncated push length")?;
                pos += 1;
                len[0] as usize
            }
            OP_PUSHDATA2 => {
                let len = take::<2>(script, pos, "truncated push length")?;
                pos += 2;
                u16::from_le_bytes(len) as usize
            }
            OP_PUSHDATA4 => {
                let len = take::<4>(script, pos, "truncated push length")?;
                pos += 4;
                u32::from_le_bytes(len) as usize
            }
            OP_1NEGATE => {
                items.push(vec![0x81]);
                continue;
            }
            n if (OP_1..=OP_1 + 15).contains(&n) => {
                items.push(vec![n - OP_1 + 1]);
                continue;
            }
            _ => return Err(Error::MalformedScript("non-push opcode in push-only script")),
        };
        let data = script
            .get(pos..pos + len)
            .ok_or(Error::MalformedScript("push runs past end of script"))?;
        items.push(data.to_vec());
        pos += len;
    }
    Ok(items)
}

/// Last item pushed by a push-only script
pub fn last_push(script: &[u8]) -> Result<Vec<u8>> {
    parse_pushes(script)?
        .pop()
        .ok_or(Error::MalformedScript("empty unlocking script"))
}

/// Parsed covenant unlocking script
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CovenantWitness {
    pub signature: Vec<u8>,
    pub pubkey: Vec<u8>,
    pub amount: u64,
    pub redeem_script: Vec<u8>,
}

pub fn parse_covenant_unlocking(script: &[u8]) -> Result<CovenantWitness> {
    let items = parse_pushes(script)?;
    let [signature, pubkey, amount, redeem_script]: [Vec<u8>; 4] = items
        .try_into()
        .map_err(|_| Error::MalformedScript("covenant unlocking needs four pushes"))?;
    let amount = u64::try_from(decode_script_number(&amount)?)
        .map_err(|_| Error::ValueOutOfRange("negative unlock amount".into()))?;
    Ok(CovenantWitness {
        signature,
        pubkey,
        amount,
        redeem_script,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_from_scalar;
    use crate::hash::hash_to_scalar;

    fn template() -> CovenantTemplate {
        CovenantTemplate::reference()
    }

    #[test]
    fn test_header_with_anchor() {
        let proof_hash = [0xab; 32];
        let covenant =
            build_covenant(GuardKey::Hash([0x11; 20]), Some(&proof_hash), &template(), P2shKind::P2sh32)
                .unwrap();

        assert_eq!(covenant.redeem_script[0], 0x20);
        assert_eq!(covenant.redeem_script[33], 0x75);
        assert_eq!(covenant.redeem_script[34], 0x14);

        let header = parse_covenant_header(&covenant.redeem_script).unwrap();
        assert_eq!(header.proof_hash, Some(proof_hash));
        assert_eq!(header.guard_hash, [0x11; 20]);
        assert_eq!(&covenant.redeem_script[header.template_offset..], template().as_bytes());
    }

    #[test]
    fn test_header_without_anchor() {
        let covenant =
            build_covenant(GuardKey::Hash([0x22; 20]), None, &template(), P2shKind::P2sh20).unwrap();
        assert_eq!(covenant.redeem_script[0], 0x14);
        assert_eq!(extract_guard_hash(&covenant.redeem_script).unwrap(), [0x22; 20]);
        assert_eq!(covenant.locking_script.len(), 23);
        assert_eq!(covenant.locking_script[0], 0xa9);
        assert_eq!(covenant.locking_script[22], 0x87);
    }

    #[test]
    fn test_p2sh32_locking_script() {
        let script = P2shKind::P2sh32.locking_script(&[0x51]);
        assert_eq!(script.len(), 35);
        assert_eq!(&script[..2], &[0xaa, 0x20]);
        assert_eq!(&script[2..34], &hash256(&[0x51]));
        assert_eq!(script[34], 0x87);
    }

    #[test]
    fn test_guard_from_public_key() {
        let pubkey = public_from_scalar(&hash_to_scalar(b"test", &[b"guard"]));
        assert_eq!(GuardKey::PublicKey(pubkey).hash().unwrap(), hash160(&pubkey));
        assert!(GuardKey::PublicKey([0x05; 33]).hash().is_err());
    }

    #[test]
    fn test_malformed_headers_rejected() {
        // wrong leading push
        assert!(extract_guard_hash(&[0x15; 40]).is_err());
        // anchor without drop
        let mut no_drop = vec![0x20];
        no_drop.extend_from_slice(&[0; 32]);
        no_drop.push(0x14);
        no_drop.extend_from_slice(&[0; 20]);
        assert!(extract_guard_hash(&no_drop).is_err());
        // truncated guard
        let mut short = vec![0x14];
        short.extend_from_slice(&[0; 19]);
        assert!(extract_guard_hash(&short).is_err());
        assert!(extract_guard_hash(&[]).is_err());
    }

    #[test]
    fn test_p2pkh_roundtrip() {
        let script = p2pkh_script(&[0x33; 20]);
        assert_eq!(script.len(), P2PKH_LEN);
        assert_eq!(p2pkh_hash(&script), Some([0x33; 20]));
        assert_eq!(p2pkh_hash(&script[..24]), None);
    }

    #[test]
    fn test_unlocking_script_parses_back() {
        let pubkey = public_from_scalar(&hash_to_scalar(b"test", &[b"k"]));
        let redeem = vec![0x14; 120];
        let script = covenant_unlocking_script(&[0x01; 65], &pubkey, 100_000, &redeem).unwrap();

        let witness = parse_covenant_unlocking(&script).unwrap();
        assert_eq!(witness.signature, vec![0x01; 65]);
        assert_eq!(witness.pubkey, pubkey.to_vec());
        assert_eq!(witness.amount, 100_000);
        assert_eq!(witness.redeem_script, redeem);
        assert_eq!(last_push(&script).unwrap(), redeem);
    }

    #[test]
    fn test_parse_pushes_rejects_non_push() {
        assert!(parse_pushes(&[0x76]).is_err());
        assert!(parse_pushes(&[0x05, 0x01]).is_err());
        assert_eq!(parse_pushes(&[0x00, 0x52]).unwrap(), vec![vec![], vec![2]]);
    }
}
