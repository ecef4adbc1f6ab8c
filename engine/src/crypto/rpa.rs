//! RPA - Reusable Payment Address one-time key derivation
//!
//! ## Protocol Overview
//!
//! ### Receiver Setup
//! 1. Scan key pair: (s, S) where S = s·G
//! 2. Spend key pair: (b, B) where B = b·G
//! 3. Publish paycode: (S, B)
//!
//! ### Sender Flow
//! 1. Take the secret `a` of a funding input, A = a·G, and its outpoint `o`
//! 2. Shared secret: ss = H("rpa/ecdh", a·S)
//! 3. Session keys: k_label = H(label, ss, o) for session/amount/memo/zk-seed
//! 4. Offset: t = H_s("rpa/offset", k_session, mode, index)
//! 5. One-time public key: P = B + t·G, committed on-chain as hash160(P)
//!
//! ### Receiver Flow
//! 1. Read A and `o` from the funding transaction
//! 2. Shared secret: ss = H("rpa/ecdh", s·A) (same as sender)
//! 3. Same session keys and offset, private key p = b + t
//! 4. hash160(p·G) must equal the sender's committed hash
//!
//! Every function here is a pure transform of its inputs.

use k256::{ProjectivePoint, Scalar};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::keys::{Paycode, PaycodeKeys, SecretScalar};
use super::point::{compress, decompress, POINT_LEN};
use crate::error::{Error, Result};
use crate::hash::{hash160, hash_to_scalar, tagged};
use crate::tx::Outpoint;

const ECDH_LABEL: &[u8] = b"rpa/ecdh";
const SESSION_LABEL: &[u8] = b"rpa/session";
const AMOUNT_LABEL: &[u8] = b"rpa/amount";
const MEMO_LABEL: &[u8] = b"rpa/memo";
const ZK_SEED_LABEL: &[u8] = b"rpa/zk-seed";
const OFFSET_LABEL: &[u8] = b"rpa/offset";

/// What a derived one-time key is used for
///
/// The mode byte is part of the offset transcript, so the same session can
/// never produce the same key for two purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RpaMode {
    /// Plain pay-to-key-hash payment
    Payment = 0x00,
    /// Guard key of a covenant
    Guard = 0x01,
    /// Change returned to the sender's own paycode
    Change = 0x02,
}

impl TryFrom<u8> for RpaMode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(RpaMode::Payment),
            0x01 => Ok(RpaMode::Guard),
            0x02 => Ok(RpaMode::Change),
            other => Err(Error::UnknownMode(other)),
        }
    }
}

/// Per-(secret, outpoint) session values, recomputed on demand
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RpaSession {
    pub session_key: [u8; 32],
    pub amount_key: [u8; 32],
    pub memo_key: [u8; 32],
    pub zk_seed: [u8; 32],
}

impl std::fmt::Debug for RpaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpaSession").finish_non_exhaustive()
    }
}

/// Public derivation context the receiver needs to re-derive a key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpaContext {
    pub outpoint: Outpoint,
    pub index: u32,
    pub mode: RpaMode,
    pub sender_pubkey: [u8; POINT_LEN],
}

/// Sender-side result of a one-time key derivation
#[derive(Clone, Debug)]
pub struct LockIntent {
    pub child_pubkey: [u8; POINT_LEN],
    pub child_hash: [u8; 20],
    pub session: RpaSession,
    pub context: RpaContext,
}

/// Receiver-side result of a one-time key derivation
pub struct ReceivedKey {
    pub child_secret: SecretScalar,
    pub child_pubkey: [u8; POINT_LEN],
    pub child_hash: [u8; 20],
    pub session: RpaSession,
}

/// ECDH shared secret: `H("rpa/ecdh", scalar · point)`
pub fn shared_secret(scalar: &Scalar, point: &ProjectivePoint) -> [u8; 32] {
    let shared = compress(&(point * scalar));
    tagged(ECDH_LABEL, &[&shared])
}

/// Fan a shared secret out into independent session keys for one outpoint
pub fn derive_session_keys(shared_secret: &[u8; 32], outpoint: &Outpoint) -> RpaSession {
    let outpoint = outpoint.to_bytes();
    let derive = |label: &[u8]| tagged(label, &[shared_secret, &outpoint]);
    RpaSession {
        session_key: derive(SESSION_LABEL),
        amount_key: derive(AMOUNT_LABEL),
        memo_key: derive(MEMO_LABEL),
        zk_seed: derive(ZK_SEED_LABEL),
    }
}

/// Mode- and index-tagged offset; a zero reduction is remapped to one
fn derive_offset(session: &RpaSession, mode: RpaMode, index: u32) -> Scalar {
    let offset = hash_to_scalar(
        OFFSET_LABEL,
        &[&session.session_key, &[mode as u8], &index.to_le_bytes()],
    );
    if offset == Scalar::ZERO {
        Scalar::ONE
    } else {
        offset
    }
}

/// Sender side: derive the one-time public key and its hash
pub fn derive_lock_intent(
    sender_secret: &Scalar,
    receiver: &Paycode,
    outpoint: &Outpoint,
    index: u32,
    mode: RpaMode,
) -> Result<LockIntent> {
    if *sender_secret == Scalar::ZERO {
        return Err(Error::InvalidScalar);
    }
    let scan_point = decompress(receiver.scan_pubkey())?;
    let spend_point = decompress(receiver.spend_pubkey())?;

    let secret = shared_secret(sender_secret, &scan_point);
    let session = derive_session_keys(&secret, outpoint);
    let offset = derive_offset(&session, mode, index);

    let child = spend_point + ProjectivePoint::GENERATOR * offset;
    let child_pubkey = compress(&child);
    let child_hash = hash160(&child_pubkey);

    debug!(
        outpoint = %outpoint,
        index,
        ?mode,
        child_hash = %hex::encode(child_hash),
        "derived one-time key (sender)"
    );

    Ok(LockIntent {
        child_pubkey,
        child_hash,
        session,
        context: RpaContext {
            outpoint: *outpoint,
            index,
            mode,
            sender_pubkey: compress(&(ProjectivePoint::GENERATOR * sender_secret)),
        },
    })
}

/// Receiver side: derive the one-time private scalar `b + t`
pub fn derive_one_time_private_key(
    scan_secret: &Scalar,
    spend_secret: &Scalar,
    sender_pubkey: &[u8],
    outpoint: &Outpoint,
    index: u32,
    mode: RpaMode,
) -> Result<Scalar> {
    let (child, _) = receiver_child(scan_secret, spend_secret, sender_pubkey, outpoint, index, mode)?;
    Ok(child)
}

fn receiver_child(
    scan_secret: &Scalar,
    spend_secret: &Scalar,
    sender_pubkey: &[u8],
    outpoint: &Outpoint,
    index: u32,
    mode: RpaMode,
) -> Result<(Scalar, RpaSession)> {
    let sender_point = decompress(sender_pubkey)?;
    let secret = shared_secret(scan_secret, &sender_point);
    let session = derive_session_keys(&secret, outpoint);
    let offset = derive_offset(&session, mode, index);

    let child = spend_secret + &offset;
    if child == Scalar::ZERO {
        return Err(Error::InvalidScalar);
    }
    Ok((child, session))
}

/// Receiver side: derive the full one-time key for a context
pub fn derive_received_key(keys: &PaycodeKeys, context: &RpaContext) -> Result<ReceivedKey> {
    let (child, session) = receiver_child(
        &keys.scan_secret(),
        &keys.spend_secret(),
        &context.sender_pubkey,
        &context.outpoint,
        context.index,
        context.mode,
    )?;
    let child_secret = SecretScalar::from_scalar(&child)?;
    let child_pubkey = child_secret.public_key();
    let child_hash = hash160(&child_pubkey);

    debug!(
        outpoint = %context.outpoint,
        index = context.index,
        mode = ?context.mode,
        child_hash = %hex::encode(child_hash),
        "derived one-time key (receiver)"
    );

    Ok(ReceivedKey {
        child_secret,
        child_pubkey,
        child_hash,
        session,
    })
}

/// Receiver side: derive and require the sender's committed hash
///
/// A mismatch is a hard failure; the spend attempt must abort.
pub fn recover_one_time_key(
    keys: &PaycodeKeys,
    context: &RpaContext,
    expected_hash: &[u8; 20],
) -> Result<ReceivedKey> {
    let received = derive_received_key(keys, context)?;
    if !bool::from(received.child_hash.ct_eq(expected_hash)) {
        warn!(
            expected = %hex::encode(expected_hash),
            derived = %hex::encode(received.child_hash),
            "one-time key derivation mismatch"
        );
        return Err(Error::DerivationMismatch {
            expected: hex::encode(expected_hash),
            derived: hex::encode(received.child_hash),
        });
    }
    Ok(received)
}

/// View-only check: does `candidate_hash` belong to this paycode?
///
/// Needs only the scan secret and the spend public key.
pub fn check_payment(
    scan_secret: &Scalar,
    spend_pubkey: &[u8; POINT_LEN],
    context: &RpaContext,
    candidate_hash: &[u8; 20],
) -> bool {
    let Ok(sender_point) = decompress(&context.sender_pubkey) else {
        return false;
    };
    let Ok(spend_point) = decompress(spend_pubkey) else {
        return false;
    };
    let secret = shared_secret(scan_secret, &sender_point);
    let session = derive_session_keys(&secret, &context.outpoint);
    let offset = derive_offset(&session, context.mode, context.index);
    let child = compress(&(spend_point + ProjectivePoint::GENERATOR * offset));
    bool::from(hash160(&child).ct_eq(candidate_hash))
}
