//! Encrypted amount and memo announcement
//!
//! The receiver needs the plain amount to regenerate the range proof. The
//! sender publishes it encrypted under the session's amount key in an
//! `OP_RETURN` output:
//!
//! `OP_RETURN push("SCA1") push(amount ^ stream, 8) push(memo ^ stream)`
//!
//! The keystream is `tagged("sca/stream", key, counter u32 LE)` blocks.

use crate::covenant::{parse_pushes, OpCode};
use crate::crypto::RpaSession;
use crate::encoding::push_data;
use crate::error::{Error, Result};
use crate::hash::tagged;

pub const ANNOUNCEMENT_TAG: &[u8; 4] = b"SCA1";

/// Largest memo that keeps the output within standard data-carrier size
pub const MAX_MEMO_LEN: usize = 180;

const STREAM_LABEL: &[u8] = b"sca/stream";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub encrypted_amount: [u8; 8],
    pub encrypted_memo: Vec<u8>,
}

fn apply_keystream(key: &[u8; 32], data: &mut [u8]) {
    for (counter, chunk) in data.chunks_mut(32).enumerate() {
        let block = tagged(STREAM_LABEL, &[key, &(counter as u32).to_le_bytes()]);
        for (byte, pad) in chunk.iter_mut().zip(block) {
            *byte ^= pad;
        }
    }
}

impl Announcement {
    /// Encrypt `amount` and `memo` under the session keys
    pub fn seal(session: &RpaSession, amount: u64, memo: &[u8]) -> Result<Self> {
        if memo.len() > MAX_MEMO_LEN {
            return Err(Error::ValueOutOfRange(format!(
                "memo is {} bytes, limit is {MAX_MEMO_LEN}",
                memo.len()
            )));
        }
        let mut encrypted_amount = amount.to_le_bytes();
        apply_keystream(&session.amount_key, &mut encrypted_amount);
        let mut encrypted_memo = memo.to_vec();
        apply_keystream(&session.memo_key, &mut encrypted_memo);
        Ok(Self {
            encrypted_amount,
            encrypted_memo,
        })
    }

    /// Decrypt with the receiver's re-derived session keys
    pub fn open(&self, session: &RpaSession) -> (u64, Vec<u8>) {
        let mut amount = self.encrypted_amount;
        apply_keystream(&session.amount_key, &mut amount);
        let mut memo = self.encrypted_memo.clone();
        apply_keystream(&session.memo_key, &mut memo);
        (u64::from_le_bytes(amount), memo)
    }

    /// Serialized form, also used as the envelope's extra context
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 8 + self.encrypted_memo.len());
        out.extend_from_slice(ANNOUNCEMENT_TAG);
        out.extend_from_slice(&self.encrypted_amount);
        out.extend_from_slice(&self.encrypted_memo);
        out
    }

    pub fn to_script(&self) -> Vec<u8> {
        let mut script = vec![OpCode::Return.into()];
        script.extend_from_slice(&push_data(ANNOUNCEMENT_TAG));
        script.extend_from_slice(&push_data(&self.encrypted_amount));
        script.extend_from_slice(&push_data(&self.encrypted_memo));
        script
    }

    pub fn from_script(script: &[u8]) -> Result<Self> {
        let body = match script.split_first() {
            Some((&op, body)) if op == OpCode::Return as u8 => body,
            _ => return Err(Error::MalformedScript("announcement must start with OP_RETURN")),
        };
        let items = parse_pushes(body)?;
        let [tag, amount, memo]: [Vec<u8>; 3] = items
            .try_into()
            .map_err(|_| Error::MalformedScript("announcement needs three pushes"))?;
        if tag != ANNOUNCEMENT_TAG {
            return Err(Error::MalformedScript("unknown announcement tag"));
        }
        let len = amount.len();
        let encrypted_amount = amount
            .try_into()
            .map_err(|_| Error::length("encrypted amount", 8, len))?;
        Ok(Self {
            encrypted_amount,
            encrypted_memo: memo,
        })
    }

    /// First announcement among a transaction's outputs
    pub fn find(outputs: &[crate::tx::TxOutput]) -> Result<Self> {
        outputs
            .iter()
            .filter(|output| output.is_op_return())
            .find_map(|output| Self::from_script(&output.locking_script).ok())
            .ok_or(Error::MalformedScript("no announcement output"))
    }
}
