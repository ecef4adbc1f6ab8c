//! Input signing
//!
//! Every signature is verified locally before it is handed back, so a bad
//! signature never reaches a broadcast.

use k256::Scalar;
use tracing::{debug, warn};

use super::sighash::{signature_hash, SIGHASH_ALL_FORKID};
use super::types::{Transaction, TxOutput};
use crate::crypto::{public_from_scalar, schnorr, POINT_LEN};
use crate::encoding::push_data;
use crate::error::{Error, Result};

/// Sign `input_index` and return `signature || sighash type`
pub fn sign_input(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    spent: &TxOutput,
    secret: &Scalar,
) -> Result<Vec<u8>> {
    let digest = signature_hash(tx, input_index, script_code, spent, SIGHASH_ALL_FORKID)?;
    let sig = schnorr::sign(secret, &digest)?;

    let pubkey = public_from_scalar(secret);
    if !schnorr::verify(&pubkey, &digest, &sig) {
        warn!(input_index, "signature failed local verification");
        return Err(Error::SignatureInvalid);
    }
    debug!(input_index, sighash = %hex::encode(digest), "signed input");

    let mut out = sig.to_vec();
    out.push(SIGHASH_ALL_FORKID as u8);
    Ok(out)
}

/// Check a `signature || sighash type` blob against an input
pub fn verify_input(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    spent: &TxOutput,
    pubkey: &[u8; POINT_LEN],
    sig_with_type: &[u8],
) -> Result<bool> {
    let Some((&sighash_type, sig)) = sig_with_type.split_last() else {
        return Ok(false);
    };
    if u32::from(sighash_type) != SIGHASH_ALL_FORKID {
        return Ok(false);
    }
    let digest = signature_hash(tx, input_index, script_code, spent, SIGHASH_ALL_FORKID)?;
    Ok(schnorr::verify(pubkey, &digest, sig))
}

/// `push(sig) push(pubkey)`
pub fn p2pkh_unlocking_script(sig_with_type: &[u8], pubkey: &[u8; POINT_LEN]) -> Vec<u8> {
    let mut script = push_data(sig_with_type);
    script.extend_from_slice(&push_data(pubkey));
    script
}

/// Sign a pay-to-key-hash input in place
pub fn sign_p2pkh_input(
    tx: &mut Transaction,
    input_index: usize,
    spent: &TxOutput,
    secret: &Scalar,
) -> Result<()> {
    let sig = sign_input(tx, input_index, &spent.locking_script, spent, secret)?;
    let pubkey = public_from_scalar(secret);
    let script = p2pkh_unlocking_script(&sig, &pubkey);
    let count = tx.inputs.len();
    let input = tx
        .inputs
        .get_mut(input_index)
        .ok_or(Error::InputIndexOutOfRange {
            index: input_index,
            count,
        })?;
    input.unlocking_script = script;
    Ok(())
}
