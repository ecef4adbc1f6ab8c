//! Signature hash preimage (`SIGHASH_ALL | FORKID`)
//!
//! ```text
//! version        u32 LE
//! hashPrevouts   hash256(all input outpoints)
//! hashSequence   hash256(all input sequences)
//! outpoint       this input's txid || vout
//! token prefix   spent output's token prefix (empty if none)
//! scriptCode     varbytes
//! value          spent output value, u64 LE
//! sequence       this input's sequence, u32 LE
//! hashOutputs    hash256(all serialized outputs)
//! locktime       u32 LE
//! sighash type   u32 LE
//! ```
//!
//! The signed digest is hash256 of the preimage.

use super::token::token_prefix;
use super::types::{Transaction, TxOutput};
use crate::encoding::compactsize;
use crate::error::{Error, Result};
use crate::hash::{hash256, Hash256Writer};

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_FORKID: u32 = 0x40;

/// The only signature hash type this crate produces
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

fn hash_prevouts(tx: &Transaction) -> [u8; 32] {
    let mut writer = Hash256Writer::default();
    for input in &tx.inputs {
        writer.update(&input.outpoint.to_bytes());
    }
    writer.finish()
}

fn hash_sequence(tx: &Transaction) -> [u8; 32] {
    let mut writer = Hash256Writer::default();
    for input in &tx.inputs {
        writer.update(&input.sequence.to_le_bytes());
    }
    writer.finish()
}

fn hash_outputs(tx: &Transaction) -> Result<[u8; 32]> {
    let mut writer = Hash256Writer::default();
    for output in &tx.outputs {
        writer.update(&output.serialize()?);
    }
    Ok(writer.finish())
}

/// Build the preimage for `input_index` spending `spent`
pub fn sighash_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    spent: &TxOutput,
    sighash_type: u32,
) -> Result<Vec<u8>> {
    let input = tx.inputs.get(input_index).ok_or(Error::InputIndexOutOfRange {
        index: input_index,
        count: tx.inputs.len(),
    })?;

    let mut preimage = Vec::with_capacity(4 + 32 + 32 + 36 + 80 + script_code.len() + 8 + 4 + 32 + 8);
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&hash_prevouts(tx));
    preimage.extend_from_slice(&hash_sequence(tx));
    preimage.extend_from_slice(&input.outpoint.to_bytes());
    preimage.extend_from_slice(&token_prefix(spent.token.as_ref())?);
    preimage.extend_from_slice(&compactsize(script_code.len() as u64));
    preimage.extend_from_slice(script_code);
    preimage.extend_from_slice(&spent.value.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash_outputs(tx)?);
    preimage.extend_from_slice(&tx.locktime.to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());
    Ok(preimage)
}

/// hash256 of [`sighash_preimage`]
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    spent: &TxOutput,
    sighash_type: u32,
) -> Result<[u8; 32]> {
    Ok(hash256(&sighash_preimage(
        tx,
        input_index,
        script_code,
        spent,
        sighash_type,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::token::{Capability, TokenData};
    use crate::tx::{Outpoint, TxInput};

    fn two_input_tx() -> Transaction {
        Transaction {
            inputs: vec![
                TxInput::new(Outpoint::new([1; 32], 0)),
                TxInput::new(Outpoint::new([2; 32], 3)),
            ],
            outputs: vec![TxOutput::new(1_000, vec![0x51])],
            ..Transaction::default()
        }
    }

    #[test]
    fn test_preimage_layout() {
        let tx = two_input_tx();
        let spent = TxOutput::new(5_000, vec![0x51]);
        let preimage = sighash_preimage(&tx, 1, &[0xac], &spent, SIGHASH_ALL_FORKID).unwrap();

        assert_eq!(&preimage[..4], &2u32.to_le_bytes());
        assert_eq!(&preimage[68..104], &Outpoint::new([2; 32], 3).to_bytes());
        // no token: compact size then script code follows the outpoint
        assert_eq!(&preimage[104..106], &[0x01, 0xac]);
        assert_eq!(&preimage[106..114], &5_000u64.to_le_bytes());
        assert_eq!(&preimage[preimage.len() - 4..], &[0x41, 0, 0, 0]);
        assert_eq!(preimage.len(), 4 + 32 + 32 + 36 + 2 + 8 + 4 + 32 + 4 + 4);
    }

    #[test]
    fn test_spent_token_is_committed() {
        let tx = two_input_tx();
        let plain = TxOutput::new(5_000, vec![0x51]);
        let tokened = plain.clone().with_token(TokenData::nft(
            [9; 32],
            Capability::Mutable,
            vec![1, 2, 3],
        ));
        let a = signature_hash(&tx, 0, &[0xac], &plain, SIGHASH_ALL_FORKID).unwrap();
        let b = signature_hash(&tx, 0, &[0xac], &tokened, SIGHASH_ALL_FORKID).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_outputs_and_index_are_committed() {
        let tx = two_input_tx();
        let spent = TxOutput::new(5_000, vec![0x51]);
        let base = signature_hash(&tx, 0, &[0xac], &spent, SIGHASH_ALL_FORKID).unwrap();

        let mut changed = tx.clone();
        changed.outputs[0].value += 1;
        assert_ne!(
            base,
            signature_hash(&changed, 0, &[0xac], &spent, SIGHASH_ALL_FORKID).unwrap()
        );
        assert_ne!(
            base,
            signature_hash(&tx, 1, &[0xac], &spent, SIGHASH_ALL_FORKID).unwrap()
        );
        assert!(matches!(
            signature_hash(&tx, 2, &[0xac], &spent, SIGHASH_ALL_FORKID),
            Err(Error::InputIndexOutOfRange { index: 2, count: 2 })
        ));
    }
}
