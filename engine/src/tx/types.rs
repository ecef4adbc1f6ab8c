//! Transaction model and canonical serialization

use std::fmt;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use super::token::{split_token_prefix, token_prefix, TokenData};
use crate::encoding::{compactsize, ReadChainExt};
use crate::error::{Error, Result};
use crate::hash::hash256;

/// Default input sequence (final, no relative locktime)
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

pub const TX_VERSION: u32 = 2;

/// Reference to a transaction output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Outpoint {
    /// Transaction id in internal byte order
    pub txid: [u8; 32],
    pub vout: u32,
}

impl Outpoint {
    pub const SIZE: usize = 36;

    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        Self { txid, vout }
    }

    /// `txid || vout (u32 LE)`
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..32].copy_from_slice(&self.txid);
        out[32..].copy_from_slice(&self.vout.to_le_bytes());
        out
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", txid_hex(&self.txid), self.vout)
    }
}

/// Display form of a txid (byte-reversed hex)
pub fn txid_hex(txid: &[u8; 32]) -> String {
    let mut reversed = *txid;
    reversed.reverse();
    hex::encode(reversed)
}

/// Parse a displayed txid back into internal byte order
pub fn parse_txid_hex(text: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(text).map_err(|e| Error::ValueOutOfRange(format!("txid hex: {e}")))?;
    let mut txid: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::length("txid", 32, bytes.len()))?;
    txid.reverse();
    Ok(txid)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub outpoint: Outpoint,
    pub unlocking_script: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    /// Unsigned input spending `outpoint`
    pub fn new(outpoint: Outpoint) -> Self {
        Self {
            outpoint,
            unlocking_script: Vec::new(),
            sequence: SEQUENCE_FINAL,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub token: Option<TokenData>,
    pub locking_script: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, locking_script: Vec<u8>) -> Self {
        Self {
            value,
            token: None,
            locking_script,
        }
    }

    pub fn with_token(mut self, token: TokenData) -> Self {
        self.token = Some(token);
        self
    }

    /// The on-chain script field: token prefix followed by locking bytecode
    pub fn script_field(&self) -> Result<Vec<u8>> {
        let mut field = token_prefix(self.token.as_ref())?;
        field.extend_from_slice(&self.locking_script);
        Ok(field)
    }

    /// `value (u64 LE) || varbytes(script field)`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let field = self.script_field()?;
        let mut out = Vec::with_capacity(8 + 9 + field.len());
        out.extend_from_slice(&self.value.to_le_bytes());
        out.extend_from_slice(&compactsize(field.len() as u64));
        out.extend_from_slice(&field);
        Ok(out)
    }

    /// Whether the output is a provably unspendable data carrier
    pub fn is_op_return(&self) -> bool {
        self.locking_script.first() == Some(&0x6a)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            locktime: 0,
        }
    }
}

impl Transaction {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());

        out.extend_from_slice(&compactsize(self.inputs.len() as u64));
        for input in &self.inputs {
            out.extend_from_slice(&input.outpoint.to_bytes());
            out.extend_from_slice(&compactsize(input.unlocking_script.len() as u64));
            out.extend_from_slice(&input.unlocking_script);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }

        out.extend_from_slice(&compactsize(self.outputs.len() as u64));
        for output in &self.outputs {
            out.extend_from_slice(&output.serialize()?);
        }

        out.extend_from_slice(&self.locktime.to_le_bytes());
        Ok(out)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let version = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated("tx version"))?;

        let input_count = cursor.read_compactsize("input count")?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let txid = cursor.read_array::<32>("input txid")?;
            let vout = cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| Error::Truncated("input vout"))?;
            let unlocking_script = cursor.read_var_bytes("unlocking bytecode")?;
            let sequence = cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| Error::Truncated("input sequence"))?;
            inputs.push(TxInput {
                outpoint: Outpoint::new(txid, vout),
                unlocking_script,
                sequence,
            });
        }

        let output_count = cursor.read_compactsize("output count")?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let value = cursor
                .read_u64::<LittleEndian>()
                .map_err(|_| Error::Truncated("output value"))?;
            let field = cursor.read_var_bytes("output script")?;
            let (token, locking_script) = split_token_prefix(&field)?;
            outputs.push(TxOutput {
                value,
                token,
                locking_script,
            });
        }

        let locktime = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated("tx locktime"))?;

        let mut rest = Vec::new();
        cursor
            .read_to_end(&mut rest)
            .map_err(|_| Error::Truncated("transaction"))?;
        if !rest.is_empty() {
            return Err(Error::TrailingBytes("transaction"));
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            locktime,
        })
    }

    /// hash256 of the serialization, internal byte order
    pub fn txid(&self) -> Result<[u8; 32]> {
        Ok(hash256(&self.serialize()?))
    }

    pub fn txid_hex(&self) -> Result<String> {
        Ok(txid_hex(&self.txid()?))
    }

    pub fn outpoint(&self, vout: u32) -> Result<Outpoint> {
        if vout as usize >= self.outputs.len() {
            return Err(Error::OutputIndexOutOfRange {
                index: vout as usize,
                count: self.outputs.len(),
            });
        }
        Ok(Outpoint::new(self.txid()?, vout))
    }

    pub fn output(&self, vout: u32) -> Result<&TxOutput> {
        self.outputs
            .get(vout as usize)
            .ok_or(Error::OutputIndexOutOfRange {
                index: vout as usize,
                count: self.outputs.len(),
            })
    }

    /// Sum of output values; `None` if it overflows
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |total, output| total.checked_add(output.value))
    }
}
