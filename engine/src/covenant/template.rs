//! Covenant template tail
//!
//! The tail runs after the header has pushed the guard hash. With the
//! unlocking stack `[sig, pubkey, amount]` it must check:
//! - `hash160(pubkey) == guard hash`
//! - output 0 value equals `amount`
//! - output 0 pays to a pay-to-key-hash script
//! - output 0 carries the spent token's category and commitment
//! - `sig` is valid for `pubkey`
//!
//! Deployments may supply their own compiled tail; it is treated as opaque.

use super::opcodes::OpCode;
use crate::encoding::push_data;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CovenantTemplate {
    bytes: Vec<u8>,
}

impl CovenantTemplate {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::MalformedScript("empty covenant template"));
        }
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded tail, ignoring surrounding whitespace
    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| Error::ValueOutOfRange(format!("template hex: {e}")))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The bundled reference tail
    pub fn reference() -> Self {
        let mut tail: Vec<u8> = Vec::with_capacity(64);

        // Guard: hash160(pubkey) == guard hash
        tail.extend_from_slice(&[
            OpCode::Two.into(),
            OpCode::Pick.into(),
            OpCode::Hash160.into(),
            OpCode::EqualVerify.into(),
        ]);

        // Designated output value == asserted amount
        tail.extend_from_slice(&[
            OpCode::Zero.into(),
            OpCode::OutputValue.into(),
            OpCode::NumEqualVerify.into(),
        ]);

        // Designated output is OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
        tail.extend_from_slice(&[OpCode::Zero.into(), OpCode::OutputBytecode.into()]);
        tail.push(OpCode::Size.into());
        tail.extend_from_slice(&push_data(&[25]));
        tail.push(OpCode::NumEqualVerify.into());
        tail.extend_from_slice(&[OpCode::Three.into(), OpCode::Split.into()]);
        tail.push(OpCode::Swap.into());
        tail.extend_from_slice(&push_data(&[0x76, 0xa9, 0x14]));
        tail.push(OpCode::EqualVerify.into());
        tail.extend_from_slice(&push_data(&[20]));
        tail.push(OpCode::Split.into());
        tail.extend_from_slice(&push_data(&[0x88, 0xac]));
        tail.push(OpCode::EqualVerify.into());
        tail.push(OpCode::Drop.into());

        // Token category and commitment carried forward unchanged
        for (spent, created) in [
            (OpCode::UtxoTokenCategory, OpCode::OutputTokenCategory),
            (OpCode::UtxoTokenCommitment, OpCode::OutputTokenCommitment),
        ] {
            tail.extend_from_slice(&[
                OpCode::InputIndex.into(),
                spent.into(),
                OpCode::Zero.into(),
                created.into(),
                OpCode::EqualVerify.into(),
            ]);
        }

        tail.push(OpCode::CheckSig.into());
        Self { bytes: tail }
    }
}

impl Default for CovenantTemplate {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shape() {
        let template = CovenantTemplate::reference();
        let bytes = template.as_bytes();
        assert_eq!(&bytes[..4], &[0x52, 0x79, 0xa9, 0x88]);
        assert_eq!(*bytes.last().unwrap(), 0xac);
        assert!(bytes.windows(2).any(|w| w == [0x00, 0xcc]));
        assert!(bytes.windows(2).any(|w| w == [0xc0, 0xcf]));
    }

    #[test]
    fn test_from_hex() {
        let template = CovenantTemplate::from_hex(" 52798888ac\n").unwrap();
        assert_eq!(template.as_bytes(), &[0x52, 0x79, 0x88, 0x88, 0xac]);
        assert!(CovenantTemplate::from_hex("").is_err());
        assert!(CovenantTemplate::from_hex("zz").is_err());
    }
}
