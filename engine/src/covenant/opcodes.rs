//! Script opcodes used by covenant headers, templates and standard outputs.

/// Supported opcodes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // Constants
    Zero = 0x00,
    Push20Bytes = 0x14,
    Push32Bytes = 0x20,
    One = 0x51,
    Two = 0x52,
    Three = 0x53,

    // Flow control and stack
    Return = 0x6a,
    Verify = 0x69,
    Drop = 0x75,
    Dup = 0x76,
    Pick = 0x79,
    Swap = 0x7c,
    Split = 0x7f,
    Size = 0x82,

    // Comparison
    Equal = 0x87,
    EqualVerify = 0x88,
    NumEqualVerify = 0x9d,

    // Crypto
    Hash160 = 0xa9,
    Hash256 = 0xaa,
    CheckSig = 0xac,

    // Transaction introspection
    InputIndex = 0xc0,
    OutputValue = 0xcc,
    OutputBytecode = 0xcd,
    UtxoTokenCategory = 0xce,
    UtxoTokenCommitment = 0xcf,
    OutputTokenCategory = 0xd1,
    OutputTokenCommitment = 0xd2,
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}
