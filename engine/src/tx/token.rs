//! Token prefix carried in front of an output's locking bytecode
//!
//! `0xef || category(32) || bitfield || [commitment] || [amount]`
//!
//! Bitfield high nibble: `0x40` has commitment length, `0x20` has NFT,
//! `0x10` has amount, `0x80` reserved. Low nibble: NFT capability.

use std::io::{Cursor, Read};

use crate::encoding::{compactsize, ReadChainExt};
use crate::error::{Error, Result};
use crate::tx::Outpoint;

pub const PREFIX_TOKEN: u8 = 0xef;

const RESERVED_BIT: u8 = 0x80;
const HAS_COMMITMENT_LENGTH: u8 = 0x40;
const HAS_NFT: u8 = 0x20;
const HAS_AMOUNT: u8 = 0x10;
const CAPABILITY_MASK: u8 = 0x0f;

pub const MAX_COMMITMENT_LEN: usize = 40;
pub const MAX_FUNGIBLE_AMOUNT: u64 = i64::MAX as u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Capability {
    /// Immutable NFT
    None = 0x00,
    /// Commitment may be rewritten by the spender
    Mutable = 0x01,
    Minting = 0x02,
}

impl TryFrom<u8> for Capability {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(Capability::None),
            0x01 => Ok(Capability::Mutable),
            0x02 => Ok(Capability::Minting),
            _ => Err(Error::MalformedToken("unknown NFT capability")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Nft {
    pub capability: Capability,
    pub commitment: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenData {
    /// Category id in internal byte order
    pub category: [u8; 32],
    pub nft: Option<Nft>,
    pub amount: Option<u64>,
}

impl TokenData {
    /// Category of a token created by spending `outpoint`
    ///
    /// Only an outpoint with index 0 can create a new category.
    pub fn genesis_category(outpoint: &Outpoint) -> Result<[u8; 32]> {
        if outpoint.vout != 0 {
            return Err(Error::MalformedToken("genesis input must spend output index 0"));
        }
        Ok(outpoint.txid)
    }

    /// NFT-only token with the given capability and commitment
    pub fn nft(category: [u8; 32], capability: Capability, commitment: Vec<u8>) -> Self {
        Self {
            category,
            nft: Some(Nft {
                capability,
                commitment,
            }),
            amount: None,
        }
    }

    pub fn commitment(&self) -> Option<&[u8]> {
        self.nft.as_ref().map(|nft| nft.commitment.as_slice())
    }

    fn validate(&self) -> Result<()> {
        if self.nft.is_none() && self.amount.is_none() {
            return Err(Error::MalformedToken("token carries neither NFT nor amount"));
        }
        if let Some(nft) = &self.nft {
            if nft.commitment.len() > MAX_COMMITMENT_LEN {
                return Err(Error::MalformedToken("commitment longer than 40 bytes"));
            }
        }
        if let Some(amount) = self.amount {
            if amount == 0 || amount > MAX_FUNGIBLE_AMOUNT {
                return Err(Error::MalformedToken("fungible amount out of range"));
            }
        }
        Ok(())
    }

    /// Encode the prefix
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let mut bitfield = 0u8;
        if let Some(nft) = &self.nft {
            bitfield |= HAS_NFT | nft.capability as u8;
            if !nft.commitment.is_empty() {
                bitfield |= HAS_COMMITMENT_LENGTH;
            }
        }
        if self.amount.is_some() {
            bitfield |= HAS_AMOUNT;
        }

        let mut out = Vec::with_capacity(1 + 32 + 1 + 1 + MAX_COMMITMENT_LEN + 9);
        out.push(PREFIX_TOKEN);
        out.extend_from_slice(&self.category);
        out.push(bitfield);
        if let Some(nft) = &self.nft {
            if !nft.commitment.is_empty() {
                out.extend_from_slice(&compactsize(nft.commitment.len() as u64));
                out.extend_from_slice(&nft.commitment);
            }
        }
        if let Some(amount) = self.amount {
            out.extend_from_slice(&compactsize(amount));
        }
        Ok(out)
    }

    /// Read a prefix from a cursor positioned just after `0xef`
    fn read_after_marker(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let category = cursor.read_array::<32>("token category")?;
        let bitfield = cursor.read_array::<1>("token bitfield")?[0];
        if bitfield & RESERVED_BIT != 0 {
            return Err(Error::MalformedToken("reserved bit set"));
        }
        let capability = Capability::try_from(bitfield & CAPABILITY_MASK)?;
        let has_nft = bitfield & HAS_NFT != 0;
        let has_commitment = bitfield & HAS_COMMITMENT_LENGTH != 0;

        if !has_nft && (has_commitment || capability != Capability::None) {
            return Err(Error::MalformedToken("NFT fields without NFT flag"));
        }

        let commitment = if has_commitment {
            let len = cursor.read_compactsize("token commitment length")?;
            if len == 0 || len > MAX_COMMITMENT_LEN as u64 {
                return Err(Error::MalformedToken("commitment length out of range"));
            }
            cursor.read_exact_vec(len as usize, "token commitment")?
        } else {
            Vec::new()
        };

        let amount = if bitfield & HAS_AMOUNT != 0 {
            Some(cursor.read_compactsize("token amount")?)
        } else {
            None
        };

        let token = TokenData {
            category,
            nft: has_nft.then_some(Nft {
                capability,
                commitment,
            }),
            amount,
        };
        token.validate()?;
        Ok(token)
    }
}

/// Split an output's on-chain script field into token data and locking bytecode
pub fn split_token_prefix(field: &[u8]) -> Result<(Option<TokenData>, Vec<u8>)> {
    if field.first() != Some(&PREFIX_TOKEN) {
        return Ok((None, field.to_vec()));
    }
    let mut cursor = Cursor::new(&field[1..]);
    let token = TokenData::read_after_marker(&mut cursor)?;
    let mut locking_script = Vec::new();
    cursor
        .read_to_end(&mut locking_script)
        .map_err(|_| Error::Truncated("locking bytecode"))?;
    Ok((Some(token), locking_script))
}

/// Prefix bytes for an optional token, empty when absent
pub fn token_prefix(token: Option<&TokenData>) -> Result<Vec<u8>> {
    token.map_or(Ok(Vec::new()), TokenData::encode)
}
