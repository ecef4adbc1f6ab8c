//! Chain wire encodings: CompactSize, data pushes and script numbers

use std::io;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;

/// Largest payload a single direct push opcode can carry
pub const MAX_DIRECT_PUSH: usize = 0x4b;

/// Upper bound on any length read from untrusted framing
///
/// Matches the chain's maximum standard transaction size; anything larger is
/// rejected before allocation.
pub const MAX_FRAMED_LEN: u64 = 1_000_000;

/// Chain-format appends onto an in-memory buffer. These cannot fail.
pub trait PushChainExt {
    /// Append `n` using the `CompactSize` encoding (smallest form first).
    fn push_compactsize(&mut self, n: u64);

    /// Append a CompactSize length followed by the bytes.
    fn push_var_bytes(&mut self, bytes: &[u8]);
}

impl PushChainExt for Vec<u8> {
    fn push_compactsize(&mut self, n: u64) {
        match n {
            0x00..=0xfc => self.push(n as u8),
            0xfd..=0xffff => {
                self.push(0xfd);
                self.extend_from_slice(&(n as u16).to_le_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.push(0xfe);
                self.extend_from_slice(&(n as u32).to_le_bytes());
            }
            _ => {
                self.push(0xff);
                self.extend_from_slice(&n.to_le_bytes());
            }
        }
    }

    fn push_var_bytes(&mut self, bytes: &[u8]) {
        self.push_compactsize(bytes.len() as u64);
        self.extend_from_slice(bytes);
    }
}

/// Extends [`io::Read`] with chain-format readers.
///
/// Every reader maps a short read onto [`Error::Truncated`] naming the field.
pub trait ReadChainExt: io::Read {
    fn read_compactsize(&mut self, what: &'static str) -> Result<u64> {
        let flag = self.read_u8().map_err(|_| Error::Truncated(what))?;
        let n = match flag {
            n @ 0x00..=0xfc => n as u64,
            0xfd => match self
                .read_u16::<LittleEndian>()
                .map_err(|_| Error::Truncated(what))?
            {
                n @ 0xfd..=0xffff => n as u64,
                _ => return Err(Error::NonMinimalVarInt),
            },
            0xfe => match self
                .read_u32::<LittleEndian>()
                .map_err(|_| Error::Truncated(what))?
            {
                n @ 0x1_0000..=0xffff_ffff => n as u64,
                _ => return Err(Error::NonMinimalVarInt),
            },
            0xff => match self
                .read_u64::<LittleEndian>()
                .map_err(|_| Error::Truncated(what))?
            {
                n @ 0x1_0000_0000..=u64::MAX => n,
                _ => return Err(Error::NonMinimalVarInt),
            },
        };
        Ok(n)
    }

    /// Read a CompactSize-framed byte string.
    fn read_var_bytes(&mut self, what: &'static str) -> Result<Vec<u8>> {
        let len = self.read_compactsize(what)?;
        if len > MAX_FRAMED_LEN {
            return Err(Error::ValueOutOfRange(format!(
                "{what} length {len} exceeds {MAX_FRAMED_LEN}"
            )));
        }
        self.read_exact_vec(len as usize, what)
    }

    fn read_exact_vec(&mut self, len: usize, what: &'static str) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf).map_err(|_| Error::Truncated(what))?;
        Ok(buf)
    }

    fn read_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf).map_err(|_| Error::Truncated(what))?;
        Ok(buf)
    }
}

impl<R: io::Read + ?Sized> ReadChainExt for R {}

/// Encode `n` as CompactSize into a fresh buffer
pub fn compactsize(n: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    out.push_compactsize(n);
    out
}

/// Minimal push of `data` onto the script stack
pub fn push_data(data: &[u8]) -> Vec<u8> {
    match data {
        [] => return vec![OP_0],
        [n @ 1..=16] => return vec![OP_1 + n - 1],
        [0x81] => return vec![OP_1NEGATE],
        _ => {}
    }

    let len = data.len();
    let mut out = Vec::with_capacity(len + 5);
    match len {
        0..=MAX_DIRECT_PUSH => out.push(len as u8),
        0x4c..=0xff => {
            out.push(OP_PUSHDATA1);
            out.push(len as u8);
        }
        0x100..=0xffff => {
            out.push(OP_PUSHDATA2);
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
        _ => {
            out.push(OP_PUSHDATA4);
            out.extend_from_slice(&(len as u32).to_le_bytes());
        }
    }
    out.extend_from_slice(data);
    out
}

/// Minimal little-endian sign-magnitude script number
pub fn script_number(n: i64) -> Vec<u8> {
    if n == 0 {
        return Vec::new();
    }
    let negative = n < 0;
    let mut abs = n.unsigned_abs();
    let mut out = Vec::with_capacity(9);
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    // The top bit carries the sign; add a byte when the magnitude uses it.
    if out[out.len() - 1] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        let last = out.len() - 1;
        out[last] |= 0x80;
    }
    out
}

/// Decode a script number, rejecting non-minimal encodings
pub fn decode_script_number(bytes: &[u8]) -> Result<i64> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > 8 {
        return Err(Error::ValueOutOfRange("script number wider than 8 bytes".into()));
    }
    let last = bytes[bytes.len() - 1];
    if last & 0x7f == 0 && (bytes.len() == 1 || bytes[bytes.len() - 2] & 0x80 == 0) {
        return Err(Error::ValueOutOfRange("non-minimal script number".into()));
    }
    let mut magnitude: u64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        let b = if i == bytes.len() - 1 { byte & 0x7f } else { *byte };
        magnitude |= (b as u64) << (8 * i);
    }
    let value = i64::try_from(magnitude)
        .map_err(|_| Error::ValueOutOfRange("script number overflows i64".into()))?;
    Ok(if last & 0x80 != 0 { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_compactsize_boundaries() {
        assert_eq!(compactsize(0xfc), vec![0xfc]);
        assert_eq!(compactsize(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compactsize(0xffff), vec![0xfd, 0xff, 0xff]);
        assert_eq!(compactsize(0x1_0000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(compactsize(0x1_0000_0000).len(), 9);
    }

    #[test]
    fn test_var_bytes_read_back() {
        let payload = vec![0xab; 300];
        let mut buf = vec![0x01];
        buf.push_var_bytes(&payload);
        buf.push_var_bytes(&[]);
        assert_eq!(&buf[1..4], &[0xfd, 0x2c, 0x01]);

        let mut cursor = Cursor::new(&buf[1..]);
        assert_eq!(cursor.read_var_bytes("payload").unwrap(), payload);
        assert!(cursor.read_var_bytes("empty").unwrap().is_empty());
    }

    #[test]
    fn test_compactsize_read_back() {
        for n in [0u64, 1, 0xfc, 0xfd, 0x1234, 0xffff, 0x1_0000, 0xdead_beef, 0x1_0000_0000] {
            let bytes = compactsize(n);
            let mut cursor = Cursor::new(bytes.as_slice());
            assert_eq!(cursor.read_compactsize("n").unwrap(), n);
        }
    }

    #[test]
    fn test_compactsize_rejects_non_minimal() {
        let mut cursor = Cursor::new(&[0xfd, 0x10, 0x00][..]);
        assert!(matches!(
            cursor.read_compactsize("n"),
            Err(Error::NonMinimalVarInt)
        ));
    }

    #[test]
    fn test_compactsize_truncated() {
        let mut cursor = Cursor::new(&[0xfe, 0x00][..]);
        assert!(matches!(cursor.read_compactsize("n"), Err(Error::Truncated("n"))));
    }

    #[test]
    fn test_push_data_forms() {
        assert_eq!(push_data(&[]), vec![OP_0]);
        assert_eq!(push_data(&[5]), vec![0x55]);
        assert_eq!(push_data(&[0x81]), vec![OP_1NEGATE]);
        assert_eq!(push_data(&[0x20]), vec![0x01, 0x20]);
        assert_eq!(push_data(&[0xaa; 20])[0], 20);
        assert_eq!(push_data(&[0xaa; 20]).len(), 21);

        let medium = push_data(&[0u8; 80]);
        assert_eq!(&medium[..2], &[OP_PUSHDATA1, 80]);
        assert_eq!(medium.len(), 82);

        let large = push_data(&[0u8; 300]);
        assert_eq!(&large[..3], &[OP_PUSHDATA2, 0x2c, 0x01]);
        assert_eq!(large.len(), 303);
    }

    #[test]
    fn test_script_number_vectors() {
        assert_eq!(script_number(0), Vec::<u8>::new());
        assert_eq!(script_number(1), vec![0x01]);
        assert_eq!(script_number(-1), vec![0x81]);
        assert_eq!(script_number(127), vec![0x7f]);
        assert_eq!(script_number(128), vec![0x80, 0x00]);
        assert_eq!(script_number(-128), vec![0x80, 0x80]);
        assert_eq!(script_number(100_000), vec![0xa0, 0x86, 0x01]);
    }

    #[test]
    fn test_script_number_decode() {
        for n in [0i64, 1, -1, 127, 128, -255, 100_000, 21_000_000 * 100_000_000] {
            assert_eq!(decode_script_number(&script_number(n)).unwrap(), n);
        }
        assert!(decode_script_number(&[0x01, 0x00]).is_err());
        assert!(decode_script_number(&[0x80]).is_err());
    }
}
