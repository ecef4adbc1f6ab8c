//! Paycode key material
//!
//! A paycode is the long-lived public identity `(scan, spend)`; the owner
//! holds the matching secret scalars. One-time keys are derived from it per
//! payment (see `rpa`), so the paycode itself never appears on-chain.

use std::fmt;
use std::str::FromStr;

use k256::Scalar;
use rand::RngCore;
use zeroize::Zeroize;

use super::point::{decompress, parse_secret, public_from_scalar, scalar_bytes, POINT_LEN};
use crate::error::{Error, Result};
use crate::hash::{hash256, scalar_from_digest, tagged};

/// Text prefix of an encoded paycode
pub const PAYCODE_PREFIX: &str = "paycode:";

/// Version byte inside the encoded paycode payload
pub const PAYCODE_VERSION: u8 = 0x01;

const SCAN_LABEL: &[u8] = b"paycode/scan";
const SPEND_LABEL: &[u8] = b"paycode/spend";

// ============================================================================
// Zeroizing Scalar Wrapper
// ============================================================================

/// A scalar that zeroizes its contents on drop
#[derive(Clone)]
pub struct SecretScalar {
    bytes: [u8; 32],
}

impl SecretScalar {
    /// Create from a non-zero canonical encoding
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self> {
        parse_secret(&bytes)?;
        Ok(Self { bytes })
    }

    /// Wrap a non-zero scalar
    pub fn from_scalar(scalar: &Scalar) -> Result<Self> {
        if *scalar == Scalar::ZERO {
            return Err(Error::InvalidScalar);
        }
        Ok(Self {
            bytes: scalar_bytes(scalar),
        })
    }

    pub fn to_scalar(&self) -> Scalar {
        // Stored bytes are canonical, so reduction is the identity
        scalar_from_digest(self.bytes)
    }

    /// Get the raw bytes (use carefully)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Compressed public key for this secret
    pub fn public_key(&self) -> [u8; POINT_LEN] {
        public_from_scalar(&self.to_scalar())
    }

    /// Fresh random secret from OS entropy
    pub fn random() -> Self {
        let mut rng = rand::rngs::OsRng;
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            let scalar = scalar_from_digest(bytes);
            bytes.zeroize();
            if let Ok(secret) = Self::from_scalar(&scalar) {
                return secret;
            }
        }
    }
}

impl Drop for SecretScalar {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretScalar(..)")
    }
}

// ============================================================================
// Paycode
// ============================================================================

/// Public half of a paycode: `(scan, spend)` compressed points
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Paycode {
    scan_pubkey: [u8; POINT_LEN],
    spend_pubkey: [u8; POINT_LEN],
}

impl Paycode {
    /// Validate both keys as curve points
    pub fn new(scan_pubkey: [u8; POINT_LEN], spend_pubkey: [u8; POINT_LEN]) -> Result<Self> {
        decompress(&scan_pubkey)?;
        decompress(&spend_pubkey)?;
        Ok(Self {
            scan_pubkey,
            spend_pubkey,
        })
    }

    pub fn scan_pubkey(&self) -> &[u8; POINT_LEN] {
        &self.scan_pubkey
    }

    pub fn spend_pubkey(&self) -> &[u8; POINT_LEN] {
        &self.spend_pubkey
    }

    fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(1 + 2 * POINT_LEN + 4);
        payload.push(PAYCODE_VERSION);
        payload.extend_from_slice(&self.scan_pubkey);
        payload.extend_from_slice(&self.spend_pubkey);
        let checksum = hash256(&payload);
        payload.extend_from_slice(&checksum[..4]);
        payload
    }
}

impl fmt::Display for Paycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PAYCODE_PREFIX, bs58::encode(self.payload()).into_string())
    }
}

impl FromStr for Paycode {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let encoded = input.strip_prefix(PAYCODE_PREFIX).unwrap_or(input);
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| Error::InvalidPaycode(e.to_string()))?;

        let expected = 1 + 2 * POINT_LEN + 4;
        if bytes.len() != expected {
            return Err(Error::InvalidPaycode(format!(
                "expected {expected} bytes, got {}",
                bytes.len()
            )));
        }
        let (body, checksum) = bytes.split_at(expected - 4);
        if hash256(body)[..4] != *checksum {
            return Err(Error::InvalidPaycode("checksum mismatch".into()));
        }
        if body[0] != PAYCODE_VERSION {
            return Err(Error::InvalidPaycode(format!("unknown version {}", body[0])));
        }

        let mut scan = [0u8; POINT_LEN];
        let mut spend = [0u8; POINT_LEN];
        scan.copy_from_slice(&body[1..1 + POINT_LEN]);
        spend.copy_from_slice(&body[1 + POINT_LEN..]);
        Paycode::new(scan, spend)
    }
}

// ============================================================================
// Paycode Keys
// ============================================================================

/// Complete paycode key set for a receiver
///
/// Clone is NOT derived to prevent accidental secret duplication.
pub struct PaycodeKeys {
    scan_secret: SecretScalar,
    spend_secret: SecretScalar,
    paycode: Paycode,
}

impl PaycodeKeys {
    /// Generate new random keys from OS entropy
    pub fn generate() -> Self {
        Self::from_secret_scalars(SecretScalar::random(), SecretScalar::random())
    }

    /// Reconstruct keys from stored secrets
    pub fn from_secrets(scan_secret: &[u8; 32], spend_secret: &[u8; 32]) -> Result<Self> {
        Ok(Self::from_secret_scalars(
            SecretScalar::from_bytes(*scan_secret)?,
            SecretScalar::from_bytes(*spend_secret)?,
        ))
    }

    /// Derive keys from a BIP-39 mnemonic phrase
    ///
    /// - scan = H_s("paycode/scan" || seed)
    /// - spend = H_s("paycode/spend" || seed)
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self> {
        let mnemonic: bip39::Mnemonic = phrase
            .parse()
            .map_err(|e: bip39::Error| Error::InvalidMnemonic(e.to_string()))?;
        let mut seed = mnemonic.to_seed(passphrase);

        let scan = scalar_from_digest(tagged(SCAN_LABEL, &[&seed]));
        let spend = scalar_from_digest(tagged(SPEND_LABEL, &[&seed]));
        seed.zeroize();

        Ok(Self::from_secret_scalars(
            SecretScalar::from_scalar(&scan)?,
            SecretScalar::from_scalar(&spend)?,
        ))
    }

    /// Generate a fresh 24-word mnemonic and the keys derived from it
    pub fn generate_with_mnemonic() -> Result<(Self, String)> {
        let mut entropy = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut entropy);
        let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
            .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
        entropy.zeroize();

        let phrase = mnemonic.to_string();
        let keys = Self::from_mnemonic(&phrase, "")?;
        Ok((keys, phrase))
    }

    fn from_secret_scalars(scan_secret: SecretScalar, spend_secret: SecretScalar) -> Self {
        let paycode = Paycode {
            scan_pubkey: scan_secret.public_key(),
            spend_pubkey: spend_secret.public_key(),
        };
        Self {
            scan_secret,
            spend_secret,
            paycode,
        }
    }

    pub fn paycode(&self) -> Paycode {
        self.paycode
    }

    /// Export secrets as bytes
    ///
    /// WARNING: Handle these bytes with extreme care!
    pub fn export_secrets(&self) -> ([u8; 32], [u8; 32]) {
        (*self.scan_secret.as_bytes(), *self.spend_secret.as_bytes())
    }

    pub(crate) fn scan_secret(&self) -> Scalar {
        self.scan_secret.to_scalar()
    }

    pub(crate) fn spend_secret(&self) -> Scalar {
        self.spend_secret.to_scalar()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let keys = PaycodeKeys::generate();
        let paycode = keys.paycode();
        assert!(decompress(paycode.scan_pubkey()).is_ok());
        assert!(decompress(paycode.spend_pubkey()).is_ok());

        let (scan, spend) = keys.export_secrets();
        let reconstructed = PaycodeKeys::from_secrets(&scan, &spend).unwrap();
        assert_eq!(reconstructed.paycode(), paycode);
    }

    #[test]
    fn test_mnemonic_key_derivation() {
        let mnemonic = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

        let keys1 = PaycodeKeys::from_mnemonic(mnemonic, "").unwrap();
        let keys2 = PaycodeKeys::from_mnemonic(mnemonic, "").unwrap();
        assert_eq!(keys1.paycode(), keys2.paycode());

        let keys3 = PaycodeKeys::from_mnemonic(mnemonic, "password").unwrap();
        assert_ne!(keys1.paycode(), keys3.paycode());
        assert_ne!(keys1.paycode().scan_pubkey(), keys1.paycode().spend_pubkey());
    }

    #[test]
    fn test_invalid_mnemonic_rejected() {
        assert!(matches!(
            PaycodeKeys::from_mnemonic("not a real phrase", ""),
            Err(Error::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(PaycodeKeys::from_secrets(&[0u8; 32], &[1u8; 32]).is_err());
    }

    #[test]
    fn test_zero_scalar_rejected() {
        assert!(matches!(
            SecretScalar::from_scalar(&Scalar::ZERO),
            Err(Error::InvalidScalar)
        ));

        let secret = SecretScalar::from_scalar(&Scalar::from(7u64)).unwrap();
        assert_eq!(secret.to_scalar(), Scalar::from(7u64));
        assert_eq!(secret.public_key(), public_from_scalar(&Scalar::from(7u64)));
    }

    #[test]
    fn test_paycode_text_roundtrip() {
        let paycode = PaycodeKeys::generate().paycode();
        let text = paycode.to_string();
        assert!(text.starts_with(PAYCODE_PREFIX));
        assert_eq!(text.parse::<Paycode>().unwrap(), paycode);
    }

    #[test]
    fn test_paycode_checksum_detects_typo() {
        let text = PaycodeKeys::generate().paycode().to_string();
        let mut chars: Vec<char> = text.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '2' { '3' } else { '2' };
        let corrupted: String = chars.into_iter().collect();
        assert!(corrupted.parse::<Paycode>().is_err());
    }
}
