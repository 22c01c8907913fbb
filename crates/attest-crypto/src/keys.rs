//! secp256k1 key handling.
//!
//! Public keys arrive either compressed (33 bytes, `0x02`/`0x03` prefix) or
//! uncompressed (65 bytes, `0x04` prefix). Both normalize to the same
//! canonical string: `0x` + lowercase hex of the uncompressed encoding.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, PublicKey, SecretKey};
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::error::EciesError;

pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;
pub const SECRET_KEY_LEN: usize = 32;

fn strip_0x(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse SEC1 public key bytes, checking the length/prefix pairing first.
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, EciesError> {
    match (bytes.len(), bytes.first().copied()) {
        (COMPRESSED_PUBLIC_KEY_LEN, Some(0x02 | 0x03))
        | (UNCOMPRESSED_PUBLIC_KEY_LEN, Some(0x04)) => {
            PublicKey::from_sec1_bytes(bytes)
                .map_err(|_| EciesError::KeyFormat("point is not on secp256k1".to_string()))
        }
        (len, prefix) => Err(EciesError::KeyFormat(format!(
            "expected 33-byte compressed or 65-byte uncompressed key, got {len} bytes with prefix {:#04x}",
            prefix.unwrap_or(0)
        ))),
    }
}

/// Parse a hex-encoded SEC1 public key (`0x` optional).
pub fn parse_public_key_hex(hex_str: &str) -> Result<PublicKey, EciesError> {
    let raw = hex::decode(strip_0x(hex_str))
        .map_err(|e| EciesError::KeyFormat(format!("invalid hex: {e}")))?;
    parse_public_key(&raw)
}

/// Encode a public key as `0x`-prefixed lowercase hex.
pub fn public_key_hex(key: &PublicKey, compressed: bool) -> String {
    format!("0x{}", hex::encode(key.to_encoded_point(compressed).as_bytes()))
}

/// Normalize a compressed or uncompressed public key to canonical
/// uncompressed hex.
pub fn normalize_public_key(hex_str: &str) -> Result<String, EciesError> {
    let key = parse_public_key_hex(hex_str)?;
    Ok(public_key_hex(&key, false))
}

/// Parse a 32-byte secret scalar from hex. Shorter inputs are left-padded,
/// matching how big-integer encodings drop leading zeros.
pub fn parse_secret_key_hex(hex_str: &str) -> Result<SecretKey, EciesError> {
    let digits = strip_0x(hex_str);
    if digits.is_empty() || digits.len() > SECRET_KEY_LEN * 2 {
        return Err(EciesError::KeyFormat(format!(
            "secret key must be 1..=64 hex digits, got {}",
            digits.len()
        )));
    }
    let padded = Zeroizing::new(format!("{digits:0>64}"));
    let mut raw = Zeroizing::new([0u8; SECRET_KEY_LEN]);
    hex::decode_to_slice(padded.as_str(), &mut raw[..])
        .map_err(|e| EciesError::KeyFormat(format!("invalid hex: {e}")))?;
    SecretKey::from_bytes(FieldBytes::from_slice(&raw[..]))
        .map_err(|_| EciesError::KeyFormat("secret scalar is zero or out of range".to_string()))
}

/// A recipient key pair. The secret scalar is zeroized on drop by `k256`.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the given random source.
    pub fn generate<R: CryptoRngCore>(rng: &mut R) -> Self {
        let secret = SecretKey::random(rng);
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn from_secret_hex(hex_str: &str) -> Result<Self, EciesError> {
        parse_secret_key_hex(hex_str).map(Self::from_secret)
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// `0x`-prefixed secret scalar hex. Wrapped so the copy is wiped on drop.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.secret.to_bytes())))
    }

    pub fn public_hex_uncompressed(&self) -> String {
        public_key_hex(&self.public, false)
    }

    pub fn public_hex_compressed(&self) -> String {
        public_key_hex(&self.public, true)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_hex_compressed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_compressed_and_uncompressed_normalize_identically() {
        let kp = KeyPair::generate(&mut StdRng::seed_from_u64(7));
        let from_compressed = normalize_public_key(&kp.public_hex_compressed()).unwrap();
        let from_uncompressed = normalize_public_key(&kp.public_hex_uncompressed()).unwrap();

        assert_eq!(from_compressed, from_uncompressed);
        assert!(from_compressed.starts_with("0x04"));
        assert_eq!(from_compressed.len(), 2 + 65 * 2);
    }

    #[test]
    fn test_normalize_accepts_missing_prefix() {
        let kp = KeyPair::generate(&mut StdRng::seed_from_u64(8));
        let bare = kp.public_hex_compressed().trim_start_matches("0x").to_string();
        assert_eq!(
            normalize_public_key(&bare).unwrap(),
            kp.public_hex_uncompressed()
        );
    }

    #[test]
    fn test_rejects_wrong_prefix_for_length() {
        let kp = KeyPair::generate(&mut StdRng::seed_from_u64(9));
        let mut raw = hex::decode(&kp.public_hex_uncompressed()[2..]).unwrap();
        raw[0] = 0x02;
        assert!(matches!(
            parse_public_key(&raw),
            Err(EciesError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_rejects_off_curve_and_bad_lengths() {
        let mut off_curve = [0u8; 65];
        off_curve[0] = 0x04;
        assert!(matches!(parse_public_key(&off_curve), Err(EciesError::KeyFormat(_))));
        assert!(matches!(parse_public_key(&[0x02; 32]), Err(EciesError::KeyFormat(_))));
        assert!(matches!(parse_public_key(&[]), Err(EciesError::KeyFormat(_))));
        assert!(matches!(
            normalize_public_key("0xzz"),
            Err(EciesError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_secret_hex_round_trip() {
        let kp = KeyPair::generate(&mut StdRng::seed_from_u64(10));
        let restored = KeyPair::from_secret_hex(&kp.secret_hex()).unwrap();
        assert_eq!(restored.public(), kp.public());
    }

    #[test]
    fn test_secret_key_left_pads_short_hex() {
        let short = parse_secret_key_hex("0x01").unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 1;
        assert_eq!(short.to_bytes().as_slice(), &expected);
    }

    #[test]
    fn test_secret_key_rejects_zero_and_overlong() {
        assert!(parse_secret_key_hex("0x00").is_err());
        assert!(parse_secret_key_hex(&"11".repeat(33)).is_err());
        assert!(parse_secret_key_hex("").is_err());
    }
}
