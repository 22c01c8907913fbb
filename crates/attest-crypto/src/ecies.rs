//! Sealed-box encryption to a secp256k1 recipient.
//! Implements ECIES using secp256k1 ECDH + HKDF-SHA256 + AES-256-GCM.
//!
//! Wire layout: `ephemeral_pub (33, SEC1 compressed) || iv (12) || ciphertext || tag (16)`.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use bytes::Bytes;
use constant_time_eq::constant_time_eq;
use hkdf::Hkdf;
use k256::ecdh::{diffie_hellman, EphemeralSecret};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand_core::CryptoRngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::encoding::{decode_sealed, encode_sealed, TransportEncoding};
use crate::error::EciesError;
use crate::keys::{parse_public_key, COMPRESSED_PUBLIC_KEY_LEN};

/// HKDF info label. Changing it is a protocol version bump.
pub const ECIES_INFO_LABEL: &[u8] = b"ecies-secp256k1:aes-gcm:v1";

pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const AES_KEY_LEN: usize = 32;

/// Smallest valid sealed value: an empty plaintext still carries the tag.
pub const MIN_SEALED_LEN: usize = COMPRESSED_PUBLIC_KEY_LEN + IV_LEN + TAG_LEN;

const OKM_LEN: usize = AES_KEY_LEN + IV_LEN;

/// Sealed bytes with the field boundaries already checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedEnvelope(Bytes);

impl SealedEnvelope {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, EciesError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SEALED_LEN {
            return Err(EciesError::Format(format!(
                "sealed value is {} bytes, need at least {MIN_SEALED_LEN}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Decode base64 or base64url transport text.
    pub fn from_transport(text: &str) -> Result<Self, EciesError> {
        Self::from_bytes(decode_sealed(text)?)
    }

    pub fn to_transport(&self, encoding: TransportEncoding) -> String {
        encode_sealed(&self.0, encoding)
    }

    pub fn ephemeral_public_key(&self) -> &[u8] {
        &self.0[..COMPRESSED_PUBLIC_KEY_LEN]
    }

    pub fn iv(&self) -> &[u8] {
        &self.0[COMPRESSED_PUBLIC_KEY_LEN..COMPRESSED_PUBLIC_KEY_LEN + IV_LEN]
    }

    /// Ciphertext with the AEAD tag at the end.
    pub fn ciphertext(&self) -> &[u8] {
        &self.0[COMPRESSED_PUBLIC_KEY_LEN + IV_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for SealedEnvelope {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

struct DerivedKey {
    key: Zeroizing<[u8; AES_KEY_LEN]>,
    iv: [u8; IV_LEN],
}

fn kdf_key_iv(shared_x: &[u8], ephemeral_pub: &[u8]) -> Result<DerivedKey, EciesError> {
    // Raw curve coordinates are not uniform; hash before HKDF.
    let mut ikm = Zeroizing::new([0u8; 32]);
    ikm.copy_from_slice(&Sha256::digest(shared_x));

    // Salt = ephemeral public key, binding the output to this one-time key.
    let hk = Hkdf::<Sha256>::new(Some(ephemeral_pub), &ikm[..]);

    let mut okm = Zeroizing::new([0u8; OKM_LEN]);
    hk.expand(ECIES_INFO_LABEL, &mut okm[..])
        .map_err(|_| EciesError::KeyDerivation)?;

    let mut key = Zeroizing::new([0u8; AES_KEY_LEN]);
    key.copy_from_slice(&okm[..AES_KEY_LEN]);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&okm[AES_KEY_LEN..]);

    Ok(DerivedKey { key, iv })
}

/// Seal `plaintext` to `recipient_public_key` (33-byte compressed or 65-byte
/// uncompressed SEC1).
///
/// The random source is supplied by the caller; every call draws a fresh
/// ephemeral key from it.
pub fn seal<R: CryptoRngCore>(
    rng: &mut R,
    recipient_public_key: &[u8],
    plaintext: &[u8],
    aad: Option<&[u8]>,
) -> Result<SealedEnvelope, EciesError> {
    let recipient = parse_public_key(recipient_public_key)?;
    seal_to(rng, &recipient, plaintext, aad)
}

/// Same as [`seal`] for an already parsed recipient key.
pub fn seal_to<R: CryptoRngCore>(
    rng: &mut R,
    recipient: &PublicKey,
    plaintext: &[u8],
    aad: Option<&[u8]>,
) -> Result<SealedEnvelope, EciesError> {
    let eph = EphemeralSecret::random(rng);
    let eph_pub = eph.public_key().to_encoded_point(true);
    let eph_pub = eph_pub.as_bytes();

    let shared = eph.diffie_hellman(recipient);
    let derived = kdf_key_iv(shared.raw_secret_bytes().as_slice(), eph_pub)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived.key[..]));
    let ct = cipher
        .encrypt(
            Nonce::from_slice(&derived.iv),
            Payload {
                msg: plaintext,
                aad: aad.unwrap_or_default(),
            },
        )
        .map_err(|_| EciesError::EncryptFailed)?;

    let mut out = Vec::with_capacity(eph_pub.len() + IV_LEN + ct.len());
    out.extend_from_slice(eph_pub);
    out.extend_from_slice(&derived.iv);
    out.extend_from_slice(&ct);

    SealedEnvelope::from_bytes(out)
}

/// Open a sealed value with the recipient's secret key.
///
/// Inputs shorter than [`MIN_SEALED_LEN`] fail with `Format` before any
/// cryptography runs. Every later failure is `Authentication`. The AEAD
/// always runs once the key is derived, so a wrong key, a wrong AAD and a
/// tampered ciphertext take the same path.
pub fn open(
    sealed: &[u8],
    recipient: &SecretKey,
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, EciesError> {
    if sealed.len() < MIN_SEALED_LEN {
        return Err(EciesError::Format(format!(
            "sealed value is {} bytes, need at least {MIN_SEALED_LEN}",
            sealed.len()
        )));
    }

    let (eph_pub, rest) = sealed.split_at(COMPRESSED_PUBLIC_KEY_LEN);
    let (iv, ct) = rest.split_at(IV_LEN);

    // The ephemeral key field is covered by the same error as the tag.
    let eph_point = match eph_pub.first().copied() {
        Some(0x02 | 0x03) => {
            PublicKey::from_sec1_bytes(eph_pub).map_err(|_| EciesError::Authentication)?
        }
        _ => return Err(EciesError::Authentication),
    };

    let shared = diffie_hellman(recipient.to_nonzero_scalar(), eph_point.as_affine());
    let derived = kdf_key_iv(shared.raw_secret_bytes().as_slice(), eph_pub)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived.key[..]));
    let result = cipher.decrypt(
        Nonce::from_slice(iv),
        Payload {
            msg: ct,
            aad: aad.unwrap_or_default(),
        },
    );

    let iv_matches = constant_time_eq(iv, &derived.iv);
    match result {
        Ok(pt) if iv_matches => Ok(pt),
        _ => Err(EciesError::Authentication),
    }
}

/// Decode transport text and open it.
pub fn open_transport(
    sealed_text: &str,
    recipient: &SecretKey,
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, EciesError> {
    let sealed = decode_sealed(sealed_text)?;
    open(&sealed, recipient, aad)
}
