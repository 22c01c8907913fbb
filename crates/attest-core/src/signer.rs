//! Submitter-side signing.
//!
//! Signing itself belongs to whatever wallet holds the submitter's key.
//! [`MessageSigner`] is that seam; [`LocalWallet`] is an in-process
//! secp256k1 implementation used by the CLI and tests.

use alloy_primitives::{eip191_hash_message, keccak256, Address};
use attest_crypto::keys::parse_secret_key_hex;
use attest_crypto::EciesError;
use k256::ecdsa::{SigningKey, VerifyingKey};
use rand_core::CryptoRngCore;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::canonical::to_canonical_json;
use crate::envelope::{EnvelopeSignature, PlaintextEnvelope, SignerInfo, EIP191_PERSONAL_SIGN};
use crate::errors::EnvelopeError;

/// Produces EIP-191 personal-message signatures.
pub trait MessageSigner {
    /// Address the signatures recover to.
    fn address(&self) -> Address;

    fn sign_personal(&self, message: &str) -> Result<EnvelopeSignature, EnvelopeError>;
}

/// secp256k1 signing key held in memory.
#[derive(Clone)]
pub struct LocalWallet {
    key: SigningKey,
    address: Address,
}

impl LocalWallet {
    pub fn random<R: CryptoRngCore>(rng: &mut R) -> Self {
        Self::from_signing_key(SigningKey::random(rng))
    }

    pub fn from_secret_hex(hex_str: &str) -> Result<Self, EciesError> {
        let secret = parse_secret_key_hex(hex_str)?;
        Ok(Self::from_signing_key(SigningKey::from(secret)))
    }

    pub fn from_signing_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.key.to_bytes())))
    }
}

impl MessageSigner for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_personal(&self, message: &str) -> Result<EnvelopeSignature, EnvelopeError> {
        let digest = eip191_hash_message(message.as_bytes());
        let (sig, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| EnvelopeError::Signing(e.to_string()))?;

        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(EnvelopeSignature {
            r,
            s,
            v: 27 + recovery_id.to_byte(),
        })
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Ethereum address of a secp256k1 verifying key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Canonicalize `payload`, sign it, and wrap the result in an envelope.
pub fn build_envelope<S: MessageSigner + ?Sized>(
    signer: &S,
    payload: &Value,
    account_id: Option<&str>,
) -> Result<PlaintextEnvelope, EnvelopeError> {
    let message = to_canonical_json(payload);
    let signature = signer.sign_personal(&message)?;

    Ok(PlaintextEnvelope {
        signer: SignerInfo {
            address: signer.address().to_checksum(None),
            account_id: account_id.map(str::to_string),
            address_format: Some("ADDRESS_FORMAT_ETHEREUM".to_string()),
            algo: Some(EIP191_PERSONAL_SIGN.to_string()),
        },
        message,
        signature,
    })
}
