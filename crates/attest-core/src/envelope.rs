//! Plaintext envelope: the signed payload carried inside a sealed value.
//!
//! ```json
//! {
//!   "signer": { "address": "0x…", "accountId": "…", "addressFormat": "…", "algo": "eip191_personal_sign" },
//!   "message": "<canonical JSON string>",
//!   "signature": { "r": "<64 hex>", "s": "<64 hex>", "v": "<2 hex>" }
//! }
//! ```
//!
//! Required fields are checked once, when the envelope is decoded. Everything
//! downstream works with the validated [`PlaintextEnvelope`].

use alloy_primitives::{eip191_hash_message, keccak256, Address};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde_json::{json, Map, Value};

use crate::errors::EnvelopeError;

/// Algorithm label written by [`crate::signer::build_envelope`].
pub const EIP191_PERSONAL_SIGN: &str = "eip191_personal_sign";

/// Declared signer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    pub address: String,
    pub account_id: Option<String>,
    pub address_format: Option<String>,
    pub algo: Option<String>,
}

impl SignerInfo {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            account_id: None,
            address_format: None,
            algo: None,
        }
    }
}

/// ECDSA signature components with a one-byte recovery value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl EnvelopeSignature {
    /// `0x` + r + s + v, the string form handed to on-chain publishing.
    pub fn to_recovery_hex(&self) -> String {
        format!("0x{}{}{:02x}", hex::encode(self.r), hex::encode(self.s), self.v)
    }

    /// Recovery id for `v` in {0, 1, 27, 28}.
    pub fn recovery_id(&self) -> Option<RecoveryId> {
        match self.v {
            0 | 1 => RecoveryId::from_byte(self.v),
            27 | 28 => RecoveryId::from_byte(self.v - 27),
            _ => None,
        }
    }

    fn parse_object(obj: &Map<String, Value>) -> Result<Self, EnvelopeError> {
        let r = fixed_hex::<32>(obj.get("r"), "signature.r")?;
        let s = fixed_hex::<32>(obj.get("s"), "signature.s")?;
        let v = match obj.get("v") {
            Some(Value::String(text)) => {
                let digits = strip_0x(text);
                if digits.is_empty() || digits.len() > 2 {
                    return Err(malformed("signature.v must be one byte of hex"));
                }
                u8::from_str_radix(digits, 16)
                    .map_err(|_| malformed("signature.v is not valid hex"))?
            }
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| malformed("signature.v is out of range"))?,
            Some(_) => return Err(malformed("signature.v must be a string or number")),
            None => return Err(malformed("missing signature.v")),
        };
        Ok(Self { r, s, v })
    }

    /// Parse the 65-byte `0x`-prefixed hex form.
    pub fn from_recovery_hex(text: &str) -> Result<Self, EnvelopeError> {
        let mut raw = [0u8; 65];
        hex::decode_to_slice(strip_0x(text), &mut raw)
            .map_err(|_| malformed("signature must be 65 bytes of hex"))?;
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&raw[..32]);
        s.copy_from_slice(&raw[32..64]);
        Ok(Self { r, s, v: raw[64] })
    }
}

impl std::fmt::Debug for EnvelopeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EnvelopeSignature")
            .field(&self.to_recovery_hex())
            .finish()
    }
}

/// A decoded envelope with its required fields present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaintextEnvelope {
    pub signer: SignerInfo,
    /// The exact string that was signed.
    pub message: String,
    pub signature: EnvelopeSignature,
}

impl PlaintextEnvelope {
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| malformed(format!("envelope is not JSON: {e}")))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        let obj = value
            .as_object()
            .ok_or_else(|| malformed("envelope must be a JSON object"))?;

        let message = non_empty_str(obj.get("message"), "message")?.to_string();

        let signer = obj
            .get("signer")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed("missing signer"))?;
        let signer = SignerInfo {
            address: non_empty_str(signer.get("address"), "signer.address")?.to_string(),
            account_id: optional_str(signer, "accountId"),
            address_format: optional_str(signer, "addressFormat"),
            algo: optional_str(signer, "algo"),
        };

        let signature = match obj.get("signature") {
            Some(Value::Object(sig)) => EnvelopeSignature::parse_object(sig)?,
            Some(Value::String(text)) => EnvelopeSignature::from_recovery_hex(text)?,
            Some(_) => return Err(malformed("signature must be an object or hex string")),
            None => return Err(malformed("missing signature")),
        };

        Ok(Self {
            signer,
            message,
            signature,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut signer = Map::new();
        signer.insert("address".into(), json!(self.signer.address));
        if let Some(account_id) = &self.signer.account_id {
            signer.insert("accountId".into(), json!(account_id));
        }
        if let Some(format) = &self.signer.address_format {
            signer.insert("addressFormat".into(), json!(format));
        }
        if let Some(algo) = &self.signer.algo {
            signer.insert("algo".into(), json!(algo));
        }

        json!({
            "signer": signer,
            "message": self.message,
            "signature": {
                "r": hex::encode(self.signature.r),
                "s": hex::encode(self.signature.s),
                "v": format!("{:02x}", self.signature.v),
            },
        })
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.to_value().to_string().into_bytes()
    }

    /// Recover the signer and check it against the declared address.
    pub fn verify(&self) -> Result<Address, EnvelopeError> {
        verify_envelope(self)
    }
}

/// Recover the address that produced `signature` over the EIP-191 personal
/// message hash of `message`.
pub fn recover_signer(message: &str, signature: &EnvelopeSignature) -> Option<Address> {
    let recovery_id = signature.recovery_id()?;
    let sig = Signature::from_scalars(signature.r, signature.s).ok()?;
    let digest = eip191_hash_message(message.as_bytes());

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id).ok()?;
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Some(Address::from_slice(&hash[12..]))
}

/// Verify an envelope, returning the recovered signer address.
///
/// The declared address is compared case-insensitively, so checksummed and
/// lowercase forms are both accepted.
pub fn verify_envelope(envelope: &PlaintextEnvelope) -> Result<Address, EnvelopeError> {
    let recovered = recover_signer(&envelope.message, &envelope.signature);
    match recovered {
        Some(addr) if addr.to_string().eq_ignore_ascii_case(&envelope.signer.address) => Ok(addr),
        recovered => Err(EnvelopeError::SignatureMismatch {
            declared: envelope.signer.address.clone(),
            recovered,
        }),
    }
}

fn malformed(reason: impl Into<String>) -> EnvelopeError {
    EnvelopeError::Malformed(reason.into())
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

fn non_empty_str<'a>(value: Option<&'a Value>, field: &str) -> Result<&'a str, EnvelopeError> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(malformed(format!("{field} is empty"))),
        Some(_) => Err(malformed(format!("{field} must be a string"))),
        None => Err(malformed(format!("missing {field}"))),
    }
}

fn optional_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn fixed_hex<const N: usize>(value: Option<&Value>, field: &str) -> Result<[u8; N], EnvelopeError> {
    let text = non_empty_str(value, field)?;
    let mut out = [0u8; N];
    hex::decode_to_slice(strip_0x(text), &mut out)
        .map_err(|_| malformed(format!("{field} must be {N} bytes of hex")))?;
    Ok(out)
}
