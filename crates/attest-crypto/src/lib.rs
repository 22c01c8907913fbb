#![forbid(unsafe_code)]

//! Sealed-envelope cryptography for attestation submissions.
//!
//! - `ecies`: secp256k1 ECDH + HKDF-SHA256 + AES-256-GCM seal/open
//! - `keys`: SEC1 public key parsing and normalization, secret key parsing
//! - `encoding`: base64 / base64url transport text for sealed bytes

pub mod error;
pub mod keys;
pub mod ecies;
pub mod encoding;

#[cfg(test)]
mod proptests;

pub use ecies::{open, open_transport, seal, seal_to, SealedEnvelope};
pub use error::EciesError;
pub use keys::{normalize_public_key, KeyPair};
