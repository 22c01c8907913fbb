//! Codec error types.

use thiserror::Error;

/// Errors from sealing, opening, key parsing and transport decoding.
///
/// `Authentication` is returned for every failure past the length check on
/// the open path (bad tag, wrong key, wrong AAD, corrupted ephemeral key), so
/// callers cannot tell those cases apart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EciesError {
    #[error("malformed sealed envelope: {0}")]
    Format(String),

    #[error("unsupported secp256k1 key encoding: {0}")]
    KeyFormat(String),

    #[error("decryption failed")]
    Authentication,

    #[error("encryption failed")]
    EncryptFailed,

    #[error("key derivation failed")]
    KeyDerivation,
}
