//! Error types for attestation processing.
//!
//! Each stage has its own error enum. `CoreError` wraps them for callers
//! that run the whole pipeline (intake, CLI). Cryptographic and validation
//! failures are always surfaced, never defaulted.

use std::time::Duration;

use alloy_primitives::{Address, B256};
use attest_crypto::EciesError;
use thiserror::Error;

// ============================================================================
// Envelope errors
// ============================================================================

/// Plaintext envelope decoding and signature verification errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// A required field is missing, mis-typed, or not valid hex
    #[error("envelope malformed: {0}")]
    Malformed(String),

    /// Recovered address differs from the declared signer
    #[error("signature mismatch: declared {declared}, recovered {}", .recovered.map(|a| a.to_string()).unwrap_or_else(|| "nothing".to_string()))]
    SignatureMismatch {
        declared: String,
        recovered: Option<Address>,
    },

    /// Local signer failed to produce a signature
    #[error("signing failed: {0}")]
    Signing(String),
}

// ============================================================================
// Mailbox errors
// ============================================================================

/// Mailbox log decoding errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("log has no topics")]
    NoTopics,

    #[error("unknown event signature {0}")]
    UnknownEvent(B256),

    #[error("event decode failed: {0}")]
    Decode(String),
}

/// Errors building a publish call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The contract reverts on unequal arrays; refuse to build such a call
    #[error("field keys/values length mismatch: {keys} keys, {values} values")]
    FieldLengthMismatch { keys: usize, values: usize },
}

// ============================================================================
// Provider and scan errors
// ============================================================================

/// Chain log provider errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("bad response: {0}")]
    BadResponse(String),
}

/// Proof scan errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Address input is not `0x` followed by 40 hex digits
    #[error("validation failed: {0}")]
    Validation(String),

    /// Scan parameters are unusable (zero span, zero budget)
    #[error("invalid scan configuration: {0}")]
    InvalidConfig(String),

    /// Chain head could not be read
    #[error("provider unavailable: {0}")]
    Provider(#[source] ProviderError),

    /// A window query failed under the abort policy
    #[error("log query for blocks {from_block}..={to_block} failed: {source}")]
    Window {
        from_block: u64,
        to_block: u64,
        #[source]
        source: ProviderError,
    },

    /// Whole-scan deadline elapsed
    #[error("scan timed out after {0:?}")]
    Timeout(Duration),

    /// The range needs more windows than allowed
    #[error("window budget of {budget} exhausted before reaching block {stopped_above}")]
    WindowBudgetExceeded { budget: u64, stopped_above: u64 },
}

// ============================================================================
// Configuration errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Unified Core Error
// ============================================================================

/// Unified error type for the attestation pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("crypto error: {0}")]
    Crypto(#[from] EciesError),

    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Stable taxonomy name, suitable for logs and machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Crypto(e) => match e {
                EciesError::Format(_) => "FormatError",
                EciesError::KeyFormat(_) => "KeyFormatError",
                EciesError::Authentication => "AuthenticationError",
                EciesError::EncryptFailed | EciesError::KeyDerivation => "CryptoError",
            },
            CoreError::Envelope(e) => match e {
                EnvelopeError::Malformed(_) => "EnvelopeMalformedError",
                EnvelopeError::SignatureMismatch { .. } => "SignatureMismatchError",
                EnvelopeError::Signing(_) => "SigningError",
            },
            CoreError::Mailbox(_) => "MailboxDecodeError",
            CoreError::Publish(_) => "PublishError",
            CoreError::Scan(e) => match e {
                ScanError::Validation(_) => "ValidationError",
                ScanError::InvalidConfig(_) => "ConfigError",
                ScanError::Timeout(_) => "TimeoutError",
                _ => "ScanError",
            },
            CoreError::Config(_) => "ConfigError",
        }
    }
}
