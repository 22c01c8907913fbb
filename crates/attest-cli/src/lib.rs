//! attest CLI - sealing, verification, publishing and proof scans
//!
//! This crate provides a command-line interface for:
//! - Generating and normalizing secp256k1 keys
//! - Sealing and opening submissions
//! - Signing and verifying plaintext envelopes
//! - Provider-side intake and publish-call encoding
//! - Scanning the mailbox for an address's attestation

pub mod attest;
pub mod cli;
pub mod input;
pub mod keys;
pub mod output;
pub mod scan;
pub mod sealing;

#[cfg(test)]
mod proptests;

use attest_core::errors::{EnvelopeError, ScanError};
use attest_core::CoreError;
use attest_crypto::EciesError;

pub use cli::Cli;
pub use output::{JsonResponse, OutputFormat, OutputFormatter, Report};

/// Exit codes for CLI operations
///
/// Exit codes provide machine-readable status for scripting and automation:
/// - 0: Success - operation completed successfully
/// - 1: General error - unspecified error occurred
/// - 2: Authentication failed - decryption or signature verification failed
/// - 3: Timeout - the scan deadline elapsed
/// - 4: Connection failed - the RPC endpoint could not be queried
/// - 5: Invalid input - bad arguments, keys, addresses or data provided
/// - 6: Not verified - the scan finished without finding an attestation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully (exit code 0)
    Success = 0,
    /// General error (exit code 1)
    GeneralError = 1,
    /// Authentication failed (exit code 2)
    AuthenticationFailed = 2,
    /// Operation timed out (exit code 3)
    Timeout = 3,
    /// Connection failed (exit code 4)
    ConnectionFailed = 4,
    /// Invalid input provided (exit code 5)
    InvalidInput = 5,
    /// No attestation found (exit code 6)
    NotVerified = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    /// Get the exit code name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
            ExitCode::AuthenticationFailed => "AUTH_FAILED",
            ExitCode::Timeout => "TIMEOUT",
            ExitCode::ConnectionFailed => "CONNECTION_FAILED",
            ExitCode::InvalidInput => "INVALID_INPUT",
            ExitCode::NotVerified => "NOT_VERIFIED",
        }
    }

    /// Get a human-readable description of the exit code
    pub fn description(&self) -> &'static str {
        match self {
            ExitCode::Success => "Operation completed successfully",
            ExitCode::GeneralError => "An unspecified error occurred",
            ExitCode::AuthenticationFailed => "Decryption or signature verification failed",
            ExitCode::Timeout => "Operation timed out",
            ExitCode::ConnectionFailed => "Could not query the RPC endpoint",
            ExitCode::InvalidInput => "Invalid arguments or data provided",
            ExitCode::NotVerified => "No attestation found for the address",
        }
    }

    /// Exit code for a pipeline error.
    pub fn for_error(error: &CoreError) -> Self {
        match error {
            CoreError::Crypto(EciesError::Authentication)
            | CoreError::Envelope(EnvelopeError::SignatureMismatch { .. }) => {
                ExitCode::AuthenticationFailed
            }
            CoreError::Crypto(EciesError::Format(_) | EciesError::KeyFormat(_))
            | CoreError::Envelope(EnvelopeError::Malformed(_))
            | CoreError::Publish(_)
            | CoreError::Config(_)
            | CoreError::Scan(ScanError::Validation(_) | ScanError::InvalidConfig(_)) => {
                ExitCode::InvalidInput
            }
            CoreError::Scan(ScanError::Timeout(_)) => ExitCode::Timeout,
            CoreError::Scan(ScanError::Provider(_) | ScanError::Window { .. }) => {
                ExitCode::ConnectionFailed
            }
            _ => ExitCode::GeneralError,
        }
    }
}

#[cfg(test)]
mod exit_code_tests {
    use super::*;
    use attest_core::errors::{ConfigError, ProviderError, PublishError};
    use std::time::Duration;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as i32, 0);
        assert_eq!(ExitCode::GeneralError as i32, 1);
        assert_eq!(ExitCode::AuthenticationFailed as i32, 2);
        assert_eq!(ExitCode::Timeout as i32, 3);
        assert_eq!(ExitCode::ConnectionFailed as i32, 4);
        assert_eq!(ExitCode::InvalidInput as i32, 5);
        assert_eq!(ExitCode::NotVerified as i32, 6);
    }

    #[test]
    fn test_exit_code_names() {
        assert_eq!(ExitCode::Success.name(), "SUCCESS");
        assert_eq!(ExitCode::AuthenticationFailed.name(), "AUTH_FAILED");
        assert_eq!(ExitCode::NotVerified.name(), "NOT_VERIFIED");
        assert!(!ExitCode::ConnectionFailed.description().is_empty());
    }

    #[test]
    fn test_exit_code_for_error() {
        let cases = [
            (CoreError::from(EciesError::Authentication), ExitCode::AuthenticationFailed),
            (
                CoreError::from(EnvelopeError::SignatureMismatch {
                    declared: "0x00".into(),
                    recovered: None,
                }),
                ExitCode::AuthenticationFailed,
            ),
            (CoreError::from(EciesError::Format("short".into())), ExitCode::InvalidInput),
            (CoreError::from(EciesError::KeyFormat("len".into())), ExitCode::InvalidInput),
            (
                CoreError::from(PublishError::FieldLengthMismatch { keys: 2, values: 1 }),
                ExitCode::InvalidInput,
            ),
            (
                CoreError::from(ConfigError::Invalid("max_span".into())),
                ExitCode::InvalidInput,
            ),
            (
                CoreError::from(ScanError::Validation("0x12".into())),
                ExitCode::InvalidInput,
            ),
            (
                CoreError::from(ScanError::Timeout(Duration::from_secs(1))),
                ExitCode::Timeout,
            ),
            (
                CoreError::from(ScanError::Provider(ProviderError::Http("refused".into()))),
                ExitCode::ConnectionFailed,
            ),
            (
                CoreError::from(ScanError::WindowBudgetExceeded { budget: 1, stopped_above: 9 }),
                ExitCode::GeneralError,
            ),
            (CoreError::from(EciesError::EncryptFailed), ExitCode::GeneralError),
        ];
        for (error, expected) in cases {
            assert_eq!(ExitCode::for_error(&error), expected, "{error}");
        }
    }

    #[test]
    fn test_exit_code_to_process_exit_code() {
        let _ = ExitCode::Success.to_exit_code();
        let _ = ExitCode::NotVerified.to_exit_code();
    }
}
