//! Attest Core - signed envelopes, tier selection, and on-chain proof scans.
//!
//! This crate implements:
//! - Canonical JSON and EIP-191 envelope signing/verification
//! - Schema tier selection
//! - Provider-side intake of sealed submissions
//! - Mailbox event decoding and publish-call encoding
//! - Windowed backward scans over mailbox logs
//! - Configuration shared by the CLI

#![forbid(unsafe_code)]

// Envelope signing
pub mod canonical;
pub mod envelope;
pub mod signer;

// Policy and pipeline
pub mod schema;
pub mod intake;

// Chain access
pub mod mailbox;
pub mod provider;
pub mod scanner;

// Supporting modules
pub mod config;
pub mod errors;

// Optional provider implementations
#[cfg(feature = "http-provider")]
pub mod http_provider;

#[cfg(test)]
mod proptests;

pub use envelope::{verify_envelope, PlaintextEnvelope};
pub use errors::CoreError;
pub use intake::{Attestation, Intake};
pub use scanner::{ProofScanner, ScanConfig, ScanOutcome, WindowFailurePolicy};
pub use schema::{select_schema, SchemaTag};
