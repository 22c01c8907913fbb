//! Command-line definitions and dispatch.

use std::path::PathBuf;

use attest_core::config::AttestConfig;
use attest_core::CoreError;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::attest::{EncodePublishArgs, IntakeArgs, SchemaArgs, SignArgs, VerifyEnvelopeArgs};
use crate::keys::{KeygenArgs, NormalizeKeyArgs};
use crate::output::{OutputFormat, OutputFormatter, Report};
use crate::scan::ScanArgs;
use crate::sealing::{OpenArgs, SealArgs};
use crate::ExitCode;

/// attest - sealed attestation envelopes and on-chain proof scans
#[derive(Parser, Debug)]
#[command(name = "attest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json, quiet)
    #[arg(long, short = 'o', global = true, default_value = "table")]
    pub output: OutputFormat,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "ATTEST_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a secp256k1 key pair
    Keygen(KeygenArgs),

    /// Normalize a public key to canonical hex
    NormalizeKey(NormalizeKeyArgs),

    /// Seal plaintext to a recipient public key
    Seal(SealArgs),

    /// Open a sealed value
    Open(OpenArgs),

    /// Sign a JSON payload into an envelope
    Sign(SignArgs),

    /// Verify a plaintext envelope
    VerifyEnvelope(VerifyEnvelopeArgs),

    /// Select the schema tier for a message
    Schema(SchemaArgs),

    /// Process a sealed submission into a publishable attestation
    Intake(IntakeArgs),

    /// Encode a mailbox publish call
    EncodePublish(EncodePublishArgs),

    /// Scan the mailbox for an address's attestation
    Scan(ScanArgs),
}

impl Cli {
    /// Run the selected command against an already loaded configuration.
    pub async fn execute_with_config(self, config: AttestConfig) -> anyhow::Result<ExitCode> {
        let ctx = Context::new(config, OutputFormatter::new(self.output, self.verbose));

        match self.command {
            Commands::Keygen(args) => args.execute(&ctx),
            Commands::NormalizeKey(args) => args.execute(&ctx),
            Commands::Seal(args) => args.execute(&ctx),
            Commands::Open(args) => args.execute(&ctx),
            Commands::Sign(args) => args.execute(&ctx),
            Commands::VerifyEnvelope(args) => args.execute(&ctx),
            Commands::Schema(args) => args.execute(&ctx),
            Commands::Intake(args) => args.execute(&ctx),
            Commands::EncodePublish(args) => args.execute(&ctx),
            Commands::Scan(args) => args.execute(&ctx).await,
        }
    }
}

/// Resolved configuration and output settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: AttestConfig,
    pub formatter: OutputFormatter,
}

impl Context {
    pub fn new(config: AttestConfig, formatter: OutputFormatter) -> Self {
        Self { config, formatter }
    }

    /// Print a command result and pick the exit code.
    pub fn finish<T: Report>(&self, command: &str, result: Result<T, CoreError>) -> ExitCode {
        match result {
            Ok(report) => {
                self.formatter.emit(&report, command);
                ExitCode::Success
            }
            Err(e) => {
                let code = ExitCode::for_error(&e);
                warn!(command, kind = e.kind(), error = %e, "command failed");
                self.formatter.emit_error(command, e.kind(), &e.to_string(), code);
                code
            }
        }
    }

    /// Report bad user input that never reached the pipeline.
    pub fn reject(&self, command: &str, kind: &str, message: &str) -> ExitCode {
        let code = ExitCode::InvalidInput;
        self.formatter.emit_error(command, kind, message, code);
        code
    }
}
