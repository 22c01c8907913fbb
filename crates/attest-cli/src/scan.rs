//! `scan`: look up an address's attestation in the mailbox logs.

use attest_core::config::AttestConfig;
use attest_core::errors::ScanError;
use attest_core::http_provider::JsonRpcProvider;
use attest_core::provider::LogProvider;
use attest_core::{CoreError, ProofScanner, ScanOutcome, WindowFailurePolicy};
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::cli::Context;
use crate::output::Report;
use crate::ExitCode;

/// Scan the mailbox for an attestation of ADDRESS
///
/// Exits 0 when one is found and 6 when the scan completes without a match.
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Address to look up (0x + 40 hex digits)
    pub address: String,

    /// JSON-RPC endpoint
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Mailbox contract address
    #[arg(long)]
    pub mailbox: Option<String>,

    /// Lowest block to scan
    #[arg(long)]
    pub start_block: Option<u64>,

    /// Blocks per log query
    #[arg(long)]
    pub max_span: Option<u64>,

    /// Only accept attestations published by this address
    #[arg(long)]
    pub trusted_publisher: Option<String>,

    /// What to do when a window query fails: skip or abort
    #[arg(long)]
    pub window_failure: Option<WindowFailurePolicy>,

    /// Whole-scan deadline in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Most windows to query before giving up
    #[arg(long)]
    pub max_windows: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ScanReport(pub ScanOutcome);

impl Report for ScanReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let outcome = &self.0;
        let mut rows = vec![
            ("Address", outcome.address.to_checksum(None)),
            ("Verified", outcome.verified.to_string()),
        ];
        if let Some(level) = &outcome.level {
            rows.push(("Level", level.clone()));
        }
        if let Some(block) = outcome.matched_block {
            rows.push(("Block", block.to_string()));
        }
        if let Some(tx) = &outcome.transaction_hash {
            rows.push(("Transaction", tx.to_string()));
        }
        rows.push(("Head", outcome.head.to_string()));
        rows.push(("Windows Scanned", outcome.windows_scanned.to_string()));
        if outcome.windows_skipped > 0 {
            rows.push(("Windows Skipped", outcome.windows_skipped.to_string()));
        }
        rows
    }
}

impl ScanArgs {
    pub async fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        let config = match self.apply(ctx.config.clone()) {
            Ok(config) => config,
            Err(e) => return Ok(ctx.finish::<ScanReport>("scan", Err(e))),
        };

        let provider = match JsonRpcProvider::with_timeout(&config.rpc_url, config.scan_timeout()) {
            Ok(provider) => provider,
            Err(e) => {
                let error = ScanError::Provider(e).into();
                return Ok(ctx.finish::<ScanReport>("scan", Err(error)));
            }
        };
        ctx.formatter.progress(&format!("scanning {} via {}", self.address, config.rpc_url));

        let result = run_scan(provider, &config, &self.address).await;
        Ok(scan_exit_code(ctx, result))
    }

    /// Layer command-line flags over the loaded configuration.
    fn apply(&self, mut config: AttestConfig) -> Result<AttestConfig, CoreError> {
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(mailbox) = &self.mailbox {
            config.mailbox_address = Some(mailbox.clone());
        }
        if let Some(block) = self.start_block {
            config.start_block = block;
        }
        if let Some(span) = self.max_span {
            config.max_span = span;
        }
        if let Some(publisher) = &self.trusted_publisher {
            config.trusted_publisher = Some(publisher.clone());
        }
        if let Some(policy) = self.window_failure {
            config.window_failure = policy;
        }
        if let Some(secs) = self.timeout_secs {
            config.scan_timeout_secs = secs;
        }
        if let Some(windows) = self.max_windows {
            config.max_windows = windows;
        }
        config.validate()?;
        Ok(config)
    }
}

pub(crate) async fn run_scan<P: LogProvider>(
    provider: P,
    config: &AttestConfig,
    address: &str,
) -> Result<ScanReport, CoreError> {
    let scanner = ProofScanner::new(provider, config.scan_config()?);
    let outcome = scanner.verify(address.trim()).await?;
    info!(
        address = %outcome.address,
        verified = outcome.verified,
        windows = outcome.windows_scanned,
        "scan finished"
    );
    Ok(ScanReport(outcome))
}

/// Success only when the address is attested.
fn scan_exit_code(ctx: &Context, result: Result<ScanReport, CoreError>) -> ExitCode {
    let verified = matches!(&result, Ok(report) if report.0.verified);
    match ctx.finish("scan", result) {
        ExitCode::Success if !verified => ExitCode::NotVerified,
        code => code,
    }
}
