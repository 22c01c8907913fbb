use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ConfigError;
use crate::scanner::{
    validate_address, ScanConfig, WindowFailurePolicy, DEFAULT_MAX_SPAN, DEFAULT_MAX_WINDOWS,
    DEFAULT_SCAN_TIMEOUT,
};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `warn` or `attest_core=debug`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Settings shared by the CLI subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestConfig {
    pub rpc_url: String,
    /// Required for scans
    pub mailbox_address: Option<String>,
    pub start_block: u64,
    pub max_span: u64,
    pub trusted_publisher: Option<String>,
    pub window_failure: WindowFailurePolicy,
    pub scan_timeout_secs: u64,
    pub max_windows: u64,
    /// Associated data bound into sealed submissions (UTF-8)
    pub aad: Option<String>,
    pub logging: LoggingConfig,
}

impl Default for AttestConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            mailbox_address: None,
            start_block: 0,
            max_span: DEFAULT_MAX_SPAN,
            trusted_publisher: None,
            window_failure: WindowFailurePolicy::default(),
            scan_timeout_secs: DEFAULT_SCAN_TIMEOUT.as_secs(),
            max_windows: DEFAULT_MAX_WINDOWS,
            aad: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl AttestConfig {
    /// Defaults overridden by `ATTEST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// File (when given), then environment, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_toml(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ATTEST_RPC_URL") {
            self.rpc_url = url;
        }
        if let Some(addr) = lookup("ATTEST_MAILBOX_ADDRESS") {
            self.mailbox_address = Some(addr);
        }
        if let Some(block) = lookup("ATTEST_START_BLOCK") {
            self.start_block = parse_number("ATTEST_START_BLOCK", &block)?;
        }
        if let Some(span) = lookup("ATTEST_MAX_SPAN") {
            self.max_span = parse_number("ATTEST_MAX_SPAN", &span)?;
        }
        if let Some(addr) = lookup("ATTEST_TRUSTED_PUBLISHER") {
            self.trusted_publisher = Some(addr);
        }
        if let Some(policy) = lookup("ATTEST_WINDOW_FAILURE") {
            self.window_failure = policy.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(secs) = lookup("ATTEST_SCAN_TIMEOUT_SECS") {
            self.scan_timeout_secs = parse_number("ATTEST_SCAN_TIMEOUT_SECS", &secs)?;
        }
        if let Some(windows) = lookup("ATTEST_MAX_WINDOWS") {
            self.max_windows = parse_number("ATTEST_MAX_WINDOWS", &windows)?;
        }
        if let Some(aad) = lookup("ATTEST_AAD") {
            self.aad = Some(aad);
        }
        if let Some(level) = lookup("ATTEST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "rpc_url must be an http(s) URL, got {:?}",
                self.rpc_url
            )));
        }
        if self.max_span == 0 {
            return Err(ConfigError::Invalid("max_span must be > 0".to_string()));
        }
        if self.max_windows == 0 {
            return Err(ConfigError::Invalid("max_windows must be > 0".to_string()));
        }
        if self.scan_timeout_secs == 0 {
            return Err(ConfigError::Invalid("scan_timeout_secs must be > 0".to_string()));
        }
        if let Some(addr) = &self.mailbox_address {
            parse_config_address("mailbox_address", addr)?;
        }
        if let Some(addr) = &self.trusted_publisher {
            parse_config_address("trusted_publisher", addr)?;
        }
        if self.start_block == 0 {
            warn!(
                max_windows = self.max_windows,
                timeout_secs = self.scan_timeout_secs,
                "start_block is 0; scans walk back to genesis, bounded by the window budget and timeout"
            );
        }
        Ok(())
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn aad_bytes(&self) -> Option<&[u8]> {
        self.aad.as_deref().map(str::as_bytes)
    }

    /// Scanner settings. Fails when no mailbox address is configured.
    pub fn scan_config(&self) -> Result<ScanConfig, ConfigError> {
        let mailbox = self
            .mailbox_address
            .as_deref()
            .ok_or_else(|| {
                ConfigError::Invalid("mailbox_address is required for scans".to_string())
            })
            .and_then(|addr| parse_config_address("mailbox_address", addr))?;

        let mut config = ScanConfig::new(mailbox)
            .with_start_block(self.start_block)
            .with_max_span(self.max_span)
            .with_window_failure(self.window_failure)
            .with_timeout(self.scan_timeout())
            .with_max_windows(self.max_windows);
        if let Some(addr) = &self.trusted_publisher {
            let publisher = parse_config_address("trusted_publisher", addr)?;
            config = config.with_trusted_publisher(publisher);
        }
        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{key}={value:?}: {e}")))
}

fn parse_config_address(key: &str, value: &str) -> Result<Address, ConfigError> {
    validate_address(value).map_err(|e| ConfigError::Invalid(format!("{key}: {e}")))
}
