//! Proof-of-attestation scan over mailbox logs.
//!
//! Walks backward from the chain head to a start block in windows of at most
//! `max_span` blocks, asking the provider for mailbox events in which the
//! address appears as `from` or `to`. The newest window holding a match
//! decides the answer. Within a window, `from`-matches precede `to`-matches
//! regardless of their block order.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{ProviderError, ScanError};
use crate::mailbox::{address_topic, event_signatures, level_of};
use crate::provider::{LogEntry, LogFilter, LogProvider, TopicFilter};
use crate::schema::SchemaTag;

pub const DEFAULT_MAX_SPAN: u64 = 30;
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_WINDOWS: u64 = 100_000;

/// Check `0x` + 40 hex digits. Mixed-case input must carry a valid EIP-55
/// checksum; all-lowercase and all-uppercase input is accepted as is.
pub fn validate_address(input: &str) -> Result<Address, ScanError> {
    let invalid = || ScanError::Validation(format!("invalid EVM address: {input:?}"));

    let digits = input.strip_prefix("0x").ok_or_else(invalid)?;
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let mut raw = [0u8; 20];
    hex::decode_to_slice(digits, &mut raw).map_err(|_| invalid())?;
    let address = Address::from(raw);

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum(None) != input {
        return Err(ScanError::Validation(format!(
            "bad address checksum: {input:?}"
        )));
    }
    Ok(address)
}

/// What to do when one window's log query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFailurePolicy {
    /// Log, count the window as skipped, and continue with older blocks
    #[default]
    Skip,
    /// Stop the scan with `ScanError::Window`
    Abort,
}

impl FromStr for WindowFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            _ => Err(format!("unknown window failure policy: {s} (expected skip or abort)")),
        }
    }
}

impl std::fmt::Display for WindowFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub mailbox: Address,
    /// Oldest block searched (inclusive)
    pub start_block: u64,
    /// Largest block span per log query
    pub max_span: u64,
    /// Only count events emitted by this issuer
    pub trusted_publisher: Option<Address>,
    pub window_failure: WindowFailurePolicy,
    /// Deadline for the whole scan
    pub timeout: Duration,
    /// Most windows one scan may visit
    pub max_windows: u64,
}

impl ScanConfig {
    pub fn new(mailbox: Address) -> Self {
        Self {
            mailbox,
            start_block: 0,
            max_span: DEFAULT_MAX_SPAN,
            trusted_publisher: None,
            window_failure: WindowFailurePolicy::default(),
            timeout: DEFAULT_SCAN_TIMEOUT,
            max_windows: DEFAULT_MAX_WINDOWS,
        }
    }

    pub fn with_start_block(mut self, start_block: u64) -> Self {
        self.start_block = start_block;
        self
    }

    pub fn with_max_span(mut self, max_span: u64) -> Self {
        self.max_span = max_span;
        self
    }

    pub fn with_trusted_publisher(mut self, publisher: Address) -> Self {
        self.trusted_publisher = Some(publisher);
        self
    }

    pub fn with_window_failure(mut self, policy: WindowFailurePolicy) -> Self {
        self.window_failure = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_windows(mut self, max_windows: u64) -> Self {
        self.max_windows = max_windows;
        self
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.max_span == 0 {
            return Err(ScanError::InvalidConfig("max_span must be at least 1".to_string()));
        }
        if self.max_windows == 0 {
            return Err(ScanError::InvalidConfig("max_windows must be at least 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig("timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Result of a completed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub address: Address,
    pub verified: bool,
    /// Schema string of the first matching event, or `"1"` when it could
    /// not be decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    pub head: u64,
    pub windows_scanned: u64,
    pub windows_skipped: u64,
}

impl ScanOutcome {
    fn unverified(address: Address, head: u64) -> Self {
        Self {
            address,
            verified: false,
            level: None,
            matched_block: None,
            transaction_hash: None,
            head,
            windows_scanned: 0,
            windows_skipped: 0,
        }
    }

    /// The level as a known schema tag, when it is one.
    pub fn level_tag(&self) -> Option<SchemaTag> {
        self.level.as_deref().and_then(|level| level.parse().ok())
    }
}

/// Answers "has this address been attested, and at what level?".
pub struct ProofScanner<P> {
    provider: P,
    config: ScanConfig,
}

impl<P: LogProvider> ProofScanner<P> {
    pub fn new(provider: P, config: ScanConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Scan for attestations involving `address`.
    ///
    /// Address and configuration are validated before any provider call.
    /// The scan runs on the caller's task; if the deadline passes, the scan
    /// future is dropped and no query keeps running.
    pub async fn verify(&self, address: &str) -> Result<ScanOutcome, ScanError> {
        let address = validate_address(address)?;
        self.config.validate()?;

        let deadline = self.config.timeout;
        match tokio::time::timeout(deadline, self.scan(address)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%address, ?deadline, "proof scan timed out");
                Err(ScanError::Timeout(deadline))
            }
        }
    }

    async fn scan(&self, address: Address) -> Result<ScanOutcome, ScanError> {
        let head = self
            .provider
            .block_number()
            .await
            .map_err(ScanError::Provider)?;
        let start = self.config.start_block;
        let mut outcome = ScanOutcome::unverified(address, head);

        if head < start {
            info!(%address, head, start, "start block is above chain head, nothing to scan");
            return Ok(outcome);
        }

        let mut to = head;
        loop {
            if outcome.windows_scanned + outcome.windows_skipped >= self.config.max_windows {
                warn!(
                    %address,
                    budget = self.config.max_windows,
                    next_block = to,
                    "window budget exhausted"
                );
                return Err(ScanError::WindowBudgetExceeded {
                    budget: self.config.max_windows,
                    stopped_above: to,
                });
            }

            // 1 <= span <= to - start + 1
            let span = self.config.max_span.min((to - start).saturating_add(1));
            let from = to - (span - 1);
            debug!(%address, from, to, "querying window");

            match self.query_window(address, from, to).await {
                Ok(Some(log)) => {
                    outcome.windows_scanned += 1;
                    outcome.verified = true;
                    outcome.level = Some(level_of(&log));
                    outcome.matched_block = log.block_number;
                    outcome.transaction_hash = log.transaction_hash;
                    info!(
                        %address,
                        level = outcome.level.as_deref().unwrap_or_default(),
                        block = ?outcome.matched_block,
                        windows = outcome.windows_scanned,
                        "attestation found"
                    );
                    return Ok(outcome);
                }
                Ok(None) => outcome.windows_scanned += 1,
                Err(source) => match self.config.window_failure {
                    WindowFailurePolicy::Skip => {
                        warn!(%address, from, to, error = %source, "window query failed, skipping");
                        outcome.windows_skipped += 1;
                    }
                    WindowFailurePolicy::Abort => {
                        return Err(ScanError::Window {
                            from_block: from,
                            to_block: to,
                            source,
                        });
                    }
                },
            }

            if from == start {
                break;
            }
            to = from - 1;
        }

        info!(
            %address,
            scanned = outcome.windows_scanned,
            skipped = outcome.windows_skipped,
            "no attestation found"
        );
        Ok(outcome)
    }

    /// Run the `from` and `to` queries for one window concurrently and
    /// return the first log, `from`-results first.
    ///
    /// A match from either query stands even when the other one failed. The
    /// window only fails when no match was seen and a query errored.
    async fn query_window(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Option<LogEntry>, ProviderError> {
        let signatures = TopicFilter::OneOf(event_signatures().to_vec());
        let party = TopicFilter::Exact(address_topic(address));
        let trusted = self.config.trusted_publisher;

        // With a trusted publisher, a `from` match only counts when the
        // address is that publisher.
        let from_filter = match trusted {
            Some(publisher) if publisher != address => None,
            _ => Some(LogFilter {
                address: self.config.mailbox,
                from_block,
                to_block,
                topics: vec![signatures.clone(), party.clone()],
            }),
        };
        let to_filter = LogFilter {
            address: self.config.mailbox,
            from_block,
            to_block,
            topics: vec![
                signatures,
                trusted.map_or(TopicFilter::Any, |p| TopicFilter::Exact(address_topic(p))),
                party,
            ],
        };

        let from_query = async {
            match &from_filter {
                Some(filter) => self.provider.get_logs(filter).await,
                None => Ok(Vec::new()),
            }
        };
        let (from_logs, to_logs) = tokio::join!(from_query, self.provider.get_logs(&to_filter));

        first_match(from_logs, to_logs)
    }
}

fn first_match(
    from_logs: Result<Vec<LogEntry>, ProviderError>,
    to_logs: Result<Vec<LogEntry>, ProviderError>,
) -> Result<Option<LogEntry>, ProviderError> {
    let from_error = match from_logs {
        Ok(logs) => match logs.into_iter().next() {
            Some(log) => return Ok(Some(log)),
            None => None,
        },
        Err(e) => Some(e),
    };
    match (to_logs?.into_iter().next(), from_error) {
        (Some(log), _) => Ok(Some(log)),
        (None, Some(e)) => Err(e),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address_shapes() {
        let lower = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
        let checksummed = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
        assert_eq!(validate_address(lower).unwrap(), validate_address(checksummed).unwrap());
        assert!(validate_address("0x5FBDB2315678AFECB367F032D93F642F64180AA3").is_ok());

        for bad in [
            "",
            "0x",
            "5fbdb2315678afecb367f032d93f642f64180aa3",
            "0X5fbdb2315678afecb367f032d93f642f64180aa3",
            "0x5fbdb2315678afecb367f032d93f642f64180aa",
            "0x5fbdb2315678afecb367f032d93f642f64180aa3f",
            "0x5fbdb2315678afecb367f032d93f642f64180zz3",
            " 0x5fbdb2315678afecb367f032d93f642f64180aa3",
        ] {
            assert!(matches!(validate_address(bad), Err(ScanError::Validation(_))), "{bad:?}");
        }
    }

    #[test]
    fn test_bad_checksum_is_rejected() {
        // Checksummed form with one letter's case flipped.
        let flipped = "0x5fbDB2315678afecb367f032d93F642f64180aa3";
        assert!(matches!(validate_address(flipped), Err(ScanError::Validation(_))));
    }

    fn log_at(block: u64) -> LogEntry {
        LogEntry::new(Address::ZERO, Vec::new(), Default::default()).at_block(block)
    }

    fn rpc_failure() -> ProviderError {
        ProviderError::Rpc {
            code: -32005,
            message: "limit exceeded".to_string(),
        }
    }

    #[test]
    fn test_first_match_keeps_hit_beside_failed_query() {
        let hit = first_match(Ok(vec![log_at(50)]), Err(rpc_failure())).unwrap();
        assert_eq!(hit.and_then(|log| log.block_number), Some(50));

        let hit = first_match(Err(rpc_failure()), Ok(vec![log_at(40)])).unwrap();
        assert_eq!(hit.and_then(|log| log.block_number), Some(40));
    }

    #[test]
    fn test_first_match_orders_and_fails() {
        let hit = first_match(Ok(vec![log_at(3)]), Ok(vec![log_at(29)])).unwrap();
        assert_eq!(hit.and_then(|log| log.block_number), Some(3));

        assert_eq!(first_match(Ok(vec![]), Ok(vec![])).unwrap(), None);
        assert!(first_match(Ok(vec![]), Err(rpc_failure())).is_err());
        assert!(first_match(Err(rpc_failure()), Ok(vec![])).is_err());
    }

    #[test]
    fn test_config_validation() {
        let base = ScanConfig::new(Address::ZERO);
        assert!(base.validate().is_ok());
        assert!(matches!(
            base.clone().with_max_span(0).validate(),
            Err(ScanError::InvalidConfig(_))
        ));
        assert!(matches!(
            base.clone().with_max_windows(0).validate(),
            Err(ScanError::InvalidConfig(_))
        ));
        assert!(matches!(
            base.with_timeout(Duration::ZERO).validate(),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Abort".parse::<WindowFailurePolicy>().unwrap(), WindowFailurePolicy::Abort);
        assert_eq!(WindowFailurePolicy::default().to_string(), "skip");
        assert!("retry".parse::<WindowFailurePolicy>().is_err());
    }

    #[test]
    fn test_level_tag() {
        let mut outcome = ScanOutcome::unverified(Address::ZERO, 0);
        assert_eq!(outcome.level_tag(), None);
        outcome.level = Some("kyc-level-2".into());
        assert_eq!(outcome.level_tag(), Some(SchemaTag::KycLevel2));
        outcome.level = Some("1".into());
        assert_eq!(outcome.level_tag(), None);
    }
}
