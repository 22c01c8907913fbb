//! Chain log access.
//!
//! The scanner only needs two calls from a chain node: the head block number
//! and a filtered log query. [`LogProvider`] is that seam. The JSON-RPC
//! implementation lives in `http_provider`; [`InMemoryLogProvider`] serves
//! tests and offline demos.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::errors::ProviderError;

/// One log record as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default, deserialize_with = "quantity_opt")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "quantity_opt")]
    pub log_index: Option<u64>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
}

impl LogEntry {
    pub fn new(address: Address, topics: Vec<B256>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
            block_number: None,
            log_index: None,
            transaction_hash: None,
        }
    }

    pub fn at_block(mut self, block: u64) -> Self {
        self.block_number = Some(block);
        self
    }
}

/// Parse a JSON-RPC hex quantity (`0x1a`).
pub fn parse_quantity(text: &str) -> Result<u64, ProviderError> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| ProviderError::BadResponse(format!("quantity without 0x prefix: {text}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| ProviderError::BadResponse(format!("invalid quantity {text}: {e}")))
}

fn quantity_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|text| parse_quantity(&text).map_err(serde::de::Error::custom))
        .transpose()
}

/// Constraint on one topic position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicFilter {
    Any,
    Exact(B256),
    OneOf(Vec<B256>),
}

impl TopicFilter {
    fn accepts(&self, topic: Option<&B256>) -> bool {
        match self {
            TopicFilter::Any => true,
            TopicFilter::Exact(want) => topic == Some(want),
            TopicFilter::OneOf(set) => topic.is_some_and(|t| set.contains(t)),
        }
    }

    fn to_rpc(&self) -> Value {
        match self {
            TopicFilter::Any => Value::Null,
            TopicFilter::Exact(topic) => json!(topic),
            TopicFilter::OneOf(set) => json!(set),
        }
    }
}

/// `eth_getLogs` filter over an inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub from_block: u64,
    pub to_block: u64,
    pub topics: Vec<TopicFilter>,
}

impl LogFilter {
    pub fn matches(&self, log: &LogEntry) -> bool {
        log.address == self.address
            && log
                .block_number
                .is_some_and(|b| (self.from_block..=self.to_block).contains(&b))
            && self
                .topics
                .iter()
                .enumerate()
                .all(|(i, filter)| filter.accepts(log.topics.get(i)))
    }

    pub fn to_rpc_params(&self) -> Value {
        json!([{
            "address": self.address,
            "fromBlock": format!("{:#x}", self.from_block),
            "toBlock": format!("{:#x}", self.to_block),
            "topics": self.topics.iter().map(TopicFilter::to_rpc).collect::<Vec<_>>(),
        }])
    }
}

/// Read access to chain logs.
#[async_trait]
pub trait LogProvider: Send + Sync {
    async fn block_number(&self) -> Result<u64, ProviderError>;

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, ProviderError>;
}

#[async_trait]
impl<T: LogProvider + ?Sized> LogProvider for Arc<T> {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        (**self).block_number().await
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, ProviderError> {
        (**self).get_logs(filter).await
    }
}

// ============================================================================
// In-memory provider
// ============================================================================

#[derive(Default)]
struct MemoryState {
    head: u64,
    logs: Vec<LogEntry>,
    failing_blocks: Vec<u64>,
    failing_topics: Vec<(usize, B256)>,
    head_unavailable: bool,
    queries: Vec<LogFilter>,
    head_calls: usize,
}

/// Log provider backed by a vector, recording every query it serves.
pub struct InMemoryLogProvider {
    state: Mutex<MemoryState>,
    latency: Duration,
}

impl InMemoryLogProvider {
    pub fn new(head: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                head,
                ..Default::default()
            }),
            latency: Duration::ZERO,
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_log(&self, log: LogEntry) {
        self.state.lock().logs.push(log);
    }

    /// Make every log query whose range covers `block` fail.
    pub fn fail_block(&self, block: u64) {
        self.state.lock().failing_blocks.push(block);
    }

    /// Make every log query that pins topic `position` to exactly `topic` fail.
    pub fn fail_topic(&self, position: usize, topic: B256) {
        self.state.lock().failing_topics.push((position, topic));
    }

    /// Make `block_number` fail.
    pub fn fail_head(&self) {
        self.state.lock().head_unavailable = true;
    }

    pub fn get_logs_calls(&self) -> usize {
        self.state.lock().queries.len()
    }

    pub fn block_number_calls(&self) -> usize {
        self.state.lock().head_calls
    }

    /// Distinct block ranges queried, in query order.
    pub fn windows_queried(&self) -> Vec<(u64, u64)> {
        let mut windows: Vec<(u64, u64)> = Vec::new();
        for q in self.state.lock().queries.iter() {
            let range = (q.from_block, q.to_block);
            if windows.last() != Some(&range) {
                windows.push(range);
            }
        }
        windows
    }
}

#[async_trait]
impl LogProvider for InMemoryLogProvider {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        let mut state = self.state.lock();
        state.head_calls += 1;
        if state.head_unavailable {
            return Err(ProviderError::Http("connection refused".to_string()));
        }
        Ok(state.head)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, ProviderError> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        let mut state = self.state.lock();
        state.queries.push(filter.clone());

        let range = filter.from_block..=filter.to_block;
        let pinned = |&(i, topic): &(usize, B256)| {
            filter.topics.get(i) == Some(&TopicFilter::Exact(topic))
        };
        if state.failing_blocks.iter().any(|b| range.contains(b))
            || state.failing_topics.iter().any(pinned)
        {
            return Err(ProviderError::Rpc {
                code: -32005,
                message: format!(
                    "query for blocks {}..={} failed",
                    filter.from_block, filter.to_block
                ),
            });
        }

        Ok(state
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert!(parse_quantity("1b4").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_log_entry_from_rpc_json() {
        let raw = json!({
            "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "topics": [format!("0x{}", hex::encode(topic(1))), format!("0x{}", hex::encode(topic(2)))],
            "data": "0x0102",
            "blockNumber": "0x10",
            "logIndex": "0x0",
            "transactionHash": format!("0x{}", hex::encode(topic(3))),
            "removed": false
        });
        let log: LogEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(log.block_number, Some(16));
        assert_eq!(log.topics, vec![topic(1), topic(2)]);
        assert_eq!(log.data.as_ref(), &[1u8, 2]);
        assert_eq!(log.transaction_hash, Some(topic(3)));
    }

    #[test]
    fn test_filter_topic_positions() {
        let log = LogEntry::new(Address::ZERO, vec![topic(1), topic(2), topic(3)], Bytes::new())
            .at_block(5);
        let filter = |topics| LogFilter {
            address: Address::ZERO,
            from_block: 0,
            to_block: 10,
            topics,
        };

        use TopicFilter::{Any, Exact, OneOf};
        assert!(filter(vec![OneOf(vec![topic(9), topic(1)])]).matches(&log));
        assert!(filter(vec![Any, Any, Exact(topic(3))]).matches(&log));
        assert!(!filter(vec![Any, Exact(topic(3))]).matches(&log));
        assert!(!filter(vec![Any, Any, Any, Exact(topic(4))]).matches(&log));

        let mut out_of_range = filter(vec![]);
        out_of_range.from_block = 6;
        assert!(!out_of_range.matches(&log));
    }

    #[test]
    fn test_rpc_params_shape() {
        let params = LogFilter {
            address: Address::ZERO,
            from_block: 16,
            to_block: 31,
            topics: vec![
                TopicFilter::OneOf(vec![topic(1)]),
                TopicFilter::Any,
                TopicFilter::Exact(topic(2)),
            ],
        }
        .to_rpc_params();

        assert_eq!(params[0]["fromBlock"], "0x10");
        assert_eq!(params[0]["toBlock"], "0x1f");
        assert!(params[0]["topics"][0].is_array());
        assert!(params[0]["topics"][1].is_null());
        assert_eq!(params[0]["topics"][2], json!(topic(2)));
    }

    #[tokio::test]
    async fn test_in_memory_provider_records_queries() {
        let provider = InMemoryLogProvider::new(100);
        provider.push_log(LogEntry::new(Address::ZERO, vec![topic(1)], Bytes::new()).at_block(50));
        provider.fail_block(10);

        assert_eq!(provider.block_number().await.unwrap(), 100);

        let hit = LogFilter {
            address: Address::ZERO,
            from_block: 40,
            to_block: 60,
            topics: vec![TopicFilter::Exact(topic(1))],
        };
        assert_eq!(provider.get_logs(&hit).await.unwrap().len(), 1);

        let failing = LogFilter {
            from_block: 0,
            to_block: 20,
            ..hit.clone()
        };
        assert!(provider.get_logs(&failing).await.is_err());

        assert_eq!(provider.get_logs_calls(), 2);
        assert_eq!(provider.windows_queried(), vec![(40, 60), (0, 20)]);
    }

    #[tokio::test]
    async fn test_in_memory_provider_fails_pinned_topic() {
        let provider = InMemoryLogProvider::new(100);
        let log = LogEntry::new(Address::ZERO, vec![topic(1), topic(2)], Bytes::new());
        provider.push_log(log.at_block(50));
        provider.fail_topic(1, topic(2));

        let pinned = LogFilter {
            address: Address::ZERO,
            from_block: 0,
            to_block: 100,
            topics: vec![TopicFilter::Any, TopicFilter::Exact(topic(2))],
        };
        assert!(provider.get_logs(&pinned).await.is_err());

        let open = LogFilter {
            topics: vec![TopicFilter::Exact(topic(1))],
            ..pinned
        };
        assert_eq!(provider.get_logs(&open).await.unwrap().len(), 1);
    }
}
