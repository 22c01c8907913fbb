//! Mailbox contract ABI.
//!
//! The contract emits one event per published attestation. `from` and `to`
//! are indexed, so a verifier can filter logs by either party without
//! reading event data.

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::{sol, SolCall, SolEvent};

use crate::errors::{MailboxError, PublishError};
use crate::provider::LogEntry;
use crate::schema::SchemaTag;

sol! {
    #![sol(all_derives)]

    event MessageJSON(address indexed from, address indexed to, string schema, string json);
    event MessageKV(address indexed from, address indexed to, string schema, string[] fieldKeys, string[] fieldValues);

    function sendJson(address to, string schema, string json) external;
    function sendKV(address to, string schema, string[] fieldKeys, string[] fieldValues) external;
}

/// Level reported when a matching log cannot be decoded or carries an empty
/// schema.
pub const FALLBACK_LEVEL: &str = "1";

/// Topic-0 values of both mailbox events.
pub fn event_signatures() -> [B256; 2] {
    [MessageJSON::SIGNATURE_HASH, MessageKV::SIGNATURE_HASH]
}

/// Left-pad an address to a 32-byte indexed topic.
pub fn address_topic(address: Address) -> B256 {
    address.into_word()
}

/// A decoded mailbox log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxEvent {
    Json {
        from: Address,
        to: Address,
        schema: String,
        json: String,
    },
    /// Key and value arrays are kept as emitted; their lengths may differ.
    KeyValue {
        from: Address,
        to: Address,
        schema: String,
        field_keys: Vec<String>,
        field_values: Vec<String>,
    },
}

impl MailboxEvent {
    pub fn from(&self) -> Address {
        match self {
            MailboxEvent::Json { from, .. } | MailboxEvent::KeyValue { from, .. } => *from,
        }
    }

    pub fn to(&self) -> Address {
        match self {
            MailboxEvent::Json { to, .. } | MailboxEvent::KeyValue { to, .. } => *to,
        }
    }

    pub fn schema(&self) -> &str {
        match self {
            MailboxEvent::Json { schema, .. } | MailboxEvent::KeyValue { schema, .. } => schema,
        }
    }

    /// Paired key/value fields, stopping at the shorter array.
    pub fn fields(&self) -> Vec<(&str, &str)> {
        match self {
            MailboxEvent::Json { .. } => Vec::new(),
            MailboxEvent::KeyValue {
                field_keys,
                field_values,
                ..
            } => field_keys
                .iter()
                .zip(field_values)
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        }
    }
}

pub fn decode_mailbox_event(log: &LogEntry) -> Result<MailboxEvent, MailboxError> {
    let topic0 = *log.topics.first().ok_or(MailboxError::NoTopics)?;
    let topics = log.topics.iter().copied();

    if topic0 == MessageJSON::SIGNATURE_HASH {
        let ev = MessageJSON::decode_raw_log(topics, &log.data, true)
            .map_err(|e| MailboxError::Decode(e.to_string()))?;
        Ok(MailboxEvent::Json {
            from: ev.from,
            to: ev.to,
            schema: ev.schema,
            json: ev.json,
        })
    } else if topic0 == MessageKV::SIGNATURE_HASH {
        let ev = MessageKV::decode_raw_log(topics, &log.data, true)
            .map_err(|e| MailboxError::Decode(e.to_string()))?;
        Ok(MailboxEvent::KeyValue {
            from: ev.from,
            to: ev.to,
            schema: ev.schema,
            field_keys: ev.fieldKeys,
            field_values: ev.fieldValues,
        })
    } else {
        Err(MailboxError::UnknownEvent(topic0))
    }
}

/// Attestation level carried by a matching log.
pub fn level_of(log: &LogEntry) -> String {
    match decode_mailbox_event(log) {
        Ok(event) if !event.schema().is_empty() => event.schema().to_string(),
        _ => FALLBACK_LEVEL.to_string(),
    }
}

/// ABI-encoded call to publish an attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishCall {
    Json(sendJsonCall),
    KeyValue(sendKVCall),
}

impl PublishCall {
    pub fn json(to: Address, schema: SchemaTag, json: impl Into<String>) -> Self {
        PublishCall::Json(sendJsonCall {
            to,
            schema: schema.as_str().to_string(),
            json: json.into(),
        })
    }

    /// The contract reverts on unequal arrays, so they are rejected here.
    pub fn kv(
        to: Address,
        schema: SchemaTag,
        field_keys: Vec<String>,
        field_values: Vec<String>,
    ) -> Result<Self, PublishError> {
        if field_keys.len() != field_values.len() {
            return Err(PublishError::FieldLengthMismatch {
                keys: field_keys.len(),
                values: field_values.len(),
            });
        }
        Ok(PublishCall::KeyValue(sendKVCall {
            to,
            schema: schema.as_str().to_string(),
            fieldKeys: field_keys,
            fieldValues: field_values,
        }))
    }

    pub fn function_signature(&self) -> &'static str {
        match self {
            PublishCall::Json(_) => sendJsonCall::SIGNATURE,
            PublishCall::KeyValue(_) => sendKVCall::SIGNATURE,
        }
    }

    pub fn selector(&self) -> [u8; 4] {
        match self {
            PublishCall::Json(_) => sendJsonCall::SELECTOR,
            PublishCall::KeyValue(_) => sendKVCall::SELECTOR,
        }
    }

    pub fn calldata(&self) -> Bytes {
        match self {
            PublishCall::Json(call) => call.abi_encode().into(),
            PublishCall::KeyValue(call) => call.abi_encode().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, keccak256};
    use alloy_sol_types::SolEvent;

    const ALICE: Address = address!("1111111111111111111111111111111111111111");
    const BOB: Address = address!("2222222222222222222222222222222222222222");

    fn json_log(schema: &str) -> LogEntry {
        let ev = MessageJSON {
            from: ALICE,
            to: BOB,
            schema: schema.to_string(),
            json: "0xsig".to_string(),
        };
        LogEntry::new(
            Address::ZERO,
            vec![MessageJSON::SIGNATURE_HASH, address_topic(ALICE), address_topic(BOB)],
            ev.encode_data().into(),
        )
    }

    #[test]
    fn test_event_signatures_match_declarations() {
        assert_eq!(
            event_signatures(),
            [
                keccak256("MessageJSON(address,address,string,string)"),
                keccak256("MessageKV(address,address,string,string[],string[])"),
            ]
        );
    }

    #[test]
    fn test_decode_json_event() {
        let event = decode_mailbox_event(&json_log("kyc-level-2")).unwrap();
        assert_eq!(event.from(), ALICE);
        assert_eq!(event.to(), BOB);
        assert_eq!(event.schema(), "kyc-level-2");
        assert!(event.fields().is_empty());
    }

    #[test]
    fn test_decode_kv_event_with_unequal_arrays() {
        let ev = MessageKV {
            from: ALICE,
            to: BOB,
            schema: "kyc-level-1".into(),
            fieldKeys: vec!["name".into(), "country".into()],
            fieldValues: vec!["Jane".into()],
        };
        let log = LogEntry::new(
            Address::ZERO,
            vec![MessageKV::SIGNATURE_HASH, address_topic(ALICE), address_topic(BOB)],
            ev.encode_data().into(),
        );
        let event = decode_mailbox_event(&log).unwrap();
        assert_eq!(event.fields(), vec![("name", "Jane")]);
        match event {
            MailboxEvent::KeyValue { field_keys, field_values, .. } => {
                assert_eq!(field_keys.len(), 2);
                assert_eq!(field_values.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_level_falls_back_on_bad_logs() {
        assert_eq!(level_of(&json_log("kyc-level-1")), "kyc-level-1");
        assert_eq!(level_of(&json_log("")), FALLBACK_LEVEL);

        let mut garbage = json_log("kyc-level-2");
        garbage.data = Bytes::from_static(&[0xde, 0xad]);
        assert_eq!(level_of(&garbage), FALLBACK_LEVEL);

        let unknown = LogEntry::new(Address::ZERO, vec![B256::repeat_byte(7)], Bytes::new());
        assert!(matches!(
            decode_mailbox_event(&unknown),
            Err(MailboxError::UnknownEvent(_))
        ));
        assert_eq!(level_of(&unknown), FALLBACK_LEVEL);
    }

    #[test]
    fn test_kv_rejects_length_mismatch() {
        let err = PublishCall::kv(
            BOB,
            SchemaTag::KycLevel1,
            vec!["a".into(), "b".into()],
            vec!["1".into()],
        )
        .unwrap_err();
        assert_eq!(err, PublishError::FieldLengthMismatch { keys: 2, values: 1 });
    }

    #[test]
    fn test_publish_calldata_starts_with_selector() {
        let call = PublishCall::json(BOB, SchemaTag::KycLevel2, "0xsig");
        let data = call.calldata();
        assert_eq!(call.function_signature(), "sendJson(address,string,string)");
        assert_eq!(&data[..4], &keccak256("sendJson(address,string,string)")[..4]);

        let decoded = sendJsonCall::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.to, BOB);
        assert_eq!(decoded.schema, "kyc-level-2");

        let kv = PublishCall::kv(BOB, SchemaTag::KycLevel1, vec!["k".into()], vec!["v".into()]).unwrap();
        assert_eq!(&kv.calldata()[..4], &kv.selector());
    }
}
