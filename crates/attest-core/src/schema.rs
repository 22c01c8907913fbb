//! Attestation tier selection.
//!
//! A [`SchemaPolicy`] is an ordered list of rules, each naming a JSON
//! pointer into the signed message and the tier it grants when the value
//! there is truthy. The first matching rule wins; otherwise the baseline
//! tier applies. Selection never fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Published attestation tier. The string forms are what lands on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchemaTag {
    #[serde(rename = "kyc-level-1")]
    KycLevel1,
    #[serde(rename = "kyc-level-2")]
    KycLevel2,
}

impl SchemaTag {
    pub const ALL: [SchemaTag; 2] = [SchemaTag::KycLevel1, SchemaTag::KycLevel2];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaTag::KycLevel1 => "kyc-level-1",
            SchemaTag::KycLevel2 => "kyc-level-2",
        }
    }

    /// Numeric level, as shown to verifiers.
    pub fn level(&self) -> u8 {
        match self {
            SchemaTag::KycLevel1 => 1,
            SchemaTag::KycLevel2 => 2,
        }
    }
}

impl std::fmt::Display for SchemaTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchemaTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("unknown schema tag: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRule {
    /// RFC 6901 pointer into the parsed message
    pub pointer: String,
    pub tag: SchemaTag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPolicy {
    rules: Vec<SchemaRule>,
    baseline: SchemaTag,
}

impl Default for SchemaPolicy {
    /// `/form/ssn` present and truthy grants level 2; everything else is level 1.
    fn default() -> Self {
        Self::new(SchemaTag::KycLevel1).with_rule("/form/ssn", SchemaTag::KycLevel2)
    }
}

impl SchemaPolicy {
    pub fn new(baseline: SchemaTag) -> Self {
        Self {
            rules: Vec::new(),
            baseline,
        }
    }

    /// Append a rule. Earlier rules take precedence.
    pub fn with_rule(mut self, pointer: impl Into<String>, tag: SchemaTag) -> Self {
        self.rules.push(SchemaRule {
            pointer: pointer.into(),
            tag,
        });
        self
    }

    pub fn rules(&self) -> &[SchemaRule] {
        &self.rules
    }

    /// Pick a tier for a signed message. Unparseable messages get
    /// `fallback`, or the baseline when no fallback is given.
    pub fn select(&self, message: &str, fallback: Option<SchemaTag>) -> SchemaTag {
        let Ok(parsed) = serde_json::from_str::<Value>(message) else {
            return fallback.unwrap_or(self.baseline);
        };
        self.rules
            .iter()
            .find(|rule| parsed.pointer(&rule.pointer).is_some_and(is_truthy))
            .map(|rule| rule.tag)
            .unwrap_or(self.baseline)
    }
}

/// Select a tier under the default KYC policy.
pub fn select_schema(message: &str, fallback: Option<SchemaTag>) -> SchemaTag {
    SchemaPolicy::default().select(message, fallback)
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy, everything else
/// (including empty objects and arrays) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
