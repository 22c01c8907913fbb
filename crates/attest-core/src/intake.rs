//! Provider-side intake: sealed submission in, publishable attestation out.
//!
//! transport text → open → envelope → signature check → tier

use alloy_primitives::Address;
use attest_crypto::ecies::open;
use attest_crypto::encoding::decode_sealed;
use k256::SecretKey;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::envelope::{verify_envelope, PlaintextEnvelope};
use crate::errors::CoreError;
use crate::mailbox::PublishCall;
use crate::schema::{SchemaPolicy, SchemaTag};

/// A verified submission, ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    /// Address recovered from the envelope signature
    pub signer: Address,
    pub schema: SchemaTag,
    /// `0x` + r + s + v
    pub signature_hex: String,
    pub envelope: PlaintextEnvelope,
}

impl Attestation {
    /// The `sendJson` call recording this attestation for `to`. The signature
    /// string is what goes on chain; the plaintext never does.
    pub fn publish_call(&self, to: Address) -> PublishCall {
        PublishCall::json(to, self.schema, self.signature_hex.clone())
    }
}

/// Holds the recipient key and turns sealed submissions into attestations.
pub struct Intake {
    recipient: SecretKey,
    aad: Option<Vec<u8>>,
    policy: SchemaPolicy,
}

impl Intake {
    pub fn new(recipient: SecretKey) -> Self {
        Self {
            recipient,
            aad: None,
            policy: SchemaPolicy::default(),
        }
    }

    /// Associated data the submitter bound into the seal.
    pub fn with_aad(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.aad = Some(aad.into());
        self
    }

    pub fn with_policy(mut self, policy: SchemaPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Process base64 or base64url transport text.
    pub fn process_transport(&self, sealed_text: &str) -> Result<Attestation, CoreError> {
        let sealed = decode_sealed(sealed_text)?;
        debug!(bytes = sealed.len(), "decoded sealed submission");
        self.process(&sealed)
    }

    pub fn process(&self, sealed: &[u8]) -> Result<Attestation, CoreError> {
        let plaintext = Zeroizing::new(open(sealed, &self.recipient, self.aad.as_deref()).map_err(|e| {
            warn!(error = %e, "failed to open sealed submission");
            e
        })?);

        let envelope = PlaintextEnvelope::from_json_bytes(&plaintext)?;
        let signer = verify_envelope(&envelope).map_err(|e| {
            warn!(declared = %envelope.signer.address, "envelope signature rejected");
            e
        })?;

        let schema = self.policy.select(&envelope.message, None);
        info!(%signer, %schema, "submission verified");

        Ok(Attestation {
            signer,
            schema,
            signature_hex: envelope.signature.to_recovery_hex(),
            envelope,
        })
    }
}
