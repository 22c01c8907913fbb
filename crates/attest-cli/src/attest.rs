//! Envelope commands: `sign`, `verify-envelope`, `schema`, `intake` and
//! `encode-publish`.

use alloy_primitives::Address;
use attest_core::mailbox::PublishCall;
use attest_core::scanner::validate_address;
use attest_core::signer::{build_envelope, LocalWallet, MessageSigner};
use attest_core::{select_schema, CoreError, Intake, PlaintextEnvelope, SchemaTag};
use attest_crypto::ecies::seal_to;
use attest_crypto::encoding::TransportEncoding;
use attest_crypto::keys::{parse_public_key_hex, parse_secret_key_hex};
use clap::Args;
use rand_core::OsRng;
use serde::Serialize;
use serde_json::Value;

use crate::cli::Context;
use crate::input::read_arg;
use crate::output::Report;
use crate::ExitCode;

// ============================================================================
// sign
// ============================================================================

/// Canonicalize a JSON payload and sign it into a plaintext envelope
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Signer secret key (hex)
    #[arg(long, env = "ATTEST_SIGNER_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// JSON payload: literal, @file, or - for stdin
    #[arg(long, short)]
    pub payload: String,

    /// Account identifier recorded in the signer block
    #[arg(long)]
    pub account_id: Option<String>,

    /// Also seal the envelope to this recipient public key
    #[arg(long)]
    pub seal_to: Option<String>,

    /// Transport encoding when sealing
    #[arg(long, default_value = "base64")]
    pub encoding: TransportEncoding,

    /// Associated data when sealing (overrides the configured value)
    #[arg(long)]
    pub aad: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignReport {
    pub address: String,
    pub envelope: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sealed: Option<String>,
}

impl Report for SignReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Signer", self.address.clone()),
            ("Envelope", self.envelope.to_string()),
        ];
        if let Some(sealed) = &self.sealed {
            rows.push(("Sealed", sealed.clone()));
        }
        rows
    }
}

impl SignArgs {
    pub fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        let payload: Value = match serde_json::from_str(&read_arg(&self.payload)?) {
            Ok(payload) => payload,
            Err(e) => {
                let message = format!("payload is not JSON: {e}");
                return Ok(ctx.reject("sign", "InputError", &message));
            }
        };
        let aad = self.aad.as_deref().map(str::as_bytes).or(ctx.config.aad_bytes());
        let seal = self.seal_to.as_deref().map(|to| (to, aad, self.encoding));

        Ok(ctx.finish(
            "sign",
            sign(&self.secret_key, &payload, self.account_id.as_deref(), seal),
        ))
    }
}

type SealRequest<'a> = (&'a str, Option<&'a [u8]>, TransportEncoding);

pub(crate) fn sign(
    secret_hex: &str,
    payload: &Value,
    account_id: Option<&str>,
    seal: Option<SealRequest<'_>>,
) -> Result<SignReport, CoreError> {
    let wallet = LocalWallet::from_secret_hex(secret_hex.trim())?;
    let envelope = build_envelope(&wallet, payload, account_id)?;

    let sealed = match seal {
        Some((to, aad, encoding)) => {
            let recipient = parse_public_key_hex(to.trim())?;
            let sealed = seal_to(&mut OsRng, &recipient, &envelope.to_json_bytes(), aad)?;
            Some(sealed.to_transport(encoding))
        }
        None => None,
    };

    Ok(SignReport {
        address: wallet.address().to_checksum(None),
        envelope: envelope.to_value(),
        sealed,
    })
}

// ============================================================================
// verify-envelope
// ============================================================================

/// Check a plaintext envelope's signature against its declared signer
#[derive(Args, Debug)]
pub struct VerifyEnvelopeArgs {
    /// Envelope JSON: literal, @file, or - for stdin
    #[arg(long, short)]
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub signer: String,
    pub schema: SchemaTag,
    pub level: u8,
}

impl Report for VerifyReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Signer", self.signer.clone()),
            ("Schema", self.schema.to_string()),
            ("Level", self.level.to_string()),
        ]
    }
}

impl VerifyEnvelopeArgs {
    pub fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        let text = read_arg(&self.input)?;
        Ok(ctx.finish("verify-envelope", verify(text.as_bytes())))
    }
}

pub(crate) fn verify(envelope_json: &[u8]) -> Result<VerifyReport, CoreError> {
    let envelope = PlaintextEnvelope::from_json_bytes(envelope_json)?;
    let signer = envelope.verify()?;
    let schema = select_schema(&envelope.message, None);
    Ok(VerifyReport {
        signer: signer.to_checksum(None),
        schema,
        level: schema.level(),
    })
}

// ============================================================================
// schema
// ============================================================================

/// Pick the attestation tier for a signed message
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Message text: literal, @file, or - for stdin
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaReport {
    pub schema: SchemaTag,
    pub level: u8,
}

impl Report for SchemaReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Schema", self.schema.to_string()),
            ("Level", self.level.to_string()),
        ]
    }
}

impl SchemaArgs {
    pub fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        let message = read_arg(&self.message)?;
        let schema = select_schema(&message, None);
        Ok(ctx.finish(
            "schema",
            Ok(SchemaReport {
                schema,
                level: schema.level(),
            }),
        ))
    }
}

// ============================================================================
// intake
// ============================================================================

/// Open, verify and classify a sealed submission, then encode its publish call
#[derive(Args, Debug)]
pub struct IntakeArgs {
    /// Recipient secret key (hex)
    #[arg(long, env = "ATTEST_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Sealed transport text: literal, @file, or - for stdin
    #[arg(long, short)]
    pub input: String,

    /// Associated data (overrides the configured value)
    #[arg(long)]
    pub aad: Option<String>,

    /// Mailbox recipient of the published attestation [default: the signer]
    #[arg(long)]
    pub publish_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IntakeReport {
    pub signer: String,
    pub schema: SchemaTag,
    pub signature: String,
    pub publish_to: String,
    pub function: String,
    pub calldata: String,
}

impl Report for IntakeReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Signer", self.signer.clone()),
            ("Schema", self.schema.to_string()),
            ("Signature", self.signature.clone()),
            ("Publish To", self.publish_to.clone()),
            ("Function", self.function.clone()),
            ("Calldata", self.calldata.clone()),
        ]
    }
}

impl IntakeArgs {
    pub fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        let sealed = read_arg(&self.input)?;
        let aad = self
            .aad
            .as_deref()
            .map(str::as_bytes)
            .or(ctx.config.aad_bytes());
        ctx.formatter.progress("opening submission");
        Ok(ctx.finish(
            "intake",
            intake(&self.secret_key, &sealed, aad, self.publish_to.as_deref()),
        ))
    }
}

pub(crate) fn intake(
    secret_hex: &str,
    sealed: &str,
    aad: Option<&[u8]>,
    publish_to: Option<&str>,
) -> Result<IntakeReport, CoreError> {
    let publish_to = publish_to.map(validate_address).transpose()?;

    let mut intake = Intake::new(parse_secret_key_hex(secret_hex.trim())?);
    if let Some(aad) = aad {
        intake = intake.with_aad(aad);
    }
    let attestation = intake.process_transport(sealed.trim())?;

    let to = publish_to.unwrap_or(attestation.signer);
    let call = attestation.publish_call(to);
    Ok(IntakeReport {
        signer: attestation.signer.to_checksum(None),
        schema: attestation.schema,
        signature: attestation.signature_hex,
        publish_to: to.to_checksum(None),
        function: call.function_signature().to_string(),
        calldata: hex_prefixed(&call.calldata()),
    })
}

// ============================================================================
// encode-publish
// ============================================================================

/// ABI-encode a `sendJson` or `sendKV` mailbox call
#[derive(Args, Debug)]
pub struct EncodePublishArgs {
    /// Recipient address of the attestation
    #[arg(long)]
    pub to: String,

    /// Schema tag, e.g. kyc-level-2
    #[arg(long)]
    pub schema: SchemaTag,

    /// JSON body for `sendJson`
    #[arg(long, conflicts_with_all = ["keys", "values"])]
    pub json: Option<String>,

    /// Field key for `sendKV` (repeatable)
    #[arg(long = "key")]
    pub keys: Vec<String>,

    /// Field value for `sendKV` (repeatable, same count as --key)
    #[arg(long = "value")]
    pub values: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishReport {
    pub function: String,
    pub selector: String,
    pub calldata: String,
}

impl Report for PublishReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Function", self.function.clone()),
            ("Selector", self.selector.clone()),
            ("Calldata", self.calldata.clone()),
        ]
    }
}

impl EncodePublishArgs {
    pub fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        let json = self.json.as_deref().map(read_arg).transpose()?;
        Ok(ctx.finish(
            "encode-publish",
            encode_publish(&self.to, self.schema, json, self.keys, self.values),
        ))
    }
}

pub(crate) fn encode_publish(
    to: &str,
    schema: SchemaTag,
    json: Option<String>,
    keys: Vec<String>,
    values: Vec<String>,
) -> Result<PublishReport, CoreError> {
    let to: Address = validate_address(to)?;
    let call = match json {
        Some(json) => PublishCall::json(to, schema, json),
        None => PublishCall::kv(to, schema, keys, values)?,
    };
    Ok(PublishReport {
        function: call.function_signature().to_string(),
        selector: hex_prefixed(&call.selector()),
        calldata: hex_prefixed(&call.calldata()),
    })
}

fn hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
