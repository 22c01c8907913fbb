//! `seal` and `open`: the raw codec, without envelope handling.

use attest_core::CoreError;
use attest_crypto::ecies::{open_transport, seal_to};
use attest_crypto::encoding::TransportEncoding;
use attest_crypto::keys::{parse_public_key_hex, parse_secret_key_hex};
use clap::Args;
use rand_core::OsRng;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::cli::Context;
use crate::input::read_arg;
use crate::output::Report;
use crate::ExitCode;

/// Seal plaintext to a recipient public key
#[derive(Args, Debug)]
pub struct SealArgs {
    /// Recipient public key (hex, compressed or uncompressed)
    #[arg(long, env = "ATTEST_RECIPIENT_PUBKEY")]
    pub to: String,

    /// Plaintext: literal text, @file, or - for stdin
    #[arg(long, short)]
    pub input: String,

    /// Associated data (overrides the configured value)
    #[arg(long)]
    pub aad: Option<String>,

    /// Transport encoding of the sealed output
    #[arg(long, default_value = "base64")]
    pub encoding: TransportEncoding,
}

#[derive(Debug, Serialize)]
pub struct SealReport {
    pub sealed: String,
    pub encoding: String,
    /// Length of the sealed value before transport encoding
    pub bytes: usize,
}

impl Report for SealReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Sealed", self.sealed.clone()),
            ("Encoding", self.encoding.clone()),
            ("Bytes", self.bytes.to_string()),
        ]
    }
}

impl SealArgs {
    pub fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        let plaintext = Zeroizing::new(read_arg(&self.input)?);
        let aad = self.aad.as_deref().map(str::as_bytes).or(ctx.config.aad_bytes());
        ctx.formatter.progress("sealing");
        Ok(ctx.finish(
            "seal",
            seal_text(&self.to, plaintext.as_bytes(), aad, self.encoding),
        ))
    }
}

pub(crate) fn seal_text(
    recipient_hex: &str,
    plaintext: &[u8],
    aad: Option<&[u8]>,
    encoding: TransportEncoding,
) -> Result<SealReport, CoreError> {
    let recipient = parse_public_key_hex(recipient_hex.trim())?;
    let sealed = seal_to(&mut OsRng, &recipient, plaintext, aad)?;
    Ok(SealReport {
        sealed: sealed.to_transport(encoding),
        encoding: encoding.to_string(),
        bytes: sealed.len(),
    })
}

/// Open a sealed value with the recipient secret key
#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Recipient secret key (hex)
    #[arg(long, env = "ATTEST_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Sealed transport text: literal, @file, or - for stdin
    #[arg(long, short)]
    pub input: String,

    /// Associated data (overrides the configured value)
    #[arg(long)]
    pub aad: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OpenReport {
    /// UTF-8 plaintext, or `0x` hex when it is not valid UTF-8
    pub plaintext: String,
    pub utf8: bool,
}

impl Report for OpenReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![("Plaintext", self.plaintext.clone())]
    }
}

impl OpenArgs {
    pub fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        let sealed = read_arg(&self.input)?;
        let aad = self.aad.as_deref().map(str::as_bytes).or(ctx.config.aad_bytes());
        Ok(ctx.finish("open", open_text(&self.secret_key, &sealed, aad)))
    }
}

pub(crate) fn open_text(
    secret_hex: &str,
    sealed: &str,
    aad: Option<&[u8]>,
) -> Result<OpenReport, CoreError> {
    let secret = parse_secret_key_hex(secret_hex.trim())?;
    let plaintext = Zeroizing::new(open_transport(sealed.trim(), &secret, aad)?);
    Ok(match std::str::from_utf8(&plaintext) {
        Ok(text) => OpenReport {
            plaintext: text.to_string(),
            utf8: true,
        },
        Err(_) => OpenReport {
            plaintext: format!("0x{}", hex::encode(&plaintext[..])),
            utf8: false,
        },
    })
}
