//! Key generation and public-key normalization.

use attest_core::signer::{address_of, LocalWallet, MessageSigner};
use attest_core::CoreError;
use attest_crypto::keys::{parse_public_key_hex, public_key_hex};
use attest_crypto::KeyPair;
use clap::Args;
use k256::ecdsa::VerifyingKey;
use rand_core::OsRng;
use serde::Serialize;

use crate::cli::Context;
use crate::output::Report;
use crate::ExitCode;

/// Generate a secp256k1 key pair usable as a recipient or signer key
#[derive(Args, Debug)]
pub struct KeygenArgs {}

#[derive(Debug, Serialize)]
pub struct KeygenReport {
    pub secret_key: String,
    pub public_key: String,
    pub public_key_compressed: String,
    pub address: String,
}

impl Report for KeygenReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Secret Key", self.secret_key.clone()),
            ("Public Key", self.public_key.clone()),
            ("Public Key (compressed)", self.public_key_compressed.clone()),
            ("Address", self.address.clone()),
        ]
    }
}

impl KeygenArgs {
    pub fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        Ok(ctx.finish("keygen", keygen()))
    }
}

fn keygen() -> Result<KeygenReport, CoreError> {
    let pair = KeyPair::generate(&mut OsRng);
    let secret = pair.secret_hex();
    let wallet = LocalWallet::from_secret_hex(&secret)?;
    Ok(KeygenReport {
        secret_key: secret.as_str().to_string(),
        public_key: pair.public_hex_uncompressed(),
        public_key_compressed: pair.public_hex_compressed(),
        address: wallet.address().to_checksum(None),
    })
}

/// Convert a compressed or uncompressed public key to canonical hex
#[derive(Args, Debug)]
pub struct NormalizeKeyArgs {
    /// Hex public key, 33 or 65 bytes, `0x` optional
    pub key: String,

    /// Emit the 33-byte compressed form instead
    #[arg(long)]
    pub compressed: bool,
}

#[derive(Debug, Serialize)]
pub struct NormalizeReport {
    pub public_key: String,
    /// Ethereum address of the key
    pub address: String,
}

impl Report for NormalizeReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Public Key", self.public_key.clone()),
            ("Address", self.address.clone()),
        ]
    }
}

impl NormalizeKeyArgs {
    pub fn execute(self, ctx: &Context) -> anyhow::Result<ExitCode> {
        Ok(ctx.finish("normalize-key", normalize(&self.key, self.compressed)))
    }
}

pub(crate) fn normalize(key: &str, compressed: bool) -> Result<NormalizeReport, CoreError> {
    let key = parse_public_key_hex(key.trim())?;
    Ok(NormalizeReport {
        public_key: public_key_hex(&key, compressed),
        address: address_of(&VerifyingKey::from(key)).to_checksum(None),
    })
}
