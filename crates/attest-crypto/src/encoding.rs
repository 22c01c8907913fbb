//! Transport text for sealed values.
//!
//! Submitters send sealed bytes as standard base64 or unpadded base64url.
//! The decoder picks the alphabet from the text itself: any `-` or `_` means
//! base64url. Padding is restored before decoding either alphabet.

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::error::EciesError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportEncoding {
    #[default]
    Base64,
    /// URL-safe alphabet, no padding.
    Base64Url,
}

impl std::str::FromStr for TransportEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base64" | "b64" => Ok(Self::Base64),
            "base64url" | "b64url" => Ok(Self::Base64Url),
            _ => Err(format!("unknown transport encoding: {s}")),
        }
    }
}

impl std::fmt::Display for TransportEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base64 => write!(f, "base64"),
            Self::Base64Url => write!(f, "base64url"),
        }
    }
}

pub fn is_base64url(text: &str) -> bool {
    text.contains(['-', '_'])
}

fn pad_base64(text: &str) -> String {
    let mut padded = text.to_string();
    let rem = padded.len() % 4;
    if rem != 0 {
        padded.extend(std::iter::repeat('=').take(4 - rem));
    }
    padded
}

/// Decode base64 or base64url transport text into raw sealed bytes.
pub fn decode_sealed(text: &str) -> Result<Vec<u8>, EciesError> {
    let text = text.trim();
    let padded = pad_base64(text.trim_end_matches('='));
    let decoded = if is_base64url(text) {
        URL_SAFE.decode(padded)
    } else {
        STANDARD.decode(padded)
    };
    decoded.map_err(|e| EciesError::Format(format!("invalid transport encoding: {e}")))
}

pub fn encode_sealed(bytes: &[u8], encoding: TransportEncoding) -> String {
    match encoding {
        TransportEncoding::Base64 => STANDARD.encode(bytes),
        TransportEncoding::Base64Url => URL_SAFE_NO_PAD.encode(bytes),
    }
}
