//! Argument values that may name a file or stdin.
//!
//! `-` reads stdin, `@path` reads a file, anything else is taken literally.
//! Trailing newlines are trimmed so `echo`-ed and file inputs match literals.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

pub fn read_arg(value: &str) -> Result<String> {
    let raw = if value == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else if let Some(path) = value.strip_prefix('@') {
        read_file(Path::new(path))?
    } else {
        return Ok(value.to_string());
    };
    Ok(raw.trim_end_matches(['\r', '\n']).to_string())
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
