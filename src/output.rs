//! Rendering of decoded files to stdout or disk

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;
use std::path::Path;

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// CDL-style text, like `ncdump`
    Text,
    /// Pretty-printed JSON
    Json,
    /// CBOR (binary JSON)
    Cbor,
}

/// Serialized document: the payload plus where and when it was fetched
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub server: &'a str,
    pub fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: &'a T,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    /// Wrap `payload`, stamping the current time
    pub fn new(server: &'a str, payload: &'a T) -> Self {
        Self {
            server,
            fetched_at: Utc::now(),
            payload,
        }
    }
}

/// Encode `payload` in `format`
///
/// # Errors
///
/// Returns an error if JSON or CBOR serialization fails.
pub fn render<T>(payload: &T, server: &str, format: OutputFormat) -> Result<Vec<u8>>
where
    T: Serialize + Display,
{
    match format {
        OutputFormat::Text => Ok(payload.to_string().into_bytes()),
        OutputFormat::Json => {
            let mut bytes = serde_json::to_vec_pretty(&Envelope::new(server, payload))
                .context("Failed to encode JSON output")?;
            bytes.push(b'\n');
            Ok(bytes)
        }
        OutputFormat::Cbor => {
            let mut bytes = Vec::new();
            ciborium::into_writer(&Envelope::new(server, payload), &mut bytes)
                .context("Failed to encode CBOR output")?;
            Ok(bytes)
        }
    }
}

/// Write rendered output to `path`, or stdout when `path` is `None`
///
/// # Errors
///
/// Returns an error if the file or stdout cannot be written.
pub fn write_output(bytes: &[u8], path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("Failed to write to stdout")?;
            stdout.flush().context("Failed to flush stdout")
        }
    }
}
