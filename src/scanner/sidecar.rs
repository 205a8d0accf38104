//! Checksum sidecar parsing (`<file>.sha1`).
//!
//! A sidecar must be a small single-line UTF-8 file whose first 40 characters
//! are the hex SHA-1 of its target. Checks run in a fixed order so the
//! reported reason is deterministic: size, then text/line shape, then hex.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::scanner::digest::{DIGEST_HEX_LEN, Digest};

/// Sidecars must be strictly smaller than this many bytes.
pub const MAX_SIDECAR_BYTES: u64 = 256;

/// Why a sidecar could not be turned into a digest.
#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("Too large ({size} bytes)")]
    TooLarge { size: u64 },

    #[error("Malformed text (not UTF-8)")]
    MalformedText,

    #[error("Multiple lines ({count} lines)")]
    MultipleLines { count: usize },

    #[error("Illegal SHA-1 format: {line}")]
    IllegalFormat { line: String },

    #[error("Unreadable checksum file: {0}")]
    Io(#[from] io::Error),
}

/// Parsing knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarRules {
    /// Reject non-whitespace text after the 40th hex character.
    pub strict: bool,
}

/// Read and parse a sidecar file.
pub fn read_sidecar(path: &Path, rules: SidecarRules) -> Result<Digest, SidecarError> {
    let size = fs::metadata(path)?.len();
    if size >= MAX_SIDECAR_BYTES {
        return Err(SidecarError::TooLarge { size });
    }
    let raw = fs::read(path)?;
    parse_sidecar(&raw, rules)
}

/// Parse sidecar bytes that already passed the size check.
pub fn parse_sidecar(raw: &[u8], rules: SidecarRules) -> Result<Digest, SidecarError> {
    let text = std::str::from_utf8(raw).map_err(|_| SidecarError::MalformedText)?;

    let lines = split_lines(text);
    if lines.len() != 1 {
        return Err(SidecarError::MultipleLines { count: lines.len() });
    }
    let line = lines[0];

    let illegal = || SidecarError::IllegalFormat {
        line: line.trim().to_string(),
    };
    let head = line.get(..DIGEST_HEX_LEN).ok_or_else(illegal)?;
    let digest = Digest::from_hex(head).ok_or_else(illegal)?;

    if rules.strict && !line[DIGEST_HEX_LEN..].trim().is_empty() {
        return Err(illegal());
    }
    Ok(digest)
}

/// Split on `\n`, `\r\n`, or a lone `\r`; a final terminator does not open a new line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}
