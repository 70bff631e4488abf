//! 📂 Record files — NDJSON dumps of text or profile records, optionally gzipped.
//!
//! 🎬 *[a replay file. one record per line. somebody saved these for a reason.]*
//!
//! The profiler usually hands records to the store directly. Sometimes it hands them
//! to a file instead (a replay, a backfill, a migration to a fresh cluster), and
//! then somebody has to read that file back. This module is that somebody.
//!
//! 🧠 Knowledge graph:
//! - Lines are found with `memchr`, not `str::lines`, so we never validate UTF-8 for
//!   a whole multi-gigabyte file just to throw the validation away.
//! - `.gz` files (or anything starting with the gzip magic bytes) are inflated with `flate2`.
//! - Blank lines are skipped. A broken line is an error naming its 1-based line number.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use tracing::debug;

// 🫁 the two bytes every gzip stream starts with. RFC 1952, section 2.3.1.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 📖 Read every record from an NDJSON file (plain or gzipped).
pub async fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = tokio::fs::read(path).await.context(format!(
        "💀 The door to '{}' would not budge. It might not exist. Permissions might be wrong. \
         The file remains unopened. We remain outside.",
        path.display()
    ))?;

    let bytes = if is_gzipped(path, &raw) {
        inflate(&raw).context(format!("💀 '{}' looked gzipped but would not inflate", path.display()))?
    } else {
        raw
    };

    debug!(path = %path.display(), bytes = bytes.len(), "📖 read record file");
    parse_ndjson(&bytes).context(format!("💀 Failed to parse records from '{}'", path.display()))
}

/// 🔪 Split NDJSON bytes into lines and deserialize each non-blank one.
pub fn parse_ndjson<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let mut records = Vec::new();
    let mut line_start = 0usize;
    let mut line_number = 0usize;

    let line_ends = memchr::memchr_iter(b'\n', bytes).chain(std::iter::once(bytes.len()));
    for line_end in line_ends {
        line_number += 1;
        let line = trim_ascii(&bytes[line_start..line_end]);
        line_start = line_end + 1;

        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_slice(line)
            .context(format!("💀 Line {} is not a valid record", line_number))?;
        records.push(record);
    }

    Ok(records)
}

fn is_gzipped(path: &Path, bytes: &[u8]) -> bool {
    path.extension().is_some_and(|ext| ext == "gz") || bytes.starts_with(&GZIP_MAGIC)
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut inflated = Vec::with_capacity(compressed.len() * 4);
    decoder.read_to_end(&mut inflated)?;
    Ok(inflated)
}

// 🧹 strips \r from Windows line endings and any stray spaces around the JSON
fn trim_ascii(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}
