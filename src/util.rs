use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn ensure_parent_directory(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory(parent),
        _ => Ok(()),
    }
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_directory(path)?;

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

/// Serializes every record first, so a serialization failure never leaves a partial file.
pub fn jsonl_bytes<T: Serialize>(items: &[T]) -> Result<Vec<u8>> {
    let mut data = Vec::<u8>::new();
    for (index, item) in items.iter().enumerate() {
        serde_json::to_writer(&mut data, item)
            .with_context(|| format!("failed to serialize jsonl record {}", index))?;
        data.push(b'\n');
    }
    Ok(data)
}

pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let data = jsonl_bytes(items)?;
    ensure_parent_directory(path)?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create jsonl file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write jsonl file: {}", path.display()))?;

    Ok(())
}

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}
