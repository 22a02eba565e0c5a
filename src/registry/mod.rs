//! Stock registry loading, corporate-directory cache, and the join that
//! resolves each ticker to its internal company identifier.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::models::{CorpDirectoryEntry, RegistryRow, StockRecord};

/// Normalize a stock code to a fixed-width 6-digit string. Codes that are
/// not purely numeric are returned trimmed but otherwise untouched; the
/// exchange classifier will route them to `Other`.
pub fn normalize_ticker(code: &str) -> String {
    let code = code.trim();
    if !code.is_empty() && code.len() < 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("{:0>6}", code)
    } else {
        code.to_string()
    }
}

/// Read the local stock-code registry (CSV with COMP_CODE/COMP_NAME
/// columns), zero-padding every code. I/O failure here is fatal for the
/// whole run.
pub fn load_stock_registry(path: impl AsRef<Path>) -> Result<Vec<RegistryRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open stock registry {}", path.display()))?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let mut row: RegistryRow =
            result.with_context(|| format!("malformed registry row in {}", path.display()))?;
        row.comp_code = normalize_ticker(&row.comp_code);
        rows.push(row);
    }
    info!("loaded {} registry rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Write a registry file with the same columns the loader expects.
pub fn write_stock_registry(path: impl AsRef<Path>, rows: &[RegistryRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create registry file {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the cached corporate-directory snapshot (JSON array). Entries
/// without a stock code are dropped; the rest get zero-padded codes.
pub fn load_corp_directory(path: impl AsRef<Path>) -> Result<Vec<CorpDirectoryEntry>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read corp directory cache {}", path.display()))?;
    let all: Vec<CorpDirectoryEntry> = serde_json::from_str(&content)
        .with_context(|| format!("corp directory cache {} is not valid JSON", path.display()))?;

    let total = all.len();
    let listed: Vec<CorpDirectoryEntry> = all
        .into_iter()
        .filter(|entry| entry.stock_code.as_deref().is_some_and(|c| !c.trim().is_empty()))
        .map(|mut entry| {
            entry.stock_code = entry.stock_code.map(|c| normalize_ticker(&c));
            entry
        })
        .collect();
    info!(
        "corp directory cache: {} entries, {} with a stock code",
        total,
        listed.len()
    );
    Ok(listed)
}

/// Inner-join the registry against the directory on ticker, producing the
/// records all downstream steps consume. Registry order is preserved;
/// unmatched registry rows are dropped with a warning.
pub fn join_registry(rows: &[RegistryRow], directory: &[CorpDirectoryEntry]) -> Vec<StockRecord> {
    let by_code: HashMap<&str, &CorpDirectoryEntry> = directory
        .iter()
        .filter_map(|entry| entry.stock_code.as_deref().map(|code| (code, entry)))
        .collect();

    let mut records = Vec::new();
    let mut unmatched = 0usize;
    for row in rows {
        match by_code.get(row.comp_code.as_str()) {
            Some(entry) => records.push(StockRecord {
                ticker: row.comp_code.clone(),
                company_name: row.comp_name.clone(),
                corp_code: Some(entry.corp_code.clone()),
            }),
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        warn!("{} registry rows had no corp directory match", unmatched);
    }
    records
}

/// Rebuild the registry from the directory snapshot, sorted by code.
pub fn registry_from_directory(directory: &[CorpDirectoryEntry]) -> Vec<RegistryRow> {
    let mut rows: Vec<RegistryRow> = directory
        .iter()
        .filter_map(|entry| {
            entry.stock_code.as_ref().map(|code| RegistryRow {
                comp_code: normalize_ticker(code),
                comp_name: entry.corp_name.clone(),
                corp_code: Some(entry.corp_code.clone()),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.comp_code.cmp(&b.comp_code));
    rows
}

/// Tickers added and removed between two registry versions.
pub fn diff_registries(old: &[RegistryRow], new: &[RegistryRow]) -> (Vec<String>, Vec<String>) {
    let old_codes: std::collections::HashSet<&str> =
        old.iter().map(|r| r.comp_code.as_str()).collect();
    let new_codes: std::collections::HashSet<&str> =
        new.iter().map(|r| r.comp_code.as_str()).collect();

    let mut added: Vec<String> = new_codes.difference(&old_codes).map(|s| s.to_string()).collect();
    let mut removed: Vec<String> =
        old_codes.difference(&new_codes).map(|s| s.to_string()).collect();
    added.sort();
    removed.sort();
    (added, removed)
}

/// Copy the existing registry aside with a timestamp before overwriting
/// it. Returns the backup path, or `None` when there was nothing to back
/// up.
pub fn backup_registry(path: impl AsRef<Path>) -> Result<Option<std::path::PathBuf>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup = path.with_extension(format!("{}.bak.csv", stamp));
    fs::copy(path, &backup)
        .with_context(|| format!("failed to back up registry to {}", backup.display()))?;
    info!("backed up registry to {}", backup.display());
    Ok(Some(backup))
}
