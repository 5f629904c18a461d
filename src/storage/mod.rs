//! Persistence layer.
//!
//! Append-only JSON audit log of execution attempts. Every attempt —
//! including retries of the same proposal — lands as its own record,
//! so the file is a complete history of what was pushed to the channel
//! and whether it verified.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::ExecutionResult;

/// Default audit log path.
const DEFAULT_AUDIT_FILE: &str = "helm_audit.json";

/// Append one execution attempt to the audit log.
pub fn append_result(result: &ExecutionResult, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_AUDIT_FILE);

    let mut log = load_log(Some(path))?;
    log.push(result.clone());

    let json = serde_json::to_string_pretty(&log)
        .context("Failed to serialise audit log")?;
    std::fs::write(path, &json)
        .context(format!("Failed to write audit log to {path}"))?;

    debug!(path, entries = log.len(), "Audit log appended");
    Ok(())
}

/// Load the full audit log from disk.
/// Returns an empty log if the file doesn't exist yet.
pub fn load_log(path: Option<&str>) -> Result<Vec<ExecutionResult>> {
    let path = path.unwrap_or(DEFAULT_AUDIT_FILE);

    if !Path::new(path).exists() {
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read audit log from {path}"))?;

    let log: Vec<ExecutionResult> = serde_json::from_str(&json)
        .context(format!("Failed to parse audit log from {path}"))?;

    info!(path, entries = log.len(), "Audit log loaded from disk");
    Ok(log)
}

/// Delete the audit log (for testing or reset).
pub fn delete_log(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_AUDIT_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to delete audit log {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
