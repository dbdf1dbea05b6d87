//! Audit trail of authentication attempts
//!
//! Append-only, one line per attempt:
//!
//! ```text
//! 2026-10-17T08:30:12.041Z<TAB>jdoe<TAB>GRANTED<TAB>allowed user
//! ```
//!
//! Recording never fails from the caller's point of view: an unavailable
//! log must not block a legitimate login.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Tracing target for audit events
pub const AUDIT_TARGET: &str = "warden::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Granted,
    Denied,
    Error,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Granted => "GRANTED",
            AuditOutcome::Denied => "DENIED",
            AuditOutcome::Error => "ERROR",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub identifier: String,
    pub outcome: AuditOutcome,
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn new(identifier: &str, outcome: AuditOutcome, detail: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            identifier: identifier.to_string(),
            outcome,
            detail,
        }
    }

    /// Tab-separated line, newline terminated
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            escape_field(&self.identifier),
            self.outcome,
            escape_field(self.detail.as_deref().unwrap_or("-")),
        )
    }
}

/// Keep every entry on exactly one line
fn escape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Emit the entry on the tracing audit target
pub fn trace_entry(entry: &AuditEntry) {
    info!(
        target: AUDIT_TARGET,
        identifier = %entry.identifier,
        outcome = %entry.outcome,
        detail = entry.detail.as_deref().unwrap_or("-"),
        "authentication attempt"
    );
}

/// Destination for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry. Failures are swallowed.
    async fn record(&self, entry: &AuditEntry);
}

/// Appends entries to a text file
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl AuditSink for FileAuditLog {
    async fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.append(&entry.to_line()).await {
            warn!(
                "Failed to write audit entry for {} to {:?}: {}",
                entry.identifier, self.path, e
            );
        }
    }
}

/// Keeps entries in memory
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, entry: &AuditEntry) {
        self.entries.lock().push(entry.clone());
    }
}

/// Drops entries; used when the file log is disabled. Entries still reach
/// the tracing audit target.
pub struct DiscardAuditLog;

#[async_trait]
impl AuditSink for DiscardAuditLog {
    async fn record(&self, _entry: &AuditEntry) {}
}
