//! Append-only audit sink
//!
//! Every record is written with open-append-close under a mutex, as a single
//! `write_all` of one complete line, so concurrent callers never interleave
//! partial lines.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{AuditError, Result, FIELD_SEPARATOR, TIMESTAMP_FORMAT};

/// Severity recorded on an audit line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditLevel {
    Info,
    Warn,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Warn => "WARN",
        }
    }
}

/// One audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub level: AuditLevel,
    pub action: String,
    pub mission_id: String,
    pub details: String,
}

impl AuditRecord {
    pub fn new(
        level: AuditLevel,
        action: impl Into<String>,
        mission_id: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            action: action.into(),
            mission_id: mission_id.into(),
            details: details.into(),
        }
    }

    /// Render as a single newline-terminated log line
    pub fn to_line(&self) -> String {
        let fields = [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.level.as_str().to_string(),
            single_line(&self.action),
            single_line(&self.mission_id),
            single_line(&self.details),
        ];
        let mut line = fields.join(FIELD_SEPARATOR);
        line.push('\n');
        line
    }
}

fn single_line(field: &str) -> String {
    field.replace(['\r', '\n'], " ")
}

/// File-backed audit sink
#[derive(Debug)]
pub struct AuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
    failures: AtomicU64,
}

impl AuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            failures: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an informational event.
    ///
    /// Never fails the caller; returns whether the record reached the log.
    pub fn log(&self, action: &str, mission_id: &str, details: &str) -> bool {
        self.record(AuditLevel::Info, action, mission_id, details)
    }

    /// Record a security-relevant event at WARN level
    pub fn warn(&self, action: &str, mission_id: &str, details: &str) -> bool {
        self.record(AuditLevel::Warn, action, mission_id, details)
    }

    /// Number of records that could not be written since startup
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn record(&self, level: AuditLevel, action: &str, mission_id: &str, details: &str) -> bool {
        match self.try_log(AuditRecord::new(level, action, mission_id, details)) {
            Ok(()) => true,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    target: "audit",
                    error = %e,
                    action = %action,
                    mission_id = %mission_id,
                    "Failed to write audit record"
                );
                false
            }
        }
    }

    /// Append a record, surfacing any I/O error
    pub fn try_log(&self, record: AuditRecord) -> Result<()> {
        let line = record.to_line();

        {
            let _guard = self.write_lock.lock().map_err(|_| AuditError::Poisoned)?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| AuditError::io(&self.path, e))?;
            file.write_all(line.as_bytes())
                .and_then(|_| file.flush())
                .map_err(|e| AuditError::io(&self.path, e))?;
        }

        tracing::info!(
            target: "audit",
            audit_level = record.level.as_str(),
            action = %record.action,
            mission_id = %record.mission_id,
            details = %record.details,
            "Audit logged"
        );
        Ok(())
    }
}
