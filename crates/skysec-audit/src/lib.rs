//! SkySec Audit
//!
//! Compliance audit trail for mission access and system control.
//!
//! - [`AuditSink`] appends one pipe-delimited line per record and never fails
//!   the business operation that triggered it.
//! - [`purge`] drops records older than the retention window by atomically
//!   rewriting the log, keeping any line it cannot parse.
//!
//! Log line format:
//!
//! ```text
//! 2026-01-11 10:00:00 | INFO | UPDATE_SUCCESS | a0B5g00000XyZ1 | New status: READY
//! ```

pub mod purge;
pub mod sink;

pub use purge::{purge, PurgeReport, DEFAULT_RETENTION_DAYS};
pub use sink::{AuditLevel, AuditRecord, AuditSink};

use thiserror::Error;

/// Timestamp layout at the start of every audit line (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Field separator within an audit line
pub const FIELD_SEPARATOR: &str = " | ";

/// Audit log errors
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Retention window of {0} days reaches before the earliest representable date")]
    RetentionOutOfRange(u32),

    #[error("Audit sink lock poisoned")]
    Poisoned,
}

impl AuditError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        AuditError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
