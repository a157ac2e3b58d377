//! Retention purge
//!
//! Offline job that drops audit records older than the retention window. The
//! rewritten log is staged in a temporary file next to the original and
//! renamed over it, so readers see either the old or the new version.
//! Lines without a parseable leading timestamp are always kept.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::{AuditError, Result, TIMESTAMP_FORMAT};

/// Default retention window in days
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Outcome of a purge run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// False when there was no log to purge
    pub log_found: bool,
    pub retained: usize,
    pub deleted: usize,
    /// Records at or before this instant were removed
    pub cutoff: DateTime<Utc>,
}

/// Remove records older than `retention_days` relative to `now`
pub fn purge(path: &Path, retention_days: u32, now: DateTime<Utc>) -> Result<PurgeReport> {
    let cutoff = retention_cutoff(retention_days, now)?;

    if !path.exists() {
        tracing::info!(path = %path.display(), "No audit log found, nothing to purge");
        return Ok(PurgeReport {
            log_found: false,
            retained: 0,
            deleted: 0,
            cutoff,
        });
    }

    tracing::info!(
        path = %path.display(),
        retention_days,
        cutoff = %cutoff,
        "Starting audit retention purge"
    );

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let source = File::open(path).map_err(|e| AuditError::io(path, e))?;
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| AuditError::io(dir, e))?;

    let cutoff_naive = cutoff.naive_utc();
    let mut retained = 0;
    let mut deleted = 0;

    // Raw bytes: a line that is not UTF-8 is unparseable, not fatal
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| AuditError::io(path, e))?;
        if read == 0 {
            break;
        }

        let timestamp = std::str::from_utf8(&line).ok().and_then(leading_timestamp);
        match timestamp {
            Some(ts) if ts <= cutoff_naive => deleted += 1,
            _ => {
                staged
                    .write_all(&line)
                    .map_err(|e| AuditError::io(staged.path(), e))?;
                retained += 1;
            }
        }
    }

    staged
        .as_file_mut()
        .sync_all()
        .map_err(|e| AuditError::io(path, e))?;
    staged
        .persist(path)
        .map_err(|e| AuditError::io(path, e.error))?;

    tracing::info!(
        retained,
        deleted,
        cutoff = %cutoff.date_naive(),
        "Audit retention purge complete"
    );

    Ok(PurgeReport {
        log_found: true,
        retained,
        deleted,
        cutoff,
    })
}

/// `now` minus the retention window, if it is representable
fn retention_cutoff(retention_days: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    Duration::try_days(i64::from(retention_days))
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or(AuditError::RetentionOutOfRange(retention_days))
}

/// Timestamp in the first `|`-delimited field, if it parses
fn leading_timestamp(line: &str) -> Option<NaiveDateTime> {
    let field = line.split('|').next()?.trim();
    NaiveDateTime::parse_from_str(field, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_timestamp() {
        assert!(leading_timestamp("2026-01-11 10:00:00 | INFO | X | Y | Z\n").is_some());
        assert!(leading_timestamp("2026-01-11 10:00:00\n").is_some());
        assert!(leading_timestamp("garbage | INFO").is_none());
        assert!(leading_timestamp("").is_none());
        assert!(leading_timestamp("2026-13-45 99:00:00 | INFO").is_none());
    }

    #[test]
    fn test_retention_cutoff_bounds() {
        let now = DateTime::parse_from_rfc3339("2026-01-11T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            retention_cutoff(30, now).unwrap(),
            now - Duration::days(30)
        );
        assert!(matches!(
            retention_cutoff(u32::MAX, now),
            Err(AuditError::RetentionOutOfRange(u32::MAX))
        ));
    }
}
