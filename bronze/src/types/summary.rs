use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::{BronzeError, ErrorKind};

/// Terminal state of a table sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
}

/// Outcome of synchronizing one table.
///
/// A failed result always has zero `records_synced` and an error message, a successful one never
/// has an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncResult {
    pub table: String,
    pub records_synced: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "duration_seconds", serialize_with = "serialize_seconds")]
    pub duration: Duration,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error_kind"
    )]
    pub error_kind: Option<ErrorKind>,
}

impl SyncResult {
    pub fn success(
        table: impl Into<String>,
        records_synced: u64,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> SyncResult {
        SyncResult {
            table: table.into(),
            records_synced,
            started_at,
            finished_at: Utc::now(),
            duration,
            status: SyncStatus::Success,
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(
        table: impl Into<String>,
        error: &BronzeError,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> SyncResult {
        let mut message = error.to_string();
        if message.is_empty() {
            message = format!("{:?}", error.kind());
        }

        SyncResult {
            table: table.into(),
            records_synced: 0,
            started_at,
            finished_at: Utc::now(),
            duration,
            status: SyncStatus::Failed,
            error: Some(message),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Success
    }
}

/// Aggregate of every [`SyncResult`] of a run, in invocation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_tables: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_records: u64,
    pub results: Vec<SyncResult>,
}

impl RunSummary {
    /// Builds the summary once every table has been attempted.
    pub fn from_results(results: Vec<SyncResult>) -> RunSummary {
        let successful = results.iter().filter(|result| result.is_success()).count();
        let total_records = results.iter().map(|result| result.records_synced).sum();

        RunSummary {
            total_tables: results.len(),
            successful,
            failed: results.len() - successful,
            total_records,
            results,
        }
    }

    /// A run succeeds when no table failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failed_tables(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|result| !result.is_success())
            .map(|result| result.table.as_str())
    }
}

fn serialize_seconds<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

fn serialize_error_kind<S>(kind: &Option<ErrorKind>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match kind {
        Some(kind) => serializer.serialize_str(kind.as_str()),
        None => serializer.serialize_none(),
    }
}
