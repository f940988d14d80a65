use thiserror::Error;

/// Configuration validation errors.
///
/// Every variant is fatal for a run and is reported before any table is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The destination project identifier is missing or blank.
    #[error("`destination.big_query.project_id` must be set (or provide `GCP_PROJECT_ID`)")]
    MissingProjectId,
    /// The destination dataset identifier is blank.
    #[error("`destination.big_query.dataset_id` cannot be empty")]
    EmptyDatasetId,
    /// The load payload limit is zero.
    #[error("`destination.big_query.max_payload_bytes` cannot be zero")]
    MaxPayloadBytesZero,
    /// Maximum concurrent tables cannot be zero.
    #[error("`sync.max_concurrent_tables` cannot be zero")]
    MaxConcurrentTablesZero,
    /// A requested table name is blank.
    #[error("`sync.tables` cannot contain empty table names")]
    EmptyTableName,
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
}
