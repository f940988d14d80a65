use std::error;
use std::fmt;

/// Result type of fallible sync operations.
pub type BronzeResult<T> = Result<T, BronzeError>;

/// Error type of the sync engine.
///
/// A [`BronzeError`] carries an [`ErrorKind`], a static description and optionally a dynamic
/// detail, or aggregates several errors. The kind is what callers branch on, the description and
/// detail end up in logs and in failed [`crate::types::SyncResult`]s.
#[derive(Debug, Clone)]
pub struct BronzeError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    Many(Vec<BronzeError>),
}

/// Categories of errors raised while synchronizing tables.
///
/// The first group names the phase of a table sync that failed. The second group names lower level
/// causes raised by clients, components owning a phase wrap them into their phase kind.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Phase errors
    SchemaNotFound,
    SourceConnectionFailed,
    SourceQueryFailed,
    SchemaManagementFailed,
    LoadFailed,
    ConfigError,
    SyncPanicked,

    // Client errors
    AuthenticationError,
    DestinationQueryFailed,
    DestinationIoError,
    EncryptionError,
    InvalidData,
    ConversionError,
    SerializationError,
    IoError,

    Unknown,
}

impl ErrorKind {
    /// Returns the stable snake case name used in serialized results and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SchemaNotFound => "schema_not_found",
            ErrorKind::SourceConnectionFailed => "source_connection_failed",
            ErrorKind::SourceQueryFailed => "source_query_failed",
            ErrorKind::SchemaManagementFailed => "schema_management_failed",
            ErrorKind::LoadFailed => "load_failed",
            ErrorKind::ConfigError => "config_error",
            ErrorKind::SyncPanicked => "sync_panicked",
            ErrorKind::AuthenticationError => "authentication_error",
            ErrorKind::DestinationQueryFailed => "destination_query_failed",
            ErrorKind::DestinationIoError => "destination_io_error",
            ErrorKind::EncryptionError => "encryption_error",
            ErrorKind::InvalidData => "invalid_data",
            ErrorKind::ConversionError => "conversion_error",
            ErrorKind::SerializationError => "serialization_error",
            ErrorKind::IoError => "io_error",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl BronzeError {
    /// Creates a [`BronzeError`] aggregating `errors`.
    pub fn many(errors: Vec<BronzeError>) -> BronzeError {
        BronzeError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// Aggregates report the kind of their first error, or [`ErrorKind::Unknown`] when empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns every [`ErrorKind`] contained in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors.iter().flat_map(|err| err.kinds()).collect(),
        }
    }

    /// Returns the dynamic detail, for aggregates the first one available.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            ErrorRepr::WithDescription(..) => None,
        }
    }

    /// Re-classifies this error under the phase `kind`, keeping its message as detail.
    ///
    /// Errors already carrying `kind` are returned untouched, so wrapping is idempotent.
    pub fn into_phase(self, kind: ErrorKind, desc: &'static str) -> BronzeError {
        if self.kind() == kind {
            return self;
        }

        BronzeError::from((kind, desc, self.to_string()))
    }
}

impl PartialEq for BronzeError {
    fn eq(&self, other: &BronzeError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => errors_a == errors_b,
            _ => false,
        }
    }
}

impl fmt::Display for BronzeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                fmt::Debug::fmt(&kind, f)?;
                write!(f, ": {desc}")
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                fmt::Debug::fmt(&kind, f)?;
                write!(f, ": {desc} -> {detail}")
            }
            ErrorRepr::Many(ref errors) => match errors.as_slice() {
                [] => f.write_str("Multiple errors occurred (empty)"),
                [error] => error.fmt(f),
                errors => {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                    Ok(())
                }
            },
        }
    }
}

impl error::Error for BronzeError {}

impl From<(ErrorKind, &'static str)> for BronzeError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> BronzeError {
        BronzeError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for BronzeError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> BronzeError {
        BronzeError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

impl<E> From<Vec<E>> for BronzeError
where
    E: Into<BronzeError>,
{
    fn from(errors: Vec<E>) -> BronzeError {
        BronzeError {
            repr: ErrorRepr::Many(errors.into_iter().map(Into::into).collect()),
        }
    }
}

impl From<std::io::Error> for BronzeError {
    fn from(err: std::io::Error) -> BronzeError {
        BronzeError::from((ErrorKind::IoError, "I/O error occurred", err.to_string()))
    }
}

impl From<serde_json::Error> for BronzeError {
    fn from(err: serde_json::Error) -> BronzeError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => {
                (ErrorKind::SerializationError, "JSON serialization failed")
            }
        };

        BronzeError::from((kind, description, err.to_string()))
    }
}

/// Classifies [`tokio_postgres::Error`]s into connection or query failures.
///
/// Errors without a SQLSTATE never reached the server and count as connection failures.
impl From<tokio_postgres::Error> for BronzeError {
    fn from(err: tokio_postgres::Error) -> BronzeError {
        use tokio_postgres::error::SqlState;

        let (kind, description) = match err.code() {
            Some(sqlstate) => match *sqlstate {
                SqlState::CONNECTION_EXCEPTION
                | SqlState::CONNECTION_DOES_NOT_EXIST
                | SqlState::CONNECTION_FAILURE
                | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
                | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION
                | SqlState::TOO_MANY_CONNECTIONS
                | SqlState::CANNOT_CONNECT_NOW
                | SqlState::ADMIN_SHUTDOWN
                | SqlState::CRASH_SHUTDOWN => (
                    ErrorKind::SourceConnectionFailed,
                    "PostgreSQL connection error",
                ),
                SqlState::INVALID_AUTHORIZATION_SPECIFICATION
                | SqlState::INVALID_PASSWORD
                | SqlState::INVALID_CATALOG_NAME => (
                    ErrorKind::SourceConnectionFailed,
                    "PostgreSQL authentication failed",
                ),
                SqlState::UNDEFINED_TABLE | SqlState::UNDEFINED_SCHEMA => (
                    ErrorKind::SourceQueryFailed,
                    "PostgreSQL table not found",
                ),
                SqlState::INSUFFICIENT_PRIVILEGE => (
                    ErrorKind::SourceQueryFailed,
                    "PostgreSQL permission denied",
                ),
                _ => (ErrorKind::SourceQueryFailed, "PostgreSQL query failed"),
            },
            None => (
                ErrorKind::SourceConnectionFailed,
                "PostgreSQL connection failed",
            ),
        };

        BronzeError::from((kind, description, err.to_string()))
    }
}

impl From<rustls::Error> for BronzeError {
    fn from(err: rustls::Error) -> BronzeError {
        BronzeError::from((
            ErrorKind::EncryptionError,
            "TLS configuration failed",
            err.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bronze_error;

    #[test]
    fn display_includes_kind_description_and_detail() {
        let err = bronze_error!(
            ErrorKind::SchemaNotFound,
            "No schema registered for table",
            "invoices"
        );

        assert_eq!(err.kind(), ErrorKind::SchemaNotFound);
        assert_eq!(err.detail(), Some("invoices"));
        assert_eq!(
            err.to_string(),
            "SchemaNotFound: No schema registered for table -> invoices"
        );
    }

    #[test]
    fn many_reports_first_kind_and_all_kinds() {
        let err = BronzeError::from(vec![
            bronze_error!(ErrorKind::LoadFailed, "Load failed"),
            bronze_error!(ErrorKind::DestinationIoError, "Request failed", "timeout"),
        ]);

        assert_eq!(err.kind(), ErrorKind::LoadFailed);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::LoadFailed, ErrorKind::DestinationIoError]
        );
        assert_eq!(err.detail(), Some("timeout"));
        assert!(err.to_string().starts_with("Multiple errors occurred (2 total):"));
    }

    #[test]
    fn empty_many_is_unknown() {
        let err = BronzeError::many(vec![]);

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.kinds().is_empty());
    }

    #[test]
    fn into_phase_wraps_client_errors_once() {
        let client = bronze_error!(
            ErrorKind::DestinationQueryFailed,
            "BigQuery query failed",
            "quota exceeded"
        );

        let wrapped = client.into_phase(ErrorKind::LoadFailed, "Bulk load failed");
        assert_eq!(wrapped.kind(), ErrorKind::LoadFailed);
        assert!(wrapped.detail().unwrap().contains("quota exceeded"));

        let rewrapped = wrapped
            .clone()
            .into_phase(ErrorKind::LoadFailed, "Bulk load failed");
        assert_eq!(rewrapped.to_string(), wrapped.to_string());
    }

    #[test]
    fn json_errors_are_serialization_errors() {
        let err: BronzeError = serde_json::from_str::<u32>("nope").unwrap_err().into();

        assert_eq!(err.kind(), ErrorKind::SerializationError);
    }
}
