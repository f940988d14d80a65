use std::future::Future;

use crate::error::BronzeResult;
use crate::types::TableData;

/// A store full table snapshots are read from.
///
/// Implementations acquire whatever connection they need per call and release it before
/// returning, on success and on failure.
pub trait Source {
    /// Reads every row of `table_name`.
    ///
    /// Fails with [`crate::error::ErrorKind::SourceConnectionFailed`] when the store cannot be
    /// reached and [`crate::error::ErrorKind::SourceQueryFailed`] when reading fails.
    fn read_table(&self, table_name: &str) -> impl Future<Output = BronzeResult<TableData>> + Send;
}
