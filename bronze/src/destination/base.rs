use std::future::Future;

use crate::error::BronzeResult;
use crate::schema::TableDescriptor;
use crate::types::Row;

/// A store holding the destination copy of synchronized tables.
///
/// Table names passed to a [`Destination`] are destination names, already prefixed.
pub trait Destination {
    /// Returns the column names of `table_name`, or `None` if the table does not exist.
    fn table_columns(
        &self,
        table_name: &str,
    ) -> impl Future<Output = BronzeResult<Option<Vec<String>>>> + Send;

    /// Creates `table_name` with the fields of `descriptor`.
    ///
    /// Creating a table that already exists must succeed without changing it.
    fn create_table(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
    ) -> impl Future<Output = BronzeResult<()>> + Send;

    /// Replaces the whole content of `table_name` with `rows`.
    ///
    /// The replacement is atomic: on failure the previous content is kept. Every row carries
    /// exactly the fields of `descriptor`, in descriptor order.
    fn replace_table_rows(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
        rows: Vec<Row>,
    ) -> impl Future<Output = BronzeResult<()>> + Send;
}
