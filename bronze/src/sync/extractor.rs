use chrono::{SecondsFormat, Utc};
use tracing::debug;

use crate::bronze_error;
use crate::conversions::normalize::normalize_cell;
use crate::error::{BronzeError, BronzeResult, ErrorKind};
use crate::schema::{EXTRACTED_AT_FIELD, LOADED_AT_FIELD};
use crate::source::Source;
use crate::types::{Row, TableData, Value};

/// Reads full source tables and turns them into destination ready [`Row`]s.
#[derive(Debug, Clone)]
pub struct SourceExtractor<S> {
    source: S,
}

impl<S> SourceExtractor<S>
where
    S: Source,
{
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Extracts every row of `table_name`.
    ///
    /// All rows of one call carry the same `extracted_at` and `loaded_at` timestamp, taken before
    /// the source is read.
    pub async fn extract(&self, table_name: &str) -> BronzeResult<Vec<Row>> {
        let extracted_at = extraction_timestamp();

        let data = self
            .source
            .read_table(table_name)
            .await
            .map_err(classify_source_error)?;

        let rows = normalize_table(data, &extracted_at)?;
        debug!(table_name, rows = rows.len(), %extracted_at, "extracted table");

        Ok(rows)
    }
}

/// Returns the current time as an ISO-8601 UTC timestamp with microseconds.
pub fn extraction_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn classify_source_error(err: BronzeError) -> BronzeError {
    match err.kind() {
        ErrorKind::SourceConnectionFailed | ErrorKind::SourceQueryFailed => err,
        _ => err.into_phase(ErrorKind::SourceQueryFailed, "Failed to read source table"),
    }
}

fn normalize_table(data: TableData, extracted_at: &str) -> BronzeResult<Vec<Row>> {
    let TableData { column_names, rows } = data;

    let mut normalized = Vec::with_capacity(rows.len());
    for (index, table_row) in rows.into_iter().enumerate() {
        if table_row.values.len() != column_names.len() {
            return Err(bronze_error!(
                ErrorKind::SourceQueryFailed,
                "Source row does not match its columns",
                format!(
                    "row {index} has {} values for {} columns",
                    table_row.values.len(),
                    column_names.len()
                )
            ));
        }

        let mut row = Row::with_capacity(column_names.len() + 2);
        for (name, cell) in column_names.iter().zip(table_row.values) {
            row.insert(name.as_str(), normalize_cell(cell));
        }
        row.insert(EXTRACTED_AT_FIELD, Value::from(extracted_at));
        row.insert(LOADED_AT_FIELD, Value::from(extracted_at));

        normalized.push(row);
    }

    Ok(normalized)
}
