use std::collections::BTreeSet;

use bronze_config::shared::SchemaDriftPolicy;
use tracing::{debug, info, warn};

use crate::bail;
use crate::destination::Destination;
use crate::error::{BronzeError, BronzeResult, ErrorKind};
use crate::schema::{FieldType, TableDescriptor};
use crate::types::{Row, Value};

/// Full-refresh loader: after a successful [`BulkLoader::load`] the destination table holds
/// exactly the loaded rows.
#[derive(Debug, Clone)]
pub struct BulkLoader<D> {
    destination: D,
    table_prefix: String,
    drift_policy: SchemaDriftPolicy,
}

impl<D> BulkLoader<D>
where
    D: Destination,
{
    pub fn new(
        destination: D,
        table_prefix: impl Into<String>,
        drift_policy: SchemaDriftPolicy,
    ) -> Self {
        Self {
            destination,
            table_prefix: table_prefix.into(),
            drift_policy,
        }
    }

    /// Overwrites the destination table of `descriptor` with `rows`.
    ///
    /// An empty `rows` leaves the table untouched. Rows are shaped to the descriptor first: source
    /// fields the descriptor lacks are dropped (or fail the load under
    /// [`SchemaDriftPolicy::Fail`]), absent fields are loaded as null and a null in a required
    /// field fails the load before anything is written.
    pub async fn load(&self, descriptor: &TableDescriptor, rows: Vec<Row>) -> BronzeResult<()> {
        let table_name = descriptor.destination_table_name(&self.table_prefix);

        if rows.is_empty() {
            warn!(table_name, "no rows to load, leaving destination table untouched");
            return Ok(());
        }

        let rows = self.shape_rows(&table_name, descriptor, rows)?;
        let row_count = rows.len();

        self.destination
            .replace_table_rows(&table_name, descriptor, rows)
            .await
            .map_err(load_error)?;

        info!(table_name, rows = row_count, "loaded rows into destination table");

        Ok(())
    }

    fn shape_rows(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
        rows: Vec<Row>,
    ) -> BronzeResult<Vec<Row>> {
        let unknown = rows
            .iter()
            .flat_map(Row::field_names)
            .filter(|name| descriptor.field(name).is_none())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>()
            .join(", ");

        if !unknown.is_empty() {
            match self.drift_policy {
                SchemaDriftPolicy::Fail => bail!(
                    ErrorKind::LoadFailed,
                    "Rows contain fields missing from the table descriptor",
                    format!("{table_name}: {unknown}")
                ),
                SchemaDriftPolicy::Warn => {
                    warn!(
                        table_name,
                        fields = %unknown,
                        "dropping source fields missing from the table descriptor"
                    )
                }
                SchemaDriftPolicy::Ignore => {
                    debug!(
                        table_name,
                        fields = %unknown,
                        "dropping source fields missing from the table descriptor"
                    )
                }
            }
        }

        let mut shaped = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let mut shaped_row = Row::with_capacity(descriptor.fields.len());
            for field in &descriptor.fields {
                let value = row.get(&field.name).cloned().unwrap_or(Value::Null);
                if field.required && value.is_null() {
                    bail!(
                        ErrorKind::LoadFailed,
                        "Required field is null",
                        format!("{table_name} row {index}: `{}`", field.name)
                    );
                }
                let Some(value) = coerce_value(field.field_type, value.clone()) else {
                    bail!(
                        ErrorKind::LoadFailed,
                        "Field value does not match its type",
                        format!(
                            "{table_name} row {index}: `{}` expects {}, got {value:?}",
                            field.name, field.field_type
                        )
                    );
                };
                shaped_row.insert(field.name.as_str(), value);
            }
            shaped.push(shaped_row);
        }

        Ok(shaped)
    }
}

/// Returns `value` in the shape a `field_type` column loads, `None` when it has no such shape.
///
/// Integer `0`/`1` flags load as booleans and integers widen to floats for decimal columns.
fn coerce_value(field_type: FieldType, value: Value) -> Option<Value> {
    match (field_type, value) {
        (_, Value::Null) => Some(Value::Null),
        (FieldType::Boolean, Value::Bool(value)) => Some(Value::Bool(value)),
        (FieldType::Boolean, Value::Integer(0)) => Some(Value::Bool(false)),
        (FieldType::Boolean, Value::Integer(1)) => Some(Value::Bool(true)),
        (FieldType::Integer, Value::Integer(value)) => Some(Value::Integer(value)),
        (FieldType::Float | FieldType::Numeric, Value::Float(value)) => Some(Value::Float(value)),
        (FieldType::Float | FieldType::Numeric, Value::Integer(value)) => {
            Some(Value::Float(value as f64))
        }
        (FieldType::String | FieldType::Date | FieldType::Timestamp, Value::String(value)) => {
            Some(Value::String(value))
        }
        _ => None,
    }
}

fn load_error(err: BronzeError) -> BronzeError {
    err.into_phase(ErrorKind::LoadFailed, "Failed to load rows into destination table")
}
