use std::fmt;

use bronze_config::shared::SchemaDriftPolicy;
use tracing::{debug, info, warn};

use crate::bronze_error;
use crate::destination::Destination;
use crate::error::{BronzeError, BronzeResult, ErrorKind};
use crate::schema::TableDescriptor;

/// Difference between a descriptor and the columns of an existing destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDrift {
    /// Descriptor fields the destination table lacks.
    pub missing: Vec<String>,
    /// Destination columns the descriptor does not know.
    pub unexpected: Vec<String>,
}

impl SchemaDrift {
    /// Compares by column name only, returns `None` when both sides hold the same names.
    pub fn detect(descriptor: &TableDescriptor, columns: &[String]) -> Option<SchemaDrift> {
        let missing: Vec<String> = descriptor
            .field_names()
            .filter(|field| !columns.iter().any(|column| column == field))
            .map(str::to_string)
            .collect();
        let unexpected: Vec<String> = columns
            .iter()
            .filter(|column| descriptor.field(column).is_none())
            .cloned()
            .collect();

        if missing.is_empty() && unexpected.is_empty() {
            return None;
        }

        Some(SchemaDrift {
            missing,
            unexpected,
        })
    }
}

impl fmt::Display for SchemaDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing columns [{}], unexpected columns [{}]",
            self.missing.join(", "),
            self.unexpected.join(", ")
        )
    }
}

/// Makes sure the destination table of a descriptor exists.
#[derive(Debug, Clone)]
pub struct DestinationSchemaManager<D> {
    destination: D,
    table_prefix: String,
    drift_policy: SchemaDriftPolicy,
}

impl<D> DestinationSchemaManager<D>
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

    /// Creates the destination table of `descriptor` unless it already exists.
    ///
    /// Existing tables are never altered. Their columns are compared with the descriptor and a
    /// drift is handled according to the configured [`SchemaDriftPolicy`].
    pub async fn ensure(&self, descriptor: &TableDescriptor) -> BronzeResult<()> {
        let table_name = descriptor.destination_table_name(&self.table_prefix);

        let columns = self
            .destination
            .table_columns(&table_name)
            .await
            .map_err(schema_error)?;

        match columns {
            Some(columns) => self.check_drift(&table_name, descriptor, &columns),
            None => {
                self.destination
                    .create_table(&table_name, descriptor)
                    .await
                    .map_err(schema_error)?;
                info!(table_name, "created destination table");

                Ok(())
            }
        }
    }

    fn check_drift(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
        columns: &[String],
    ) -> BronzeResult<()> {
        let Some(drift) = SchemaDrift::detect(descriptor, columns) else {
            debug!(table_name, "destination table already exists");
            return Ok(());
        };

        match self.drift_policy {
            SchemaDriftPolicy::Ignore => {
                debug!(table_name, %drift, "destination table schema drifted");
                Ok(())
            }
            SchemaDriftPolicy::Warn => {
                warn!(table_name, %drift, "destination table schema drifted, loading anyway");
                Ok(())
            }
            SchemaDriftPolicy::Fail => Err(bronze_error!(
                ErrorKind::SchemaManagementFailed,
                "Destination table schema drifted",
                format!("{table_name}: {drift}")
            )),
        }
    }
}

fn schema_error(err: BronzeError) -> BronzeError {
    err.into_phase(
        ErrorKind::SchemaManagementFailed,
        "Failed to prepare destination table",
    )
}
