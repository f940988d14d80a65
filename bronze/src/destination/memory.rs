use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::destination::Destination;
use crate::error::{BronzeResult, ErrorKind};
use crate::schema::TableDescriptor;
use crate::types::Row;

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<String, MemoryTable>,
}

/// A [`Destination`] keeping tables in memory.
///
/// Clones share the same tables, which lets tests inspect what a sync wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `table_name` with `columns`, replacing any existing table.
    pub async fn insert_table(&self, table_name: impl Into<String>, columns: Vec<String>) {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(
            table_name.into(),
            MemoryTable {
                columns,
                rows: Vec::new(),
            },
        );
    }

    /// Returns the rows of `table_name`, `None` if the table does not exist.
    pub async fn table_rows(&self, table_name: &str) -> Option<Vec<Row>> {
        let inner = self.inner.lock().await;
        inner.tables.get(table_name).map(|table| table.rows.clone())
    }

    /// Returns the names of every table, sorted.
    pub async fn table_names(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.tables.keys().cloned().collect()
    }
}

impl Destination for MemoryDestination {
    async fn table_columns(&self, table_name: &str) -> BronzeResult<Option<Vec<String>>> {
        let inner = self.inner.lock().await;

        Ok(inner
            .tables
            .get(table_name)
            .map(|table| table.columns.clone()))
    }

    async fn create_table(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
    ) -> BronzeResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.tables.contains_key(table_name) {
            return Ok(());
        }

        info!(table_name, "creating table in memory destination");
        inner.tables.insert(
            table_name.to_string(),
            MemoryTable {
                columns: descriptor.field_names().map(str::to_string).collect(),
                rows: Vec::new(),
            },
        );

        Ok(())
    }

    async fn replace_table_rows(
        &self,
        table_name: &str,
        _descriptor: &TableDescriptor,
        rows: Vec<Row>,
    ) -> BronzeResult<()> {
        let mut inner = self.inner.lock().await;
        let Some(table) = inner.tables.get_mut(table_name) else {
            bail!(
                ErrorKind::DestinationQueryFailed,
                "Destination table does not exist",
                table_name
            );
        };

        info!(table_name, rows = rows.len(), "replacing rows in memory destination");
        table.rows = rows;

        Ok(())
    }
}
