use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{BronzeResult, ErrorKind};
use crate::source::Source;
use crate::types::TableData;

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, TableData>,
    reads: Vec<String>,
}

/// A [`Source`] serving tables from memory.
///
/// Clones share the same tables. Reading a table that was never inserted fails like a missing
/// relation would.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the content of `table_name`, replacing previous content.
    pub async fn insert_table(&self, table_name: impl Into<String>, data: TableData) {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(table_name.into(), data);
    }

    /// Returns the names of the tables read so far, in read order.
    pub async fn reads(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.reads.clone()
    }
}

impl Source for MemorySource {
    async fn read_table(&self, table_name: &str) -> BronzeResult<TableData> {
        let mut inner = self.inner.lock().await;
        inner.reads.push(table_name.to_string());

        let Some(data) = inner.tables.get(table_name) else {
            bail!(
                ErrorKind::SourceQueryFailed,
                "Source table does not exist",
                table_name
            );
        };

        info!(table_name, rows = data.rows.len(), "read table from memory source");

        Ok(data.clone())
    }
}
