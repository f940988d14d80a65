use std::collections::HashMap;
use std::sync::Arc;

use crate::bronze_error;
use crate::destination::Destination;
use crate::error::{BronzeResult, ErrorKind};
use crate::schema::TableDescriptor;
use crate::source::Source;
use crate::types::{Row, TableData};

/// A [`Source`] failing reads of chosen tables with a chosen [`ErrorKind`].
#[derive(Debug, Clone)]
pub struct FaultySource<S> {
    inner: S,
    failures: Arc<HashMap<String, ErrorKind>>,
}

impl<S> FaultySource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failures: Arc::new(HashMap::new()),
        }
    }

    /// Makes every read of `table_name` fail with `kind`.
    pub fn fail_table(mut self, table_name: impl Into<String>, kind: ErrorKind) -> Self {
        Arc::make_mut(&mut self.failures).insert(table_name.into(), kind);
        self
    }
}

impl<S> Source for FaultySource<S>
where
    S: Source + Sync,
{
    async fn read_table(&self, table_name: &str) -> BronzeResult<TableData> {
        if let Some(kind) = self.failures.get(table_name) {
            return Err(bronze_error!(*kind, "Injected source failure", table_name));
        }

        self.inner.read_table(table_name).await
    }
}

/// Destination operations a [`FaultyDestination`] can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationOperation {
    TableColumns,
    CreateTable,
    ReplaceTableRows,
}

/// A [`Destination`] failing chosen operations on chosen tables.
#[derive(Debug, Clone)]
pub struct FaultyDestination<D> {
    inner: D,
    failures: Arc<HashMap<(String, DestinationOperation), ErrorKind>>,
}

impl<D> FaultyDestination<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            failures: Arc::new(HashMap::new()),
        }
    }

    /// Makes `operation` on the destination table `table_name` fail with `kind`.
    pub fn fail(
        mut self,
        table_name: impl Into<String>,
        operation: DestinationOperation,
        kind: ErrorKind,
    ) -> Self {
        Arc::make_mut(&mut self.failures).insert((table_name.into(), operation), kind);
        self
    }

    fn check(&self, table_name: &str, operation: DestinationOperation) -> BronzeResult<()> {
        match self.failures.get(&(table_name.to_string(), operation)) {
            Some(kind) => Err(bronze_error!(
                *kind,
                "Injected destination failure",
                format!("{operation:?} on {table_name}")
            )),
            None => Ok(()),
        }
    }
}

impl<D> Destination for FaultyDestination<D>
where
    D: Destination + Sync,
{
    async fn table_columns(&self, table_name: &str) -> BronzeResult<Option<Vec<String>>> {
        self.check(table_name, DestinationOperation::TableColumns)?;
        self.inner.table_columns(table_name).await
    }

    async fn create_table(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
    ) -> BronzeResult<()> {
        self.check(table_name, DestinationOperation::CreateTable)?;
        self.inner.create_table(table_name, descriptor).await
    }

    async fn replace_table_rows(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
        rows: Vec<Row>,
    ) -> BronzeResult<()> {
        self.check(table_name, DestinationOperation::ReplaceTableRows)?;
        self.inner
            .replace_table_rows(table_name, descriptor, rows)
            .await
    }
}
