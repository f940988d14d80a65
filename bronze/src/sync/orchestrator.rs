use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use bronze_config::shared::{SchemaDriftPolicy, SyncConfig};
use chrono::Utc;
use futures::{FutureExt, StreamExt, stream};
use metrics::{counter, histogram};
use tracing::{error, info};

use crate::bronze_error;
use crate::destination::Destination;
use crate::error::{BronzeResult, ErrorKind};
use crate::metrics::{
    BRONZE_RECORDS_SYNCED_TOTAL, BRONZE_TABLE_SYNC_DURATION_SECONDS, BRONZE_TABLES_SYNCED_TOTAL,
    ERROR_KIND, STATUS, TABLE, register_metrics,
};
use crate::schema::{DEFAULT_TABLES, SchemaRegistry};
use crate::source::Source;
use crate::sync::{BulkLoader, DestinationSchemaManager, SourceExtractor};
use crate::types::{RunSummary, SyncResult};

/// Options shared by every table sync of an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Prefix turning a source table name into its destination table name.
    pub table_prefix: String,
    /// Number of tables synchronized at the same time, `1` syncs one table after the other.
    pub max_concurrent_tables: usize,
    pub schema_drift: SchemaDriftPolicy,
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig, table_prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: table_prefix.into(),
            max_concurrent_tables: usize::from(config.max_concurrent_tables),
            schema_drift: config.schema_drift,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default(), "bronze_")
    }
}

/// Drives table syncs and turns every failure into a failed [`SyncResult`].
#[derive(Debug)]
pub struct SyncOrchestrator<S, D> {
    registry: Arc<SchemaRegistry>,
    extractor: SourceExtractor<S>,
    schema_manager: DestinationSchemaManager<D>,
    loader: BulkLoader<D>,
    max_concurrent_tables: usize,
}

impl<S, D> SyncOrchestrator<S, D>
where
    S: Source,
    D: Destination + Clone,
{
    pub fn new(
        registry: Arc<SchemaRegistry>,
        source: S,
        destination: D,
        options: SyncOptions,
    ) -> Self {
        register_metrics();

        Self {
            registry,
            extractor: SourceExtractor::new(source),
            schema_manager: DestinationSchemaManager::new(
                destination.clone(),
                options.table_prefix.clone(),
                options.schema_drift,
            ),
            loader: BulkLoader::new(destination, options.table_prefix, options.schema_drift),
            max_concurrent_tables: options.max_concurrent_tables.max(1),
        }
    }

    /// Synchronizes one table. Never fails: errors, panics included, become a failed result.
    #[tracing::instrument(name = "sync_table", skip_all, fields(table = %table_name))]
    pub async fn sync_table(&self, table_name: &str) -> SyncResult {
        info!("starting table sync");
        let started_at = Utc::now();
        let start = Instant::now();

        let outcome = AssertUnwindSafe(self.try_sync_table(table_name))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(bronze_error!(
                    ErrorKind::SyncPanicked,
                    "Table sync panicked",
                    table_name
                ))
            });
        let duration = start.elapsed();

        histogram!(BRONZE_TABLE_SYNC_DURATION_SECONDS, TABLE => table_name.to_string())
            .record(duration.as_secs_f64());

        match outcome {
            Ok(records_synced) => {
                counter!(BRONZE_TABLES_SYNCED_TOTAL, STATUS => "success").increment(1);
                counter!(BRONZE_RECORDS_SYNCED_TOTAL, TABLE => table_name.to_string())
                    .increment(records_synced);
                info!(
                    records_synced,
                    duration_ms = duration.as_millis() as u64,
                    "table sync finished"
                );

                SyncResult::success(table_name, records_synced, started_at, duration)
            }
            Err(err) => {
                counter!(
                    BRONZE_TABLES_SYNCED_TOTAL,
                    STATUS => "failed",
                    ERROR_KIND => err.kind().as_str()
                )
                .increment(1);
                error!(error = %err, "table sync failed");

                SyncResult::failure(table_name, &err, started_at, duration)
            }
        }
    }

    async fn try_sync_table(&self, table_name: &str) -> BronzeResult<u64> {
        let descriptor = self.registry.lookup(table_name)?;

        self.schema_manager.ensure(descriptor).await?;

        let rows = self.extractor.extract(table_name).await?;
        let records_synced = rows.len() as u64;

        self.loader.load(descriptor, rows).await?;

        Ok(records_synced)
    }

    /// Synchronizes `table_names` and summarizes the outcomes in invocation order.
    ///
    /// A failing table never prevents the following ones from being attempted.
    pub async fn sync_tables<T>(&self, table_names: &[T]) -> RunSummary
    where
        T: AsRef<str>,
    {
        info!(
            tables = table_names.len(),
            max_concurrent_tables = self.max_concurrent_tables,
            "starting sync run"
        );

        let results = stream::iter(table_names)
            .map(move |table_name| self.sync_table(table_name.as_ref()))
            .buffered(self.max_concurrent_tables)
            .collect::<Vec<_>>()
            .await;

        let summary = RunSummary::from_results(results);
        info!(
            successful = summary.successful,
            failed = summary.failed,
            total_tables = summary.total_tables,
            total_records = summary.total_records,
            "sync run finished"
        );

        summary
    }

    /// Synchronizes `tables`, or the default table set when `None`.
    pub async fn sync_all_tables(&self, tables: Option<Vec<String>>) -> RunSummary {
        match tables {
            Some(tables) => self.sync_tables(&tables).await,
            None => self.sync_tables(&DEFAULT_TABLES).await,
        }
    }
}
