use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bronze::destination::Destination;
use bronze::destination::memory::MemoryDestination;
use bronze::schema::SchemaRegistry;
use bronze::source::Source;
use bronze::source::postgres::PgSource;
use bronze::sync::{SyncOptions, SyncOrchestrator};
use bronze::types::RunSummary;
use bronze_config::shared::{DestinationConfig, PgConnectionConfig, RunConfig, SyncConfig};
use bronze_destinations::bigquery::BigQueryDestination;
use bronze_telemetry::metrics::{init_metrics_handle, write_metrics_textfile};
use tracing::{debug, info, warn};

/// Runs one sync of the configured tables and prints the [`RunSummary`] as JSON on stdout.
///
/// Only failures preventing any table from being attempted are returned as errors, table failures
/// are part of the summary.
pub async fn run_with_config(run_config: RunConfig) -> anyhow::Result<RunSummary> {
    info!("starting bronze sync run");

    log_config(&run_config);

    let metrics_handle = match &run_config.metrics.textfile_path {
        Some(_) => Some(init_metrics_handle(run_config.destination.project_id())?),
        None => None,
    };

    let registry = Arc::new(SchemaRegistry::northwind());
    let source = PgSource::new(run_config.source.clone());
    let options = SyncOptions::from_config(&run_config.sync, run_config.destination.table_prefix());
    let tables = run_config.sync.tables.clone();

    // Static dispatch over destinations, one arm per destination type.
    let summary = match &run_config.destination {
        DestinationConfig::Memory { .. } => {
            let destination = MemoryDestination::new();

            sync_tables(registry, source, destination, options, tables).await
        }
        DestinationConfig::BigQuery {
            project_id,
            dataset_id,
            service_account_key_path,
            max_payload_bytes,
            ..
        } => {
            let project_id = project_id
                .clone()
                .context("a BigQuery project id is required")?;
            let destination = BigQueryDestination::new(
                project_id,
                dataset_id.clone(),
                service_account_key_path.as_deref(),
                *max_payload_bytes,
            )
            .await?;

            sync_tables(registry, source, destination, options, tables).await
        }
    };

    print_summary(&summary)?;

    if let (Some(handle), Some(path)) = (&metrics_handle, &run_config.metrics.textfile_path)
        && let Err(err) = write_metrics_textfile(handle, Path::new(path))
    {
        warn!(path, error = %err, "failed to write metrics textfile");
    }

    info!(
        successful = summary.successful,
        failed = summary.failed,
        "bronze sync run completed"
    );

    Ok(summary)
}

async fn sync_tables<S, D>(
    registry: Arc<SchemaRegistry>,
    source: S,
    destination: D,
    options: SyncOptions,
    tables: Option<Vec<String>>,
) -> RunSummary
where
    S: Source,
    D: Destination + Clone,
{
    let orchestrator = SyncOrchestrator::new(registry, source, destination, options);

    orchestrator.sync_all_tables(tables).await
}

fn print_summary(summary: &RunSummary) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, summary)?;
    writeln!(stdout)?;

    Ok(())
}

fn log_config(config: &RunConfig) {
    log_pg_connection_config(&config.source);
    log_destination_config(&config.destination);
    log_sync_config(&config.sync);
}

fn log_pg_connection_config(config: &PgConnectionConfig) {
    debug!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        schema = config.schema,
        tls_enabled = config.tls.enabled,
        "source postgres connection config",
    );
}

fn log_destination_config(config: &DestinationConfig) {
    match config {
        DestinationConfig::Memory { table_prefix } => {
            debug!(table_prefix, "using memory destination config");
        }
        DestinationConfig::BigQuery {
            project_id,
            dataset_id,
            service_account_key_path,
            table_prefix,
            max_payload_bytes,
        } => {
            debug!(
                project_id,
                dataset_id,
                service_account_key_path,
                table_prefix,
                max_payload_bytes,
                "using bigquery destination config"
            )
        }
    }
}

fn log_sync_config(config: &SyncConfig) {
    debug!(
        tables = ?config.tables,
        max_concurrent_tables = config.max_concurrent_tables,
        schema_drift = ?config.schema_drift,
        "sync config"
    );
}

#[cfg(test)]
mod tests {
    use bronze::error::ErrorKind;
    use bronze_config::shared::{MetricsConfig, TlsConfig};

    use super::*;

    fn unreachable_source() -> PgConnectionConfig {
        PgConnectionConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            tls: TlsConfig::default(),
            ..PgConnectionConfig::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_source_fails_tables_but_not_the_run() {
        let run_config = RunConfig {
            source: unreachable_source(),
            destination: DestinationConfig::Memory {
                table_prefix: "bronze_".to_string(),
            },
            sync: SyncConfig {
                tables: Some(vec!["shippers".to_string(), "orders".to_string()]),
                ..SyncConfig::default()
            },
            metrics: MetricsConfig::default(),
        };

        let summary = run_with_config(run_config).await.unwrap();

        assert_eq!(summary.total_tables, 2);
        assert_eq!(summary.failed, 2);
        assert!(
            summary
                .results
                .iter()
                .all(|result| result.error_kind == Some(ErrorKind::SourceConnectionFailed))
        );
    }
}
