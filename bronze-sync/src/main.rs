use std::process::ExitCode;

use bronze::types::RunSummary;
use bronze_telemetry::tracing::{TopLevelFields, init_tracing_with_top_level_fields};
use clap::Parser;
use uuid::Uuid;

use crate::config::load_run_config;
use crate::core::run_with_config;

mod config;
mod core;

/// Exit code of a run where at least one table failed to sync.
const EXIT_TABLE_FAILED: u8 = 1;
/// Exit code of a run that stopped before syncing any table.
const EXIT_FATAL: u8 = 2;

/// Copies Postgres tables into BigQuery as full snapshots.
#[derive(Debug, Parser)]
#[command(name = "bronze-sync", version, about)]
struct Cli {
    /// Tables to synchronize. Overrides `sync.tables`, every Northwind table is synchronized when
    /// neither is set.
    tables: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match try_main(cli) {
        Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_TABLE_FAILED),
        Err(err) => {
            eprintln!("bronze-sync failed: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn try_main(cli: Cli) -> anyhow::Result<RunSummary> {
    // Configuration errors are reported before any table is attempted.
    let run_config = load_run_config(cli.tables)?;

    let top_level_fields = TopLevelFields {
        project: run_config.destination.project_id().map(str::to_string),
        run_id: Some(Uuid::new_v4().to_string()),
    };
    let _log_flusher =
        init_tracing_with_top_level_fields(env!("CARGO_BIN_NAME"), top_level_fields)?;

    let summary = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_with_config(run_config))?;

    Ok(summary)
}
