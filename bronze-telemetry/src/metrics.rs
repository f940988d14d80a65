use std::path::Path;
use std::sync::Mutex;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// A mutex instead of a `OnceLock` because installation is fallible and a recorder can only be
// installed once per process, while tests ask for a handle many times.
static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Errors raised while recording or exporting metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to install the prometheus recorder: {0}")]
    Build(#[from] BuildError),

    #[error("failed to write metrics textfile: {0}")]
    Io(#[from] std::io::Error),

    #[error("the metrics recorder lock is poisoned")]
    Poisoned,
}

/// Installs the global Prometheus recorder once and returns a handle to it.
///
/// When `project_ref` is set it is attached to every metric as the `project` label. Later calls
/// return the existing handle and ignore the label.
pub fn init_metrics_handle(project_ref: Option<&str>) -> Result<PrometheusHandle, MetricsError> {
    let mut prometheus_handle = PROMETHEUS_HANDLE
        .lock()
        .map_err(|_| MetricsError::Poisoned)?;

    if let Some(handle) = &*prometheus_handle {
        return Ok(handle.clone());
    }

    let mut builder = PrometheusBuilder::new();
    if let Some(project_ref) = project_ref {
        builder = builder.add_global_label("project", project_ref);
    }

    let handle = builder.install_recorder()?;
    *prometheus_handle = Some(handle.clone());

    Ok(handle)
}

/// Renders the recorded metrics into `path` in the Prometheus text format.
///
/// The file is written next to its final location and renamed so collectors never observe a
/// partially written file.
pub fn write_metrics_textfile(handle: &PrometheusHandle, path: &Path) -> Result<(), MetricsError> {
    handle.run_upkeep();
    let rendered = handle.render();

    let staging_path = path.with_extension("prom.tmp");
    std::fs::write(&staging_path, rendered)?;
    std::fs::rename(&staging_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textfile_contains_recorded_counters() {
        let handle = init_metrics_handle(None).unwrap();
        metrics::counter!("bronze_telemetry_test_total").increment(3);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bronze.prom");
        write_metrics_textfile(&handle, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("bronze_telemetry_test_total 3"));
        assert!(!dir.path().join("bronze.prom.tmp").exists());
    }
}
