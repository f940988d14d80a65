use serde::Deserialize;

/// Metrics settings of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct MetricsConfig {
    /// File the rendered Prometheus metrics are written to when the run ends.
    ///
    /// Meant for a node exporter textfile collector. Metrics are not recorded when unset.
    pub textfile_path: Option<String>,
}
