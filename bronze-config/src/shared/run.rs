use serde::Deserialize;

use crate::load::{Config, EnvAlias};
use crate::shared::{
    DestinationConfig, MetricsConfig, PgConnectionConfig, SyncConfig, ValidationError,
};

/// Complete configuration of a `bronze-sync` run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct RunConfig {
    pub source: PgConnectionConfig,
    pub destination: DestinationConfig,
    pub sync: SyncConfig,
    pub metrics: MetricsConfig,
}

impl RunConfig {
    /// Runs the pre-flight checks of every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.destination.validate()?;
        self.sync.validate()
    }
}

impl Config for RunConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["sync.tables"];

    const ENV_ALIASES: &'static [EnvAlias] = &[
        EnvAlias {
            var: "POSTGRES_HOST",
            key: "source.host",
        },
        EnvAlias {
            var: "POSTGRES_PORT",
            key: "source.port",
        },
        EnvAlias {
            var: "POSTGRES_DB",
            key: "source.name",
        },
        EnvAlias {
            var: "POSTGRES_USER",
            key: "source.username",
        },
        EnvAlias {
            var: "POSTGRES_PASSWORD",
            key: "source.password",
        },
        EnvAlias {
            var: "GCP_PROJECT_ID",
            key: "destination.big_query.project_id",
        },
        EnvAlias {
            var: "BIGQUERY_DATASET",
            key: "destination.big_query.dataset_id",
        },
        EnvAlias {
            var: "GOOGLE_APPLICATION_CREDENTIALS",
            key: "destination.big_query.service_account_key_path",
        },
    ];
}
