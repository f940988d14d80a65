use std::fmt;
use std::path::{Path, PathBuf};

use bronze::error::BronzeResult;
use gcp_bigquery_client::Client;
use tracing::info;

use crate::bigquery::client::bq_error_to_bronze_error;

/// How the BigQuery client authenticates.
///
/// The strategy is chosen once per run, before any table is synchronized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// A service account key file on disk.
    ServiceAccountKeyFile(PathBuf),
    /// Google application default credentials: the metadata server, the gcloud user login or the
    /// file named by `GOOGLE_APPLICATION_CREDENTIALS`.
    ApplicationDefault,
}

impl CredentialStrategy {
    /// Picks the key file when `key_path` is set and points at an existing file, application
    /// default credentials otherwise.
    pub fn resolve(key_path: Option<&str>) -> CredentialStrategy {
        match key_path.map(Path::new) {
            Some(path) if path.is_file() => {
                CredentialStrategy::ServiceAccountKeyFile(path.to_path_buf())
            }
            Some(path) => {
                info!(
                    path = %path.display(),
                    "service account key file not found, using application default credentials"
                );
                CredentialStrategy::ApplicationDefault
            }
            None => CredentialStrategy::ApplicationDefault,
        }
    }

    /// Builds an authenticated BigQuery [`Client`].
    pub async fn build_client(&self) -> BronzeResult<Client> {
        info!(strategy = %self, "authenticating with BigQuery");

        let client = match self {
            CredentialStrategy::ServiceAccountKeyFile(path) => {
                Client::from_service_account_key_file(&path.to_string_lossy()).await
            }
            CredentialStrategy::ApplicationDefault => {
                Client::from_application_default_credentials().await
            }
        };

        client.map_err(bq_error_to_bronze_error)
    }
}

impl fmt::Display for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialStrategy::ServiceAccountKeyFile(path) => {
                write!(f, "service account key file {}", path.display())
            }
            CredentialStrategy::ApplicationDefault => {
                f.write_str("application default credentials")
            }
        }
    }
}
