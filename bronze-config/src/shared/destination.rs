use serde::Deserialize;

use crate::shared::ValidationError;

const DEFAULT_DATASET_ID: &str = "northwind_bronze";
const DEFAULT_TABLE_PREFIX: &str = "bronze_";
/// Row payloads above this size are staged in chunks before being swapped in.
const DEFAULT_MAX_PAYLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Configuration of the store tables are loaded into.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationConfig {
    /// In-memory destination, used for dry runs and tests.
    Memory {
        #[serde(default = "default_table_prefix")]
        table_prefix: String,
    },
    /// Google BigQuery destination.
    BigQuery {
        /// Google Cloud project identifier. Required, a run without it fails before syncing.
        #[serde(default)]
        project_id: Option<String>,
        #[serde(default = "default_dataset_id")]
        dataset_id: String,
        /// Path to a service account key file.
        ///
        /// When unset, or when the file does not exist, application default credentials are used.
        #[serde(default)]
        service_account_key_path: Option<String>,
        /// Prefix prepended to the source table name to form the destination table name.
        #[serde(default = "default_table_prefix")]
        table_prefix: String,
        /// Upper bound of a single load request payload.
        #[serde(default = "default_max_payload_bytes")]
        max_payload_bytes: usize,
    },
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self::BigQuery {
            project_id: None,
            dataset_id: default_dataset_id(),
            service_account_key_path: None,
            table_prefix: default_table_prefix(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl DestinationConfig {
    pub fn table_prefix(&self) -> &str {
        match self {
            Self::Memory { table_prefix } | Self::BigQuery { table_prefix, .. } => table_prefix,
        }
    }

    /// Returns the project id used to tag logs and metrics, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::Memory { .. } => None,
            Self::BigQuery { project_id, .. } => project_id.as_deref(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Memory { .. } => Ok(()),
            Self::BigQuery {
                project_id,
                dataset_id,
                max_payload_bytes,
                ..
            } => {
                if project_id.as_deref().is_none_or(|id| id.trim().is_empty()) {
                    return Err(ValidationError::MissingProjectId);
                }
                if dataset_id.trim().is_empty() {
                    return Err(ValidationError::EmptyDatasetId);
                }
                if *max_payload_bytes == 0 {
                    return Err(ValidationError::MaxPayloadBytesZero);
                }

                Ok(())
            }
        }
    }
}

fn default_dataset_id() -> String {
    DEFAULT_DATASET_ID.to_string()
}

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_query_defaults_fill_missing_fields() {
        let config: DestinationConfig =
            serde_json::from_str(r#"{"big_query": {"project_id": "acme"}}"#).unwrap();

        assert_eq!(
            config,
            DestinationConfig::BigQuery {
                project_id: Some("acme".to_string()),
                dataset_id: "northwind_bronze".to_string(),
                service_account_key_path: None,
                table_prefix: "bronze_".to_string(),
                max_payload_bytes: 8 * 1024 * 1024,
            }
        );
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn missing_or_blank_project_id_is_rejected() {
        assert_eq!(
            DestinationConfig::default().validate(),
            Err(ValidationError::MissingProjectId)
        );

        let blank: DestinationConfig =
            serde_json::from_str(r#"{"big_query": {"project_id": "  "}}"#).unwrap();
        assert_eq!(blank.validate(), Err(ValidationError::MissingProjectId));
    }

    #[test]
    fn memory_destination_needs_no_project() {
        let config: DestinationConfig = serde_json::from_str(r#"{"memory": {}}"#).unwrap();

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.table_prefix(), "bronze_");
        assert_eq!(config.project_id(), None);
    }
}
