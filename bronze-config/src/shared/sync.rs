use serde::Deserialize;

use crate::shared::ValidationError;

/// How a difference between the registry descriptor and an existing destination table is handled.
///
/// Tables are never migrated, the policy only decides how loudly a drift is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaDriftPolicy {
    /// Log the drift at debug level and continue.
    Ignore,
    /// Log a warning naming the drifted columns and continue.
    #[default]
    Warn,
    /// Fail the table.
    Fail,
}

/// Settings of a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SyncConfig {
    /// Tables to synchronize. `None` synchronizes the default table set.
    pub tables: Option<Vec<String>>,
    /// Maximum number of tables synchronized at the same time.
    pub max_concurrent_tables: u16,
    pub schema_drift: SchemaDriftPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tables: None,
            max_concurrent_tables: 1,
            schema_drift: SchemaDriftPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent_tables == 0 {
            return Err(ValidationError::MaxConcurrentTablesZero);
        }

        if let Some(tables) = &self.tables
            && tables.iter().any(|table| table.trim().is_empty())
        {
            return Err(ValidationError::EmptyTableName);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sequential_with_warnings() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.max_concurrent_tables, 1);
        assert_eq!(config.schema_drift, SchemaDriftPolicy::Warn);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = SyncConfig {
            max_concurrent_tables: 0,
            ..SyncConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(ValidationError::MaxConcurrentTablesZero)
        );
    }

    #[test]
    fn blank_table_names_are_rejected() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"tables": ["customers", " "], "schema_drift": "fail"}"#)
                .unwrap();

        assert_eq!(config.schema_drift, SchemaDriftPolicy::Fail);
        assert_eq!(config.validate(), Err(ValidationError::EmptyTableName));
    }
}
