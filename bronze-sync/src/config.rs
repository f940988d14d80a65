use bronze_config::load_config;
use bronze_config::shared::RunConfig;

/// Loads the [`RunConfig`], applies the tables given on the command line and validates it.
pub fn load_run_config(cli_tables: Vec<String>) -> anyhow::Result<RunConfig> {
    let mut config = load_config::<RunConfig>()?;
    apply_cli_tables(&mut config, cli_tables);
    config.validate()?;

    Ok(config)
}

/// Tables named on the command line replace the configured ones.
fn apply_cli_tables(config: &mut RunConfig, cli_tables: Vec<String>) {
    if !cli_tables.is_empty() {
        config.sync.tables = Some(cli_tables);
    }
}

#[cfg(test)]
mod tests {
    use bronze_config::shared::{DestinationConfig, ValidationError};

    use super::*;

    fn memory_config() -> RunConfig {
        RunConfig {
            destination: DestinationConfig::Memory {
                table_prefix: "bronze_".to_string(),
            },
            ..RunConfig::default()
        }
    }

    #[test]
    fn cli_tables_override_configured_tables() {
        let mut config = memory_config();
        config.sync.tables = Some(vec!["orders".to_string()]);

        apply_cli_tables(&mut config, vec!["customers".to_string(), "shippers".to_string()]);

        assert_eq!(
            config.sync.tables,
            Some(vec!["customers".to_string(), "shippers".to_string()])
        );
    }

    #[test]
    fn no_cli_tables_keeps_configured_tables() {
        let mut config = memory_config();
        config.sync.tables = Some(vec!["orders".to_string()]);

        apply_cli_tables(&mut config, vec![]);

        assert_eq!(config.sync.tables, Some(vec!["orders".to_string()]));
    }

    #[test]
    fn blank_cli_table_fails_validation() {
        let mut config = memory_config();

        apply_cli_tables(&mut config, vec![" ".to_string()]);

        assert_eq!(config.validate(), Err(ValidationError::EmptyTableName));
    }
}
