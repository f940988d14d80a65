use config::{ConfigError, Map};
use serde::de::DeserializeOwned;

use crate::environment::Environment;

/// Directory containing configuration files relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Base configuration file loaded for all environments.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
///
/// Example: `APP_SOURCE__HOST` sets the `source.host` field.
const ENV_SEPARATOR: &str = "__";

/// Separator for list elements in environment variables.
///
/// Example: `APP_SYNC__TABLES=customers,orders` sets the `sync.tables` array field.
const LIST_SEPARATOR: &str = ",";

/// Maps a conventional, unprefixed environment variable onto a configuration key.
#[derive(Debug, Clone, Copy)]
pub struct EnvAlias {
    /// Name of the environment variable, e.g. `POSTGRES_HOST`.
    pub var: &'static str,
    /// Dotted configuration key the variable sets, e.g. `source.host`.
    pub key: &'static str,
}

/// Describes how a configuration type is assembled from environment variables.
pub trait Config {
    /// Keys whose environment variable values are split on `,` into lists.
    const LIST_PARSE_KEYS: &'static [&'static str];

    /// Unprefixed environment variables honored in addition to the `APP_` ones.
    ///
    /// Aliases take precedence over configuration files but are overridden by `APP_` variables.
    const ENV_ALIASES: &'static [EnvAlias] = &[];
}

/// Loads hierarchical configuration from YAML files and environment variables.
///
/// Sources in increasing order of precedence:
/// 1. `configuration/base.yaml`
/// 2. `configuration/{environment}.yaml`
/// 3. aliased variables from [`Config::ENV_ALIASES`]
/// 4. variables prefixed with `APP`, nested with `__`, lists separated by `,`
///
/// Both files are optional so a run can be configured purely through the environment.
pub fn load_config<T>() -> Result<T, ConfigError>
where
    T: Config + DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(|err| {
        ConfigError::Message(format!("failed to determine the current directory: {err}"))
    })?;
    let configuration_directory = base_path.join(CONFIGURATION_DIR);

    let environment = Environment::load().map_err(|err| ConfigError::Message(err.to_string()))?;
    let environment_filename = format!("{environment}.yaml");

    let mut environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    if !<T as Config>::LIST_PARSE_KEYS.is_empty() {
        environment_source = environment_source
            .try_parsing(true)
            .list_separator(LIST_SEPARATOR);

        for key in <T as Config>::LIST_PARSE_KEYS {
            environment_source = environment_source.with_list_parse_key(key);
        }
    }

    let alias_source = config::Environment::default()
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
        .source(Some(collect_aliases(
            <T as Config>::ENV_ALIASES,
            |var| std::env::var(var).ok(),
        )));

    let settings = config::Config::builder()
        .add_source(
            config::File::from(configuration_directory.join(BASE_CONFIG_FILE)).required(false),
        )
        .add_source(
            config::File::from(configuration_directory.join(environment_filename))
                .required(false),
        )
        .add_source(alias_source)
        .add_source(environment_source)
        .build()?;

    settings.try_deserialize::<T>()
}

/// Resolves every alias that has a non-empty value into an environment-style key map.
///
/// Keys are emitted in the `__` nested form understood by [`config::Environment`].
fn collect_aliases<F>(aliases: &[EnvAlias], lookup: F) -> Map<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut resolved = Map::new();
    for alias in aliases {
        if let Some(value) = lookup(alias.var)
            && !value.is_empty()
        {
            resolved.insert(alias.key.replace('.', ENV_SEPARATOR), value);
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALIASES: &[EnvAlias] = &[
        EnvAlias {
            var: "POSTGRES_HOST",
            key: "source.host",
        },
        EnvAlias {
            var: "GCP_PROJECT_ID",
            key: "destination.big_query.project_id",
        },
    ];

    #[test]
    fn aliases_are_rewritten_to_nested_keys() {
        let resolved = collect_aliases(ALIASES, |var| match var {
            "POSTGRES_HOST" => Some("db.internal".to_string()),
            "GCP_PROJECT_ID" => Some("analytics-prod".to_string()),
            _ => None,
        });

        assert_eq!(
            resolved.get("source__host").map(String::as_str),
            Some("db.internal")
        );
        assert_eq!(
            resolved
                .get("destination__big_query__project_id")
                .map(String::as_str),
            Some("analytics-prod")
        );
    }

    #[test]
    fn unset_and_empty_aliases_are_skipped() {
        let resolved = collect_aliases(ALIASES, |var| match var {
            "POSTGRES_HOST" => Some(String::new()),
            _ => None,
        });

        assert!(resolved.is_empty());
    }
}
