use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio_postgres::{Config as TokioPgConnectOptions, config::SslMode as TokioPgSslMode};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

const DEFAULT_HOST: &str = "postgres";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_DATABASE: &str = "northwind";
const DEFAULT_USERNAME: &str = "postgres";
const DEFAULT_PASSWORD: &str = "postgres";
const DEFAULT_SCHEMA: &str = "public";

/// Connection settings of the Postgres database tables are copied from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PgConnectionConfig {
    /// Hostname or IP address of the Postgres server.
    pub host: String,
    pub port: u16,
    /// Name of the database to connect to.
    pub name: String,
    pub username: String,
    /// Password for [`PgConnectionConfig::username`]. Redacted in debug output.
    pub password: Option<SerializableSecretString>,
    /// Schema the synchronized tables live in.
    pub schema: String,
    pub tls: TlsConfig,
}

impl Default for PgConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            name: DEFAULT_DATABASE.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: Some(DEFAULT_PASSWORD.into()),
            schema: DEFAULT_SCHEMA.to_string(),
            tls: TlsConfig::default(),
        }
    }
}

impl PgConnectionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.tls.validate()
    }

    /// Builds [`tokio_postgres`] connect options targeting [`PgConnectionConfig::name`].
    pub fn to_connect_options(&self) -> TokioPgConnectOptions {
        // Only the ssl mode is forwarded, the certificates are handed to rustls by the source
        // itself because tokio-postgres has no native rustls support.
        let ssl_mode = if self.tls.enabled {
            TokioPgSslMode::Require
        } else {
            TokioPgSslMode::Prefer
        };

        let mut options = TokioPgConnectOptions::new();
        options
            .host(&self.host)
            .port(self.port)
            .user(&self.username)
            .dbname(&self.name)
            .ssl_mode(ssl_mode);

        if let Some(password) = &self.password {
            options.password(password.expose_secret());
        }

        options
    }
}

/// TLS settings for the source connection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct TlsConfig {
    /// PEM-encoded trusted root certificates.
    pub trusted_root_certs: String,
    pub enabled: bool,
}

impl TlsConfig {
    /// Returns [`ValidationError::MissingTrustedRootCerts`] if TLS is enabled without certificates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.trim().is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_northwind() {
        let config = PgConnectionConfig::default();
        let options = config.to_connect_options();

        assert_eq!(options.get_dbname(), Some("northwind"));
        assert_eq!(options.get_user(), Some("postgres"));
        assert_eq!(options.get_ports(), &[5432]);
        assert_eq!(options.get_password(), Some("postgres".as_bytes()));
        assert_eq!(config.schema, "public");
    }

    #[test]
    fn tls_requires_root_certificates() {
        let mut config = PgConnectionConfig::default();
        config.tls.enabled = true;

        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingTrustedRootCerts)
        );

        config.tls.trusted_root_certs = "-----BEGIN CERTIFICATE-----".to_string();
        assert_eq!(config.validate(), Ok(()));
    }
}
