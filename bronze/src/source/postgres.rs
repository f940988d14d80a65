use std::io::BufReader;
use std::sync::Arc;

use bronze_config::shared::PgConnectionConfig;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rustls::ClientConfig;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Connection, NoTls, Row, Socket};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{Instrument, debug, error, info};
use uuid::Uuid;

use crate::bronze_error;
use crate::conversions::numeric::PgNumeric;
use crate::conversions::{Cell, cell_from_option};
use crate::error::{BronzeError, BronzeResult, ErrorKind};
use crate::schema::TableName;
use crate::source::Source;
use crate::types::{TableData, TableRow};

/// Drives a Postgres connection in the background until the client is dropped.
fn spawn_postgres_connection<T>(connection: Connection<Socket, T::Stream>)
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let span = tracing::Span::current();
    let task = async move {
        if let Err(e) = connection.await {
            error!("an error occurred during the Postgres connection: {}", e);
            return;
        }

        debug!("postgres connection terminated successfully")
    }
    .instrument(span);

    tokio::spawn(task);
}

/// A [`Source`] reading tables from Postgres with `SELECT *`.
///
/// Every read opens its own connection which is closed when the read returns.
#[derive(Debug, Clone)]
pub struct PgSource {
    config: PgConnectionConfig,
}

impl PgSource {
    pub fn new(config: PgConnectionConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> BronzeResult<Client> {
        let result = if self.config.tls.enabled {
            self.connect_tls().await
        } else {
            self.connect_no_tls().await
        };

        result.map_err(|err| {
            err.into_phase(
                ErrorKind::SourceConnectionFailed,
                "Failed to connect to the source database",
            )
        })
    }

    async fn connect_no_tls(&self) -> BronzeResult<Client> {
        let (client, connection) = self.config.to_connect_options().connect(NoTls).await?;
        spawn_postgres_connection::<NoTls>(connection);

        debug!(host = %self.config.host, "connected to postgres without tls");

        Ok(client)
    }

    async fn connect_tls(&self) -> BronzeResult<Client> {
        let mut root_store = rustls::RootCertStore::empty();
        let mut root_certs_reader = BufReader::new(self.config.tls.trusted_root_certs.as_bytes());
        for cert in rustls_pemfile::certs(&mut root_certs_reader) {
            let cert = cert?;
            root_store.add(cert)?;
        }

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let tls_config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let (client, connection) = self
            .config
            .to_connect_options()
            .connect(MakeRustlsConnect::new(tls_config))
            .await?;
        spawn_postgres_connection::<MakeRustlsConnect>(connection);

        debug!(host = %self.config.host, "connected to postgres with tls");

        Ok(client)
    }
}

impl Source for PgSource {
    async fn read_table(&self, table_name: &str) -> BronzeResult<TableData> {
        let client = self.connect().await?;

        let table_name = TableName::new(self.config.schema.clone(), table_name);
        let query = format!("select * from {}", table_name.as_quoted_identifier());

        let statement = client.prepare(&query).await.map_err(query_error)?;
        let column_types = statement
            .columns()
            .iter()
            .map(|column| {
                ensure_supported_type(column.name(), column.type_())?;
                Ok(column.type_().clone())
            })
            .collect::<BronzeResult<Vec<_>>>()?;
        let column_names = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let rows = client.query(&statement, &[]).await.map_err(query_error)?;

        let mut table_rows = Vec::with_capacity(rows.len());
        for row in &rows {
            table_rows.push(decode_row(row, &column_types)?);
        }

        info!(%table_name, rows = table_rows.len(), "read table from postgres");

        Ok(TableData::new(column_names, table_rows))
    }
}

fn query_error(err: tokio_postgres::Error) -> BronzeError {
    BronzeError::from(err).into_phase(ErrorKind::SourceQueryFailed, "Source query failed")
}

fn ensure_supported_type(column_name: &str, typ: &Type) -> BronzeResult<()> {
    let supported = matches!(
        *typ,
        Type::BOOL
            | Type::BPCHAR
            | Type::VARCHAR
            | Type::TEXT
            | Type::NAME
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::OID
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::NUMERIC
            | Type::DATE
            | Type::TIME
            | Type::TIMESTAMP
            | Type::TIMESTAMPTZ
            | Type::UUID
            | Type::JSON
            | Type::JSONB
            | Type::BYTEA
    );

    if !supported {
        return Err(bronze_error!(
            ErrorKind::SourceQueryFailed,
            "Unsupported source column type",
            format!("column `{column_name}` has type `{typ}`")
        ));
    }

    Ok(())
}

fn decode_row(row: &Row, column_types: &[Type]) -> BronzeResult<TableRow> {
    let mut values = Vec::with_capacity(column_types.len());
    for (index, typ) in column_types.iter().enumerate() {
        let cell = decode_cell(row, index, typ).map_err(|err| {
            bronze_error!(
                ErrorKind::SourceQueryFailed,
                "Failed to decode source value",
                format!("column {index}: {err}")
            )
        })?;
        values.push(cell);
    }

    Ok(TableRow::new(values))
}

fn decode_cell(row: &Row, index: usize, typ: &Type) -> Result<Cell, tokio_postgres::Error> {
    let cell = match *typ {
        Type::BOOL => cell_from_option(row.try_get::<_, Option<bool>>(index)?, Cell::Bool),
        Type::BPCHAR | Type::VARCHAR | Type::TEXT | Type::NAME => {
            cell_from_option(row.try_get::<_, Option<String>>(index)?, Cell::String)
        }
        Type::INT2 => cell_from_option(row.try_get::<_, Option<i16>>(index)?, Cell::I16),
        Type::INT4 => cell_from_option(row.try_get::<_, Option<i32>>(index)?, Cell::I32),
        Type::INT8 => cell_from_option(row.try_get::<_, Option<i64>>(index)?, Cell::I64),
        Type::OID => cell_from_option(row.try_get::<_, Option<u32>>(index)?, Cell::U32),
        Type::FLOAT4 => cell_from_option(row.try_get::<_, Option<f32>>(index)?, Cell::F32),
        Type::FLOAT8 => cell_from_option(row.try_get::<_, Option<f64>>(index)?, Cell::F64),
        Type::NUMERIC => {
            cell_from_option(row.try_get::<_, Option<PgNumeric>>(index)?, Cell::Numeric)
        }
        Type::DATE => cell_from_option(row.try_get::<_, Option<NaiveDate>>(index)?, Cell::Date),
        Type::TIME => cell_from_option(row.try_get::<_, Option<NaiveTime>>(index)?, Cell::Time),
        Type::TIMESTAMP => cell_from_option(
            row.try_get::<_, Option<NaiveDateTime>>(index)?,
            Cell::TimeStamp,
        ),
        Type::TIMESTAMPTZ => cell_from_option(
            row.try_get::<_, Option<DateTime<Utc>>>(index)?,
            Cell::TimeStampTz,
        ),
        Type::UUID => cell_from_option(row.try_get::<_, Option<Uuid>>(index)?, Cell::Uuid),
        Type::JSON | Type::JSONB => cell_from_option(
            row.try_get::<_, Option<serde_json::Value>>(index)?,
            Cell::Json,
        ),
        Type::BYTEA => cell_from_option(row.try_get::<_, Option<Vec<u8>>>(index)?, Cell::Bytes),
        // Rejected by `ensure_supported_type` before the query runs.
        _ => Cell::Null,
    };

    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_column_types_are_supported() {
        for typ in [Type::INT2, Type::BPCHAR, Type::NUMERIC, Type::DATE, Type::BYTEA] {
            assert!(ensure_supported_type("column", &typ).is_ok());
        }
    }

    #[test]
    fn unsupported_types_fail_as_query_errors() {
        let err = ensure_supported_type("tags", &Type::TEXT_ARRAY).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
        assert!(err.detail().unwrap().contains("tags"));
    }
}
