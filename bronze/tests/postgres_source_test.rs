mod common;

use std::env;

use bronze::destination::memory::MemoryDestination;
use bronze::source::postgres::PgSource;
use bronze::types::Value;
use bronze_config::shared::{PgConnectionConfig, TlsConfig};
use bronze_telemetry::tracing::init_test_tracing;
use chrono::Utc;
use tokio_postgres::NoTls;

use common::orchestrator;

fn test_database_config(schema: &str) -> PgConnectionConfig {
    let var = |name: &str, default: &str| env::var(name).unwrap_or_else(|_| default.to_string());

    PgConnectionConfig {
        host: var("TESTS_DATABASE_HOST", "localhost"),
        port: var("TESTS_DATABASE_PORT", "5432").parse().unwrap(),
        name: var("TESTS_DATABASE_NAME", "postgres"),
        username: var("TESTS_DATABASE_USERNAME", "postgres"),
        password: env::var("TESTS_DATABASE_PASSWORD").ok().map(Into::into),
        schema: schema.to_string(),
        tls: TlsConfig {
            trusted_root_certs: String::new(),
            enabled: false,
        },
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs a running Postgres, see TESTS_DATABASE_* variables"]
async fn shippers_are_read_from_postgres() {
    init_test_tracing();
    let schema = format!("bronze_test_{}", Utc::now().timestamp_micros());
    let config = test_database_config(&schema);

    let (client, connection) = config.to_connect_options().connect(NoTls).await.unwrap();
    tokio::spawn(connection);
    client
        .batch_execute(&format!(
            "create schema {schema};
             create table {schema}.shippers (
                 shipper_id smallint primary key,
                 company_name varchar(40) not null,
                 phone varchar(24)
             );
             insert into {schema}.shippers values
                 (1, 'Speedy Express', '(503) 555-9831'),
                 (2, 'United Package', null);"
        ))
        .await
        .unwrap();

    let destination = MemoryDestination::new();
    let orchestrator = orchestrator(PgSource::new(config), destination.clone());
    let result = orchestrator.sync_table("shippers").await;

    client
        .batch_execute(&format!("drop schema {schema} cascade"))
        .await
        .unwrap();

    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(result.records_synced, 2);

    let mut rows = destination.table_rows("bronze_shippers").await.unwrap();
    rows.sort_by_key(|row| row.get("shipper_id").and_then(Value::as_i64));
    assert_eq!(rows[0].get("company_name"), Some(&Value::from("Speedy Express")));
    assert_eq!(rows[1].get("phone"), Some(&Value::Null));
}
