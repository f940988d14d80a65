mod common;

use bronze::destination::memory::MemoryDestination;
use bronze::error::ErrorKind;
use bronze::schema::{DEFAULT_TABLES, EXTRACTED_AT_FIELD, LOADED_AT_FIELD, SchemaRegistry};
use bronze::sync::SyncOptions;
use bronze::test_utils::data;
use bronze::test_utils::faulty::{DestinationOperation, FaultyDestination, FaultySource};
use bronze::types::{SyncStatus, Value};
use bronze_config::shared::SchemaDriftPolicy;
use bronze_telemetry::tracing::init_test_tracing;

use common::{PREFIX, northwind_source, orchestrator, orchestrator_with};

#[tokio::test(flavor = "multi_thread")]
async fn customers_and_orders_are_copied_end_to_end() {
    init_test_tracing();
    let source = northwind_source(5, 3).await;
    let destination = MemoryDestination::new();
    let orchestrator = orchestrator(source, destination.clone());

    let summary = orchestrator
        .sync_all_tables(Some(vec!["customers".to_string(), "orders".to_string()]))
        .await;

    assert_eq!(summary.total_tables, 2);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.total_records, 8);
    assert!(summary.is_success());

    let customers = destination.table_rows("bronze_customers").await.unwrap();
    assert_eq!(customers.len(), 5);
    let orders = destination.table_rows("bronze_orders").await.unwrap();
    assert_eq!(orders.len(), 3);

    let registry = SchemaRegistry::northwind();
    let descriptor = registry.lookup("orders").unwrap();
    assert!(orders[0].field_names().eq(descriptor.field_names()));
    assert_eq!(orders[0].get("freight"), Some(&Value::Float(32.38)));
    assert_eq!(orders[0].get("order_date"), Some(&Value::from("1996-07-04")));
    assert_eq!(orders[0].get("shipped_date"), Some(&Value::Null));

    let stamp = orders[0].get(EXTRACTED_AT_FIELD).cloned().unwrap();
    assert!(orders.iter().all(|row| row.get(EXTRACTED_AT_FIELD) == Some(&stamp)));
    assert!(orders.iter().all(|row| row.get(LOADED_AT_FIELD) == Some(&stamp)));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_table_fails_without_stopping_the_run() {
    init_test_tracing();
    let source = northwind_source(1, 1).await;
    let destination = MemoryDestination::new();
    let orchestrator = orchestrator(source, destination.clone());

    let summary = orchestrator.sync_tables(&["invoices", "shippers"]).await;

    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);

    let invoices = &summary.results[0];
    assert_eq!(invoices.table, "invoices");
    assert_eq!(invoices.status, SyncStatus::Failed);
    assert_eq!(invoices.records_synced, 0);
    assert_eq!(invoices.error_kind, Some(ErrorKind::SchemaNotFound));
    assert!(invoices.error.as_deref().unwrap().contains("invoices"));

    assert_eq!(summary.results[1].records_synced, 3);
    assert_eq!(destination.table_names().await, vec!["bronze_shippers"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn one_failing_table_does_not_affect_the_others() {
    init_test_tracing();
    let source = FaultySource::new(northwind_source(5, 3).await)
        .fail_table("orders", ErrorKind::SourceQueryFailed);
    let destination = MemoryDestination::new();
    let orchestrator = orchestrator(source, destination.clone());

    let summary = orchestrator
        .sync_tables(&["customers", "orders", "shippers"])
        .await;

    assert_eq!(summary.total_tables, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total_records, 5 + 3);
    assert_eq!(summary.failed_tables().collect::<Vec<_>>(), vec!["orders"]);
    assert_eq!(
        summary.results[1].error_kind,
        Some(ErrorKind::SourceQueryFailed)
    );

    assert_eq!(
        destination.table_rows("bronze_shippers").await.unwrap().len(),
        3
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn reruns_replace_previous_rows() {
    init_test_tracing();
    let source = bronze::source::memory::MemorySource::new();
    source.insert_table("shippers", data::shippers(5)).await;
    let destination = MemoryDestination::new();
    let orchestrator = orchestrator(source.clone(), destination.clone());

    let first = orchestrator.sync_table("shippers").await;
    assert_eq!(first.records_synced, 5);

    source.insert_table("shippers", data::shippers(2)).await;
    let second = orchestrator.sync_table("shippers").await;
    assert_eq!(second.records_synced, 2);

    let rows = destination.table_rows("bronze_shippers").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(destination.table_names().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_source_table_keeps_destination_rows() {
    init_test_tracing();
    let source = bronze::source::memory::MemorySource::new();
    source.insert_table("shippers", data::shippers(5)).await;
    let destination = MemoryDestination::new();
    let orchestrator = orchestrator(source.clone(), destination.clone());

    orchestrator.sync_table("shippers").await;
    source.insert_table("shippers", data::shippers(0)).await;
    let result = orchestrator.sync_table("shippers").await;

    assert_eq!(result.status, SyncStatus::Success);
    assert_eq!(result.records_synced, 0);
    assert_eq!(
        destination.table_rows("bronze_shippers").await.unwrap().len(),
        5
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn default_run_attempts_every_northwind_table_in_order() {
    init_test_tracing();
    let source = northwind_source(2, 2).await;
    let destination = MemoryDestination::new();
    let orchestrator = orchestrator(source, destination);

    let summary = orchestrator.sync_all_tables(None).await;

    assert_eq!(summary.total_tables, DEFAULT_TABLES.len());
    assert!(
        summary
            .results
            .iter()
            .map(|result| result.table.as_str())
            .eq(DEFAULT_TABLES)
    );
    // Only customers, orders and shippers exist in the source.
    assert_eq!(summary.successful, 3);
    assert_eq!(summary.failed, 5);
    assert_eq!(summary.total_records, 2 + 2 + 3);
    assert!(!summary.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_runs_report_in_invocation_order() {
    init_test_tracing();
    let source = northwind_source(4, 2).await;
    let destination = MemoryDestination::new();
    let options = SyncOptions {
        max_concurrent_tables: 3,
        ..SyncOptions::default()
    };
    let orchestrator = orchestrator_with(source, destination, options);

    let tables = ["shippers", "orders", "invoices", "customers"];
    let summary = orchestrator.sync_tables(&tables).await;

    assert!(
        summary
            .results
            .iter()
            .map(|result| result.table.as_str())
            .eq(tables)
    );
    assert_eq!(summary.successful, 3);
    assert_eq!(summary.total_records, 3 + 2 + 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn destination_failures_are_classified_by_phase() {
    init_test_tracing();
    let source = northwind_source(2, 2).await;
    let destination = FaultyDestination::new(MemoryDestination::new())
        .fail(
            "bronze_customers",
            DestinationOperation::CreateTable,
            ErrorKind::DestinationIoError,
        )
        .fail(
            "bronze_orders",
            DestinationOperation::ReplaceTableRows,
            ErrorKind::DestinationQueryFailed,
        );
    let orchestrator = orchestrator(source, destination);

    let summary = orchestrator.sync_tables(&["customers", "orders"]).await;

    assert_eq!(summary.failed, 2);
    assert_eq!(
        summary.results[0].error_kind,
        Some(ErrorKind::SchemaManagementFailed)
    );
    assert_eq!(summary.results[1].error_kind, Some(ErrorKind::LoadFailed));
    assert!(
        summary.results[1]
            .error
            .as_deref()
            .unwrap()
            .contains("Injected destination failure")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn drifted_destination_fails_only_under_fail_policy() {
    init_test_tracing();
    let source = northwind_source(1, 1).await;
    let destination = MemoryDestination::new();
    destination
        .insert_table(
            format!("{PREFIX}shippers"),
            vec!["shipper_id".to_string(), "legacy_code".to_string()],
        )
        .await;

    let warn = orchestrator(source.clone(), destination.clone());
    assert!(warn.sync_table("shippers").await.is_success());

    let options = SyncOptions {
        schema_drift: SchemaDriftPolicy::Fail,
        ..SyncOptions::default()
    };
    let fail = orchestrator_with(source, destination, options);
    let result = fail.sync_table("shippers").await;
    assert_eq!(result.error_kind, Some(ErrorKind::SchemaManagementFailed));
}
