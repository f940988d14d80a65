use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

pub const BRONZE_TABLES_SYNCED_TOTAL: &str = "bronze_tables_synced_total";
pub const BRONZE_RECORDS_SYNCED_TOTAL: &str = "bronze_records_synced_total";
pub const BRONZE_TABLE_SYNC_DURATION_SECONDS: &str = "bronze_table_sync_duration_seconds";
pub const TABLE: &str = "table";
pub const STATUS: &str = "status";
pub const ERROR_KIND: &str = "error_kind";

/// Registers the descriptions of the metrics emitted by table syncs.
///
/// Safe to call repeatedly, descriptions are only registered once.
pub(crate) fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            BRONZE_TABLES_SYNCED_TOTAL,
            Unit::Count,
            "Number of table sync attempts by status"
        );

        describe_counter!(
            BRONZE_RECORDS_SYNCED_TOTAL,
            Unit::Count,
            "Number of rows loaded into the destination"
        );

        describe_histogram!(
            BRONZE_TABLE_SYNC_DURATION_SECONDS,
            Unit::Seconds,
            "Time taken in seconds to sync one table"
        );
    });
}
