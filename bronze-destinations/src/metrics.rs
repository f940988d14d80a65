use std::sync::Once;

use metrics::{Unit, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

pub const BQ_LOAD_PAYLOAD_BYTES: &str = "bq_load_payload_bytes";
pub const BQ_LOAD_MILLISECONDS: &str = "bq_load_milliseconds";

/// Register metrics emitted by the destinations. It is safe to call
/// this method multiple times, the metrics are only registered once.
pub(crate) fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_histogram!(
            BQ_LOAD_PAYLOAD_BYTES,
            Unit::Bytes,
            "Size in bytes of the row payloads sent to BigQuery for one table"
        );

        describe_histogram!(
            BQ_LOAD_MILLISECONDS,
            Unit::Milliseconds,
            "Time taken in milliseconds to replace the rows of one BigQuery table"
        );
    });
}
