use std::sync::Arc;
use std::time::Instant;

use bronze::destination::Destination;
use bronze::error::BronzeResult;
use bronze::schema::TableDescriptor;
use bronze::types::Row;
use metrics::histogram;
use tracing::{info, warn};

use crate::bigquery::client::{BigQueryClient, BigQueryDatasetId, BigQueryProjectId};
use crate::bigquery::credentials::CredentialStrategy;
use crate::bigquery::encoding::{
    create_staging_table_statement, create_table_statement, drop_table_statement,
    encode_payloads, insert_from_payload_statement, replace_rows_script, swap_from_staging_script,
};
use crate::bigquery::encryption::install_crypto_provider_for_bigquery;
use crate::metrics::{BQ_LOAD_MILLISECONDS, BQ_LOAD_PAYLOAD_BYTES, register_metrics};

/// Suffix appended to a table id to name its staging table.
const STAGING_TABLE_SUFFIX: &str = "__staging";

/// A [`Destination`] loading tables into a BigQuery dataset.
///
/// Rows are sent as JSON payloads bound to a query parameter. A table whose rows fit in one payload
/// is replaced by a single transactional script, larger tables are first staged chunk by chunk and
/// then swapped in within a transaction, so readers never observe a partial load.
#[derive(Debug, Clone)]
pub struct BigQueryDestination {
    client: Arc<BigQueryClient>,
    dataset_id: BigQueryDatasetId,
    max_payload_bytes: usize,
}

impl BigQueryDestination {
    /// Creates a [`BigQueryDestination`], authenticating with the key file at `key_path` when it
    /// exists and with application default credentials otherwise.
    pub async fn new(
        project_id: BigQueryProjectId,
        dataset_id: BigQueryDatasetId,
        key_path: Option<&str>,
        max_payload_bytes: usize,
    ) -> BronzeResult<Self> {
        install_crypto_provider_for_bigquery();
        register_metrics();

        let strategy = CredentialStrategy::resolve(key_path);
        let client = BigQueryClient::new(project_id, &strategy).await?;

        Ok(Self {
            client: Arc::new(client),
            dataset_id,
            max_payload_bytes,
        })
    }

    async fn replace_through_staging(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
        payloads: Vec<String>,
    ) -> BronzeResult<()> {
        let full_table_name = self.client.full_table_name(&self.dataset_id, table_name);
        let staging_table_name = self.client.full_table_name(
            &self.dataset_id,
            &format!("{table_name}{STAGING_TABLE_SUFFIX}"),
        );

        info!(
            table_name,
            chunks = payloads.len(),
            "rows exceed one payload, loading through a staging table"
        );

        self.client
            .execute(create_staging_table_statement(
                &staging_table_name,
                &full_table_name,
            ))
            .await?;

        let result = self
            .load_staging_and_swap(&full_table_name, &staging_table_name, descriptor, payloads)
            .await;

        if let Err(err) = self
            .client
            .execute(drop_table_statement(&staging_table_name))
            .await
        {
            warn!(
                table_name,
                error = %err,
                "failed to drop staging table, it will expire on its own"
            );
        }

        result
    }

    async fn load_staging_and_swap(
        &self,
        full_table_name: &str,
        staging_table_name: &str,
        descriptor: &TableDescriptor,
        payloads: Vec<String>,
    ) -> BronzeResult<()> {
        let insert = insert_from_payload_statement(staging_table_name, descriptor);
        for payload in payloads {
            self.client
                .execute_with_rows(insert.clone(), payload)
                .await?;
        }

        self.client
            .execute(swap_from_staging_script(
                full_table_name,
                staging_table_name,
                descriptor,
            ))
            .await
    }
}

impl Destination for BigQueryDestination {
    async fn table_columns(&self, table_name: &str) -> BronzeResult<Option<Vec<String>>> {
        self.client
            .table_columns(&self.dataset_id, table_name)
            .await
    }

    async fn create_table(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
    ) -> BronzeResult<()> {
        let full_table_name = self.client.full_table_name(&self.dataset_id, table_name);

        info!("creating table {full_table_name} in BigQuery if missing");

        self.client
            .execute(create_table_statement(&full_table_name, descriptor))
            .await
    }

    async fn replace_table_rows(
        &self,
        table_name: &str,
        descriptor: &TableDescriptor,
        rows: Vec<Row>,
    ) -> BronzeResult<()> {
        let start = Instant::now();

        let mut payloads = encode_payloads(&rows, self.max_payload_bytes)?;
        drop(rows);

        let payload_bytes = payloads.iter().map(String::len).sum::<usize>();
        histogram!(BQ_LOAD_PAYLOAD_BYTES, "table" => table_name.to_string())
            .record(payload_bytes as f64);

        let result = match payloads.len() {
            0 | 1 => {
                let full_table_name = self.client.full_table_name(&self.dataset_id, table_name);
                let payload = payloads.pop().unwrap_or_else(|| "[]".to_string());

                self.client
                    .execute_with_rows(replace_rows_script(&full_table_name, descriptor), payload)
                    .await
            }
            _ => {
                self.replace_through_staging(table_name, descriptor, payloads)
                    .await
            }
        };

        if result.is_ok() {
            let elapsed = start.elapsed();
            histogram!(BQ_LOAD_MILLISECONDS, "table" => table_name.to_string())
                .record(elapsed.as_millis() as f64);
            info!(
                table_name,
                payload_bytes,
                duration_ms = elapsed.as_millis() as u64,
                "replaced BigQuery table rows"
            );
        }

        result
    }
}
