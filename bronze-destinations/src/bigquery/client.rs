use std::fmt;
use std::time::Duration;

use bronze::bail;
use bronze::bronze_error;
use bronze::error::{BronzeError, BronzeResult, ErrorKind};
use gcp_bigquery_client::Client;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::get_query_results_parameters::GetQueryResultsParameters;
use gcp_bigquery_client::model::query_parameter::QueryParameter;
use gcp_bigquery_client::model::query_parameter_type::QueryParameterType;
use gcp_bigquery_client::model::query_parameter_value::QueryParameterValue;
use gcp_bigquery_client::model::query_request::QueryRequest;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::bigquery::credentials::CredentialStrategy;
use crate::bigquery::encoding::ROWS_PARAMETER;

/// Time between two polls of a BigQuery job that did not complete within the query call.
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Time BigQuery may hold a poll request open waiting for the job to complete.
const JOB_POLL_TIMEOUT_MS: u32 = 10_000;

pub type BigQueryProjectId = String;
pub type BigQueryDatasetId = String;
pub type BigQueryTableId = String;

/// A client running statements against one BigQuery project.
pub struct BigQueryClient {
    project_id: BigQueryProjectId,
    client: Client,
}

impl BigQueryClient {
    /// Creates a new [`BigQueryClient`] authenticated with `strategy`.
    pub async fn new(
        project_id: BigQueryProjectId,
        strategy: &CredentialStrategy,
    ) -> BronzeResult<BigQueryClient> {
        let client = strategy.build_client().await?;

        Ok(BigQueryClient { project_id, client })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns the full BigQuery table name in the form `` `project_id.dataset_id.table_id` ``.
    pub fn full_table_name(&self, dataset_id: &str, table_id: &str) -> String {
        format!("`{}.{}.{}`", self.project_id, dataset_id, table_id)
    }

    /// Returns the column names of a table, `None` when the table does not exist.
    pub async fn table_columns(
        &self,
        dataset_id: &str,
        table_id: &str,
    ) -> BronzeResult<Option<Vec<String>>> {
        let table = self
            .client
            .table()
            .get(&self.project_id, dataset_id, table_id, None)
            .await;

        let table = match table {
            Ok(table) => table,
            Err(BQError::ResponseError { error }) if error.error.code == 404 => return Ok(None),
            Err(err) => return Err(bq_error_to_bronze_error(err)),
        };

        let columns = table
            .schema
            .fields
            .unwrap_or_default()
            .into_iter()
            .map(|field| field.name)
            .collect();

        Ok(Some(columns))
    }

    /// Runs a statement or script and waits for its job to complete.
    pub async fn execute(&self, sql: String) -> BronzeResult<()> {
        self.run(QueryRequest::new(sql)).await
    }

    /// Runs a statement or script with `payload` bound to the `@rows` string parameter.
    pub async fn execute_with_rows(&self, sql: String, payload: String) -> BronzeResult<()> {
        let mut request = QueryRequest::new(sql);
        request.parameter_mode = Some("NAMED".to_string());
        request.query_parameters = Some(vec![string_parameter(ROWS_PARAMETER, payload)]);

        self.run(request).await
    }

    async fn run(&self, request: QueryRequest) -> BronzeResult<()> {
        debug!(query = %request.query, "running BigQuery statement");

        let response = self
            .client
            .job()
            .query(&self.project_id, request)
            .await
            .map_err(bq_error_to_bronze_error)?;
        ensure_no_job_errors(response.errors.as_ref())?;

        if response.job_complete.unwrap_or(false) {
            return Ok(());
        }

        let Some(job_reference) = response.job_reference else {
            bail!(
                ErrorKind::DestinationQueryFailed,
                "BigQuery job did not complete and has no reference"
            );
        };
        let Some(job_id) = job_reference.job_id else {
            bail!(
                ErrorKind::DestinationQueryFailed,
                "BigQuery job did not complete and has no id"
            );
        };

        info!(job_id = %job_id, "waiting for BigQuery job to complete");
        loop {
            let parameters = GetQueryResultsParameters {
                location: job_reference.location.clone(),
                timeout_ms: Some(JOB_POLL_TIMEOUT_MS as _),
                ..Default::default()
            };
            let results = self
                .client
                .job()
                .get_query_results(&self.project_id, &job_id, parameters)
                .await
                .map_err(bq_error_to_bronze_error)?;
            ensure_no_job_errors(results.errors.as_ref())?;

            if results.job_complete.unwrap_or(false) {
                return Ok(());
            }

            sleep(JOB_POLL_INTERVAL).await;
        }
    }
}

impl fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

fn string_parameter(name: &str, value: String) -> QueryParameter {
    QueryParameter {
        name: Some(name.to_string()),
        parameter_type: Some(QueryParameterType {
            r#type: "STRING".to_string(),
            ..Default::default()
        }),
        parameter_value: Some(QueryParameterValue {
            value: Some(value),
            ..Default::default()
        }),
    }
}

fn ensure_no_job_errors<E: fmt::Debug>(errors: Option<&Vec<E>>) -> BronzeResult<()> {
    match errors {
        Some(errors) if !errors.is_empty() => Err(bronze_error!(
            ErrorKind::DestinationQueryFailed,
            "BigQuery job failed",
            format!("{errors:?}")
        )),
        _ => Ok(()),
    }
}

/// Converts BigQuery errors into [`BronzeError`]s with an appropriate [`ErrorKind`].
pub(crate) fn bq_error_to_bronze_error(err: BQError) -> BronzeError {
    let (kind, description) = match &err {
        // Authentication related errors
        BQError::InvalidServiceAccountKey(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery service account key",
        ),
        BQError::InvalidServiceAccountAuthenticator(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery service account authenticator",
        ),
        BQError::InvalidInstalledFlowAuthenticator(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery installed flow authenticator",
        ),
        BQError::InvalidApplicationDefaultCredentialsAuthenticator(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery application default credentials",
        ),
        BQError::InvalidAuthorizedUserAuthenticator(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery authorized user authenticator",
        ),
        BQError::AuthError(_) => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication error",
        ),
        BQError::YupAuthError(_) => (
            ErrorKind::AuthenticationError,
            "BigQuery OAuth authentication error",
        ),
        BQError::NoToken => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication token missing",
        ),

        // Network and transport errors
        BQError::RequestError(_) => (ErrorKind::DestinationIoError, "BigQuery request failed"),
        BQError::TonicTransportError(_) => {
            (ErrorKind::DestinationIoError, "BigQuery transport error")
        }

        // Query and data errors
        BQError::ResponseError { .. } => (
            ErrorKind::DestinationQueryFailed,
            "BigQuery response error",
        ),
        BQError::NoDataAvailable => (
            ErrorKind::DestinationQueryFailed,
            "BigQuery result set positioning error",
        ),
        BQError::InvalidColumnIndex { .. } => {
            (ErrorKind::InvalidData, "BigQuery invalid column index")
        }
        BQError::InvalidColumnName { .. } => {
            (ErrorKind::InvalidData, "BigQuery invalid column name")
        }
        BQError::InvalidColumnType { .. } => {
            (ErrorKind::ConversionError, "BigQuery column type mismatch")
        }

        // Serialization errors
        BQError::SerializationError(_) => (
            ErrorKind::SerializationError,
            "BigQuery JSON serialization error",
        ),

        // gRPC errors
        BQError::TonicInvalidMetadataValueError(_) => {
            (ErrorKind::ConfigError, "BigQuery invalid metadata value")
        }
        BQError::TonicStatusError(_) => (
            ErrorKind::DestinationQueryFailed,
            "BigQuery gRPC status error",
        ),
    };

    bronze_error!(kind, description, err)
}
