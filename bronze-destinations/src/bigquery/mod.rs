mod client;
mod core;
mod credentials;
mod encoding;
mod encryption;

pub use client::{BigQueryClient, BigQueryDatasetId, BigQueryProjectId, BigQueryTableId};
pub use core::BigQueryDestination;
pub use credentials::CredentialStrategy;
pub use encryption::install_crypto_provider_for_bigquery;
