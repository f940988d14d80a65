//! Destination implementations for bronze table syncs.
//!
//! Each destination lives behind its own feature so that binaries only pull the client stack they
//! load into.

#[cfg(feature = "bigquery")]
pub mod bigquery;
#[cfg(feature = "bigquery")]
mod metrics;
