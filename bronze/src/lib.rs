//! Full snapshot synchronization of Postgres tables into an analytical store.
//!
//! A run looks up each table in the [`schema::SchemaRegistry`], makes sure its destination table
//! exists, extracts and normalizes every source row and overwrites the destination copy. Failures
//! are isolated per table and reported in a [`types::RunSummary`].

pub mod conversions;
pub mod destination;
pub mod error;
mod macros;
pub mod metrics;
pub mod schema;
pub mod source;
pub mod sync;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
