#![allow(dead_code)]

use std::sync::Arc;

use bronze::destination::Destination;
use bronze::schema::SchemaRegistry;
use bronze::source::Source;
use bronze::source::memory::MemorySource;
use bronze::sync::{SyncOptions, SyncOrchestrator};
use bronze::test_utils::data;

pub const PREFIX: &str = "bronze_";

pub fn orchestrator<S, D>(source: S, destination: D) -> SyncOrchestrator<S, D>
where
    S: Source,
    D: Destination + Clone,
{
    orchestrator_with(source, destination, SyncOptions::default())
}

pub fn orchestrator_with<S, D>(
    source: S,
    destination: D,
    options: SyncOptions,
) -> SyncOrchestrator<S, D>
where
    S: Source,
    D: Destination + Clone,
{
    SyncOrchestrator::new(
        Arc::new(SchemaRegistry::northwind()),
        source,
        destination,
        options,
    )
}

/// Returns a source holding `customers` and `orders` rows plus three shippers.
pub async fn northwind_source(customers: usize, orders: usize) -> MemorySource {
    let source = MemorySource::new();
    source
        .insert_table("customers", data::customers(customers))
        .await;
    source.insert_table("orders", data::orders(orders)).await;
    source.insert_table("shippers", data::shippers(3)).await;
    source
}
