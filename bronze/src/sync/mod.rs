//! The table sync pipeline: extract, ensure the destination table, load and summarize.

mod extractor;
mod loader;
mod orchestrator;
mod schema_manager;

pub use extractor::*;
pub use loader::*;
pub use orchestrator::*;
pub use schema_manager::*;
