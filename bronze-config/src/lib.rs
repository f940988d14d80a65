//! Configuration management for the bronze sync engine.
//!
//! Provides environment detection, layered configuration loading from YAML files and environment
//! variables, secret handling and the configuration types shared by the sync crates.

mod environment;
mod load;
mod secret;
pub mod shared;

pub use environment::*;
pub use load::*;
pub use secret::*;
