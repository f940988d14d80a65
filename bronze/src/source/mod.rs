//! Readers of full source table snapshots.

mod base;
pub mod memory;
pub mod postgres;

pub use base::*;
