//! Stores synchronized tables are loaded into.

mod base;
pub mod memory;

pub use base::*;
