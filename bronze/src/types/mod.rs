//! Values flowing between the source and the destination and the outcome of a sync.

mod row;
mod summary;
mod table_row;
mod value;

pub use row::*;
pub use summary::*;
pub use table_row::*;
pub use value::*;
