//! Table descriptors and the registry they are looked up in.

mod descriptor;
mod registry;
mod table_name;

pub use descriptor::*;
pub use registry::*;
pub use table_name::*;
