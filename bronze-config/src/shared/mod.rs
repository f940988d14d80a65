mod base;
mod destination;
mod run;
mod source;
mod sync;
mod telemetry;

pub use base::*;
pub use destination::*;
pub use run::*;
pub use source::*;
pub use sync::*;
pub use telemetry::*;
