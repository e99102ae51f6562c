mod topology_scanner_actor;
mod topology_scanner_error;
mod topology_scanner_handle;
mod topology_scanner_helpers;

pub use topology_scanner_actor::*;
pub use topology_scanner_error::*;
pub use topology_scanner_handle::*;
pub use topology_scanner_helpers::*;
