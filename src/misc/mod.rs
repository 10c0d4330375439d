pub mod floating_point;
pub(crate) mod logging;

pub use floating_point::*;
pub(crate) use logging::*;
