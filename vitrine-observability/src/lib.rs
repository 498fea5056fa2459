pub mod error_log;
pub mod logging;

#[cfg(feature = "prometheus")]
pub mod instrument;

pub use error_log::TracingErrorLog;

#[cfg(feature = "prometheus")]
pub use instrument::{HandlerMetrics, InFlight};
