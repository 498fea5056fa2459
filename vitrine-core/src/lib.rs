pub mod config;
pub mod options;
pub mod policy;

pub use config::ExporterConfig;
pub use options::{ErrorHandling, ErrorLog, HandlerOptions};
pub use policy::{Action, ErrorKind};
