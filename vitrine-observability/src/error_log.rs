use tracing::error;
use vitrine_core::ErrorLog;

/// Sends exposition error lines to the process log as `error` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorLog;

impl ErrorLog for TracingErrorLog {
    fn log_line(&self, line: &str) {
        error!(component = "exposition", "{line}");
    }
}
