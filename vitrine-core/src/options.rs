use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How the exposition handler reacts to gathering and encoding errors.
///
/// The same policy governs the gather error and every per-family encode
/// error; it is evaluated independently at each occurrence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandling {
    /// Answer with `500 Internal Server Error` and the error text as body.
    #[default]
    HttpError,
    /// Log the error and serve whatever could still be encoded.
    Continue,
    /// Panic. Meant for transports that recover panics into a generic 500.
    Panic,
}

impl ErrorHandling {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorHandling::HttpError => "http_error",
            ErrorHandling::Continue => "continue",
            ErrorHandling::Panic => "panic",
        }
    }
}

impl fmt::Display for ErrorHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line-oriented sink for errors hit while serving metrics.
pub trait ErrorLog: Send + Sync {
    fn log_line(&self, line: &str);
}

/// Per-handler configuration. Immutable once the handler is built.
#[derive(Clone, Default)]
pub struct HandlerOptions {
    /// Every gather/encode error is reported here, whatever the policy decides.
    pub error_log: Option<Arc<dyn ErrorLog>>,
    pub error_handling: ErrorHandling,
    /// Never gzip the response, even if the client asks for it.
    pub disable_compression: bool,
}

impl HandlerOptions {
    pub fn with_error_log(mut self, log: Arc<dyn ErrorLog>) -> Self {
        self.error_log = Some(log);
        self
    }

    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }

    pub fn with_compression_disabled(mut self, disabled: bool) -> Self {
        self.disable_compression = disabled;
        self
    }

    /// Write `prefix err` to the error log, if one is configured.
    pub fn log_error(&self, prefix: &str, err: &dyn fmt::Display) {
        if let Some(ref log) = self.error_log {
            log.log_line(&format!("{prefix} {err}"));
        }
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("error_log", &self.error_log.is_some())
            .field("error_handling", &self.error_handling)
            .field("disable_compression", &self.disable_compression)
            .finish()
    }
}
