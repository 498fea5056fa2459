use crate::options::ErrorHandling;

/// Where in the exposition cycle an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Gathering failed; `gathered` families were still returned.
    Gather { gathered: usize },
    /// A single metric family failed to encode.
    Encode,
}

impl ErrorKind {
    /// Error-log prefix for this kind.
    pub fn log_prefix(&self) -> &'static str {
        match self {
            ErrorKind::Gather { .. } => "error gathering metrics:",
            ErrorKind::Encode => "error encoding metric family:",
        }
    }
}

/// What the pipeline does next after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    AbortWithHttpError,
    AbortWithFault,
}

impl ErrorHandling {
    pub fn apply(&self, kind: ErrorKind) -> Action {
        match (self, kind) {
            (ErrorHandling::Panic, _) => Action::AbortWithFault,
            (ErrorHandling::HttpError, _) => Action::AbortWithHttpError,
            // A degraded snapshot is still worth serving, an empty one is not.
            (ErrorHandling::Continue, ErrorKind::Gather { gathered: 0 }) => {
                Action::AbortWithHttpError
            }
            (ErrorHandling::Continue, _) => Action::Continue,
        }
    }
}
