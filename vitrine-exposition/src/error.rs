use std::fmt;
use std::io;
use thiserror::Error;

/// One or more collectors failed during a gather.
///
/// The snapshot that carried this error may still hold the families that
/// gathered fine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherError {
    failures: Vec<String>,
}

impl GatherError {
    pub fn new(failure: impl fmt::Display) -> Self {
        Self {
            failures: vec![failure.to_string()],
        }
    }

    pub fn push(&mut self, failure: impl fmt::Display) {
        self.failures.push(failure.to_string());
    }

    /// Absorb every failure of `other`, keeping order.
    pub fn extend(&mut self, other: GatherError) {
        self.failures.extend(other.failures);
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `None` when nothing was recorded.
    pub fn into_option(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

impl fmt::Display for GatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return Ok(());
        }
        write!(f, "{} error(s) occurred:", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n* {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GatherError {}

/// Errors produced by an exposition cycle.
///
/// Gather and encode errors are routed through the configured
/// [`ErrorHandling`](vitrine_core::ErrorHandling) and only surface here as
/// panic payload text. Compression and transport errors are always returned.
#[derive(Error, Debug)]
pub enum ExpositionError {
    #[error("error gathering metrics: {0}")]
    Gather(GatherError),

    #[error("error encoding metric family: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("finishing compressed body failed: {0}")]
    Compression(#[source] io::Error),

    #[error("writing response failed: {0}")]
    Transport(#[source] io::Error),
}
