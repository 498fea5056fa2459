//! Metrics exposition: gather a snapshot from a [`Gatherer`], negotiate the
//! wire format and compression from request headers, encode every family into
//! a pooled buffer and commit the response through a [`Responder`].
//!
//! ```text
//! Gather → Negotiate → Encode (error policy per family) → finish → commit
//! ```
//!
//! Nothing reaches the responder until the whole body is encoded and the
//! compressor is finished, so an error can still become a clean 500 up to
//! the commit point.

pub mod compress;
pub mod error;
pub mod format;
pub mod gather;
pub mod negotiate;
pub mod pipeline;
pub mod pool;
pub mod responder;

pub use compress::{Compression, CompressingWriter};
pub use error::{ExpositionError, GatherError};
pub use format::ExpositionFormat;
pub use gather::{GatherFn, Gatherer, Gatherers, Snapshot};
pub use pipeline::{MetricsHandler, Outcome, handle, handle_for};
pub use pool::{BufferPool, PooledBuffer};
pub use responder::{HttpExchange, Responder};
pub use vitrine_core::{ErrorHandling, ErrorLog, HandlerOptions};
