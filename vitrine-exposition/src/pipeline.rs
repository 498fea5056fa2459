use crate::compress::{self, Compression};
use crate::error::ExpositionError;
use crate::gather::{Gatherer, Snapshot};
use crate::negotiate::{compression_for, negotiate_format};
use crate::pool::{self, BufferPool};
use crate::responder::Responder;
use http::StatusCode;
use http::header::{
    ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName,
    HeaderValue,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use vitrine_core::{Action, ErrorHandling, ErrorKind, HandlerOptions};

const GATHER_FAILED: &str = "An error has occurred during metrics gathering:\n\n";
const NOTHING_GATHERED: &str = "No metrics gathered, last error:\n\n";
const ENCODE_FAILED: &str = "An error has occurred during metrics encoding:\n\n";
const NOTHING_ENCODED: &str = "No metrics encoded, last error:\n\n";

/// How an exposition cycle ended, when it did not panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Headers and body were handed to the responder.
    Committed {
        content_length: usize,
        encoding: Compression,
    },
    /// An error response was written instead.
    HttpError { status: StatusCode },
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Committed { .. } => StatusCode::OK,
            Outcome::HttpError { status } => *status,
        }
    }
}

/// Serve the default prometheus registry with default options: report the
/// first error as an HTTP error, no error log, gzip when the client asks.
pub fn handle<R: Responder + ?Sized>(responder: &mut R) -> Result<Outcome, ExpositionError> {
    handle_for(responder, prometheus::default_registry(), &HandlerOptions::default())
}

/// Serve `gatherer` with `options`, using the process-wide buffer pool.
pub fn handle_for<R, G>(
    responder: &mut R,
    gatherer: &G,
    options: &HandlerOptions,
) -> Result<Outcome, ExpositionError>
where
    R: Responder + ?Sized,
    G: Gatherer + ?Sized,
{
    expose(responder, gatherer, options, pool::shared())
}

/// A reusable exposition handler bound to one gatherer and one set of options.
#[derive(Clone)]
pub struct MetricsHandler {
    gatherer: Arc<dyn Gatherer>,
    options: HandlerOptions,
    pool: Arc<BufferPool>,
}

impl MetricsHandler {
    pub fn new(gatherer: impl Gatherer + 'static, options: HandlerOptions) -> Self {
        Self {
            gatherer: Arc::new(gatherer),
            options,
            pool: Arc::new(BufferPool::default()),
        }
    }

    /// Share a buffer pool between handlers.
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Run one exposition cycle against `responder`.
    ///
    /// # Panics
    ///
    /// With [`ErrorHandling::Panic`], on the first gather or encode error.
    pub fn serve<R: Responder + ?Sized>(&self, responder: &mut R) -> Result<Outcome, ExpositionError> {
        expose(responder, &*self.gatherer, &self.options, &self.pool)
    }
}

impl fmt::Debug for MetricsHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsHandler")
            .field("options", &self.options)
            .field("pool_outstanding", &self.pool.outstanding())
            .finish()
    }
}

fn expose<R, G>(
    responder: &mut R,
    gatherer: &G,
    options: &HandlerOptions,
    pool: &BufferPool,
) -> Result<Outcome, ExpositionError>
where
    R: Responder + ?Sized,
    G: Gatherer + ?Sized,
{
    let Snapshot { families, error } = gatherer.gather();
    if let Some(err) = error {
        let kind = ErrorKind::Gather { gathered: families.len() };
        options.log_error(kind.log_prefix(), &err);
        match options.error_handling.apply(kind) {
            Action::Continue => {
                debug!(families = families.len(), error = %err, "serving partial snapshot");
            }
            Action::AbortWithHttpError => {
                let prefix = match options.error_handling {
                    ErrorHandling::Continue => NOTHING_GATHERED,
                    _ => GATHER_FAILED,
                };
                return Ok(abort(responder, prefix, &err));
            }
            Action::AbortWithFault => panic!("{}", ExpositionError::Gather(err)),
        }
    }

    let headers = request_headers(&*responder);
    let format = negotiate_format(&headers);
    let compression = compression_for(
        responder.peek_request_header(ACCEPT_ENCODING.as_str()),
        options.disable_compression,
    );

    let mut buf = pool.acquire();
    let (mut writer, encoding) = compress::decorate(&mut *buf, compression);

    let mut last_err = None;
    for family in &families {
        if let Err(err) = format.encode(&mut writer, family) {
            options.log_error(ErrorKind::Encode.log_prefix(), &err);
            match options.error_handling.apply(ErrorKind::Encode) {
                Action::Continue => last_err = Some(err),
                Action::AbortWithHttpError => return Ok(abort(responder, ENCODE_FAILED, &err)),
                Action::AbortWithFault => panic!("{}", ExpositionError::Encode(err)),
            }
        }
    }

    // Gzip output is only complete once finished; nothing is read before this.
    let payload_len = writer.payload_len();
    writer.finish().map_err(ExpositionError::Compression)?;

    if let Some(err) = last_err.filter(|_| payload_len == 0) {
        return Ok(abort(responder, NOTHING_ENCODED, &err));
    }

    let content_length = buf.len();
    responder.set_response_header(CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
    responder.set_response_header(CONTENT_LENGTH, HeaderValue::from(content_length));
    if !encoding.is_empty() {
        responder.set_response_header(CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }
    responder
        .write_response_body(&buf)
        .map_err(ExpositionError::Transport)?;

    debug!(
        families = families.len(),
        bytes = content_length,
        content_type = format.content_type(),
        encoding,
        "metrics exposed"
    );
    Ok(Outcome::Committed {
        content_length,
        encoding: compression,
    })
}

/// Copy the transport's request headers into a `HeaderMap`. A repeated header
/// keeps its last value; names or values `http` rejects are skipped.
fn request_headers<R: Responder + ?Sized>(responder: &R) -> HeaderMap {
    let mut headers = HeaderMap::new();
    responder.visit_all_request_headers(&mut |name, value| {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name), HeaderValue::from_bytes(value)) {
            headers.insert(name, value);
        }
    });
    headers
}

fn abort<R: Responder + ?Sized>(responder: &mut R, prefix: &str, err: &dyn fmt::Display) -> Outcome {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    responder.respond_with_error(&format!("{prefix}{err}"), status);
    Outcome::HttpError { status }
}
