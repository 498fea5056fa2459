use bytes::{Bytes, BytesMut};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Response, StatusCode};
use std::io;

/// Transport capability the exposition pipeline answers through.
pub trait Responder {
    /// Raw value of a request header, if present.
    fn peek_request_header(&self, name: &str) -> Option<&[u8]>;

    /// Call `visit` for every request header, duplicates included, in order.
    fn visit_all_request_headers(&self, visit: &mut dyn FnMut(&[u8], &[u8]));

    fn set_response_header(&mut self, name: HeaderName, value: HeaderValue);

    fn write_response_body(&mut self, body: &[u8]) -> io::Result<()>;

    /// Replace whatever response was being built with `message` and `status`.
    fn respond_with_error(&mut self, message: &str, status: StatusCode);
}

/// In-memory request/response pair built on the `http` crate types.
///
/// Any HTTP server can copy its request headers in, run the pipeline, and
/// send out [`into_response`](Self::into_response).
#[derive(Debug, Default)]
pub struct HttpExchange {
    request_headers: HeaderMap,
    status: StatusCode,
    response_headers: HeaderMap,
    body: BytesMut,
}

impl HttpExchange {
    pub fn new(request_headers: HeaderMap) -> Self {
        Self {
            request_headers,
            ..Self::default()
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body.freeze());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.response_headers;
        response
    }
}

impl Responder for HttpExchange {
    fn peek_request_header(&self, name: &str) -> Option<&[u8]> {
        self.request_headers.get(name).map(HeaderValue::as_bytes)
    }

    fn visit_all_request_headers(&self, visit: &mut dyn FnMut(&[u8], &[u8])) {
        for (name, value) in &self.request_headers {
            visit(name.as_str().as_bytes(), value.as_bytes());
        }
    }

    fn set_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.insert(name, value);
    }

    fn write_response_body(&mut self, body: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(body);
        Ok(())
    }

    fn respond_with_error(&mut self, message: &str, status: StatusCode) {
        self.status = status;
        self.response_headers.clear();
        self.body.clear();
        self.body.extend_from_slice(message.as_bytes());
    }
}
