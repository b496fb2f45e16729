use std::fmt;
use std::io::Read;

use bytes::Bytes;

/// HTTP status codes the engine emits.
///
/// - `Continue` (100): interim answer to `Expect: 100-continue`
/// - `Ok` (200): file served
/// - `BadRequest` (400): malformed request head
/// - `NotFound` (404): nothing to serve at the path
/// - `MethodNotAllowed` (405): anything but GET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 100 Continue
    Continue,
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use wicket::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Continue => 100,
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Continue => "Continue",
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

/// Response payload: either in memory or streamed from a reader of known size.
pub enum Body {
    Bytes(Bytes),
    Stream {
        reader: Box<dyn Read + Send>,
        len: u64,
    },
}

impl Body {
    /// Length announced in `Content-Length`.
    pub fn len(&self) -> u64 {
        match self {
            Body::Bytes(b) => b.len() as u64,
            Body::Stream { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Body::Stream { len, .. } => f.debug_struct("Stream").field("len", len).finish_non_exhaustive(),
        }
    }
}

/// A complete HTTP response ready to be written to a client.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    /// Headers in the order they are written
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/html")
///     .body(b"<h1>Hello!</h1>".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Body,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Bytes(Bytes::new()),
        }
    }

    /// Sets a header, replacing an earlier value under the same name
    /// (compared case-insensitively).
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    /// Sets an in-memory body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::Bytes(body.into());
        self
    }

    /// Sets a streamed body of exactly `len` bytes.
    pub fn stream(mut self, reader: Box<dyn Read + Send>, len: u64) -> Self {
        self.body = Body::Stream { reader, len };
        self
    }

    /// Builds the final Response.
    ///
    /// `Content-Length` is always derived from the body, so it cannot
    /// disagree with what gets written.
    pub fn build(self) -> Response {
        let len = self.body.len().to_string();
        let builder = self.header("Content-Length", len);

        Response {
            status: builder.status,
            headers: builder.headers,
            body: builder.body,
        }
    }
}

impl Response {
    fn plain(status: StatusCode) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "text/plain")
            .body(status.reason_phrase())
            .build()
    }

    /// 200 OK streaming `len` bytes from `reader`.
    pub fn ok(reader: Box<dyn Read + Send>, content_type: &str, len: u64) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", content_type)
            .stream(reader, len)
            .build()
    }

    /// Creates a 400 Bad Request response.
    pub fn bad_request() -> Self {
        Self::plain(StatusCode::BadRequest)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::plain(StatusCode::NotFound)
    }

    /// Creates a 405 Method Not Allowed response.
    pub fn method_not_allowed() -> Self {
        Self::plain(StatusCode::MethodNotAllowed)
    }

    /// Value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Marks the response as the last one on its connection.
    pub fn closing(mut self) -> Self {
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case("Connection")) {
            Some(slot) => slot.1 = "close".to_string(),
            None => self.headers.push(("Connection".to_string(), "close".to_string())),
        }
        self
    }
}
