use std::fmt;

use crate::http::body::BodyReader;
use crate::http::headers::Headers;

/// HTTP request methods.
///
/// Only GET is served. Everything else is answered with
/// 405 Method Not Allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other token, uppercased
    Other(String),
}

impl Method {
    /// Parses a method token, uppercasing it first.
    ///
    /// # Example
    ///
    /// ```
    /// # use wicket::http::request::Method;
    /// assert_eq!(Method::parse("get"), Method::GET);
    /// assert_eq!(Method::parse("brew").as_str(), "BREW");
    /// ```
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            _ => Method::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(s) => s,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed request, valid for a single request cycle.
///
/// The body reader borrows the connection's stream, so the request has to be
/// taken apart (and the body finished) before a response can be written.
pub struct Request<'s, S> {
    /// The HTTP method, uppercased
    pub method: Method,
    /// The request target exactly as sent (e.g. "/index.html?x=1")
    pub path: String,
    /// The version token, accepted as-is
    pub version: String,
    pub headers: Headers,
    pub body: BodyReader<'s, S>,
}

impl<S> Request<'_, S> {
    /// Declared Content-Length. Missing or unparsable values count as 0.
    pub fn content_length(&self) -> usize {
        content_length(&self.headers)
    }

    /// Whether the client asked for the connection to be closed.
    pub fn wants_close(&self) -> bool {
        wants_close(&self.headers)
    }

    /// Whether the client is waiting for `100 Continue` before sending the body.
    pub fn expects_continue(&self) -> bool {
        expects_continue(&self.headers)
    }
}

pub(crate) fn content_length(headers: &Headers) -> usize {
    headers
        .get("content-length")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0)
}

pub(crate) fn wants_close(headers: &Headers) -> bool {
    headers
        .get("connection")
        .map(|v| v.trim().eq_ignore_ascii_case("close"))
        .unwrap_or(false)
}

pub(crate) fn expects_continue(headers: &Headers) -> bool {
    headers
        .get_all("expect")
        .iter()
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("100-continue"))
}
