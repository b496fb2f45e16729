use std::io::Read;

use bytes::BytesMut;

use crate::http::body::BodyReader;
use crate::http::error::HttpError;
use crate::http::headers::Headers;
use crate::http::lines::{DEFAULT_CHUNK_SIZE, Ending, LineReader, Token};
use crate::http::request::{self, Method, Request};

/// Default cap on a single request-line or header-line.
pub const DEFAULT_MAX_LINE: usize = 8 * 1024;

/// Read sizing for the parser and the body reader it hands off to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub chunk_size: usize,
    pub max_line: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_line: DEFAULT_MAX_LINE,
        }
    }
}

/// Parses one request head off `stream`.
///
/// `buffer` holds bytes left over from the previous request cycle. It is
/// taken and becomes the body reader's spill buffer, so the caller gets it
/// back from [`BodyReader::finish`].
///
/// Returns `Ok(None)` if the peer closed the connection before sending a
/// request line.
pub fn parse<'s, S: Read>(
    stream: &'s mut S,
    buffer: &mut BytesMut,
    limits: &Limits,
) -> Result<Option<Request<'s, S>>, HttpError> {
    let mut lines = LineReader::new(
        stream,
        std::mem::take(buffer),
        limits.chunk_size,
        limits.max_line,
    );

    let request_line = loop {
        match lines.next_line() {
            Token::Line(line) => break line,
            // stray CRLFs between requests
            Token::Blank => continue,
            Token::End(ending) => {
                return match ending_error(ending, limits, lines.remainder()) {
                    Some(e) => Err(e),
                    None => Ok(None),
                };
            }
        }
    };

    let (method, path, version) = parse_request_line(&request_line)?;

    let mut headers = Headers::new();
    loop {
        match lines.next_line() {
            Token::Line(line) => {
                let (name, value) = parse_header_line(&line)?;
                headers.add(name, value);
            }
            Token::Blank => break,
            Token::End(ending) => match ending_error(ending, limits, lines.remainder()) {
                Some(e) => return Err(e),
                // Peer closed mid-head: what arrived is the whole request.
                None => break,
            },
        }
    }

    let declared = request::content_length(&headers);
    let (stream, spill) = lines.into_parts();

    tracing::trace!(
        method = %method,
        path = %path,
        declared,
        spilled = spill.len(),
        "parsed request head"
    );

    Ok(Some(Request {
        method,
        path,
        version,
        headers,
        body: BodyReader::new(stream, spill, declared, limits.chunk_size),
    }))
}

/// Splits `METHOD SP PATH SP VERSION` on single spaces.
pub fn parse_request_line(line: &[u8]) -> Result<(Method, String, String), HttpError> {
    let malformed = || HttpError::MalformedRequestLine(String::from_utf8_lossy(line).into_owned());

    let text = std::str::from_utf8(line).map_err(|_| malformed())?;
    let mut parts = text.split(' ');

    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(path), Some(version), None) => Ok((
            Method::parse(method),
            path.to_string(),
            version.to_string(),
        )),
        _ => Err(malformed()),
    }
}

/// Splits `Name: value` on the first colon, dropping leading whitespace
/// from the value.
pub fn parse_header_line(line: &[u8]) -> Result<(&str, &str), HttpError> {
    let malformed = || HttpError::MalformedHeaderLine(String::from_utf8_lossy(line).into_owned());

    let text = std::str::from_utf8(line).map_err(|_| malformed())?;
    let (name, value) = text.split_once(':').ok_or_else(malformed)?;

    Ok((name, value.trim_start()))
}

/// The error a line sequence ending maps to. `None` for a clean EOF.
fn ending_error(ending: Ending, limits: &Limits, leftover: &[u8]) -> Option<HttpError> {
    let err = match ending {
        Ending::Eof => return None,
        Ending::TimedOut => HttpError::IdleTimeout,
        Ending::LineTooLong => HttpError::LineTooLong(limits.max_line),
        Ending::Failed(kind) => HttpError::Io(kind.into()),
    };

    if !leftover.is_empty() {
        tracing::debug!(bytes = leftover.len(), ?ending, "discarding partial request head");
    }

    Some(err)
}
