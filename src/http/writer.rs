use std::io::{self, Read, Write};

use crate::http::response::{Body, Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Interim answer to `Expect: 100-continue`.
pub const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// Renders the status line and headers, including the blank line that ends them.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes a response to a blocking stream.
pub struct ResponseWriter {
    head: Vec<u8>,
    status: StatusCode,
    body: Body,
}

impl ResponseWriter {
    pub fn new(response: Response) -> Self {
        Self {
            head: serialize_head(&response),
            status: response.status,
            body: response.body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Writes head and body, then flushes.
    ///
    /// Fails with `UnexpectedEof` if a streamed body ends before its declared
    /// length: the peer has already been promised more bytes than it will
    /// get, so the connection can't be reused.
    pub fn write_to<W: Write>(self, stream: &mut W) -> io::Result<u64> {
        stream.write_all(&self.head)?;

        let sent = match self.body {
            Body::Bytes(bytes) => {
                stream.write_all(&bytes)?;
                bytes.len() as u64
            }
            Body::Stream { reader, len } => {
                let copied = io::copy(&mut reader.take(len), stream)?;
                if copied < len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("response body ended after {copied} of {len} bytes"),
                    ));
                }
                copied
            }
        };

        stream.flush()?;
        Ok(sent)
    }
}

/// Sends the interim `100 Continue` status line.
pub fn write_continue<W: Write>(stream: &mut W) -> io::Result<()> {
    stream.write_all(CONTINUE)?;
    stream.flush()
}
