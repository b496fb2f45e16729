use std::io;

use thiserror::Error;

/// Failures that end a request cycle on a connection.
///
/// The first three kinds are the client's fault and are answered with
/// `400 Bad Request`. The rest close the connection without a response.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed request line {0:?}")]
    MalformedRequestLine(String),

    #[error("malformed header line {0:?}")]
    MalformedHeaderLine(String),

    #[error("request head line longer than {0} bytes")]
    LineTooLong(usize),

    #[error("connection idle past the read timeout")]
    IdleTimeout,

    #[error("socket i/o error: {0}")]
    Io(#[from] io::Error),
}

impl HttpError {
    /// Whether the peer sent something we refuse to parse.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HttpError::MalformedRequestLine(_)
                | HttpError::MalformedHeaderLine(_)
                | HttpError::LineTooLong(_)
        )
    }
}

/// Read timeouts surface as `WouldBlock` on unix and `TimedOut` on windows.
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
