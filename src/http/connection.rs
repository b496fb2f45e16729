use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::BytesMut;

use crate::http::error::HttpError;
use crate::http::parser::{self, Limits};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::service::{FileService, NotFound};
use crate::http::writer::{self, ResponseWriter};

/// A blocking byte stream with a configurable idle-read timeout.
pub trait Transport: Read + Write {
    /// `None` blocks forever. Expired reads must fail with `WouldBlock` or
    /// `TimedOut`.
    fn set_idle_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_idle_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }
}

/// Per-connection knobs, shared by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub idle_timeout: Option<Duration>,
    pub limits: Limits,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(20)),
            limits: Limits::default(),
        }
    }
}

/// Whether the connection survives the response being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    KeepAlive,
    Close,
}

/// What is left of a request once its body has been drained.
#[derive(Debug)]
pub struct Exchange {
    pub method: Method,
    pub path: String,
    pub keep_alive: bool,
    pub declared: usize,
    pub received: usize,
}

impl Exchange {
    /// A short body leaves the stream at an unknown offset, so the
    /// connection can't carry another request.
    pub fn persistence(&self) -> Persistence {
        if self.keep_alive && self.received == self.declared {
            Persistence::KeepAlive
        } else {
            Persistence::Close
        }
    }
}

pub enum ConnectionState {
    AwaitingRequest,
    Dispatching(Exchange),
    Writing(ResponseWriter, Persistence),
    Closed,
}

/// One client connection and the keep-alive loop that serves it.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    limits: Limits,
    service: Arc<dyn FileService>,
    served: usize,
}

impl<S: Transport> Connection<S> {
    /// Wraps an accepted stream and arms its idle-read timeout.
    pub fn new(
        mut stream: S,
        peer: SocketAddr,
        settings: &ConnectionSettings,
        service: Arc<dyn FileService>,
    ) -> io::Result<Self> {
        stream.set_idle_timeout(settings.idle_timeout.filter(|d| !d.is_zero()))?;

        Ok(Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(settings.limits.chunk_size),
            limits: settings.limits,
            service,
            served: 0,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Responses written so far.
    pub fn served(&self) -> usize {
        self.served
    }

    /// Serves requests until the connection closes.
    ///
    /// Malformed requests, idle timeouts, and a peer hanging up all end in
    /// `Ok`. Errors are socket failures the caller should log.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut state = ConnectionState::AwaitingRequest;

        loop {
            state = match state {
                ConnectionState::AwaitingRequest => match self.receive() {
                    Ok(Some(exchange)) => ConnectionState::Dispatching(exchange),
                    Ok(None) => {
                        tracing::debug!(peer = %self.peer, "peer closed connection");
                        ConnectionState::Closed
                    }
                    Err(HttpError::IdleTimeout) => {
                        tracing::debug!(peer = %self.peer, "connection idle, closing");
                        ConnectionState::Closed
                    }
                    Err(e) if e.is_client_error() => {
                        tracing::warn!(peer = %self.peer, error = %e, "rejecting malformed request");
                        let response = Response::bad_request().closing();
                        ConnectionState::Writing(ResponseWriter::new(response), Persistence::Close)
                    }
                    Err(e) => {
                        return Err(e).with_context(|| format!("reading request from {}", self.peer));
                    }
                },

                ConnectionState::Dispatching(exchange) => {
                    let persistence = exchange.persistence();
                    let mut response = self.dispatch(&exchange);
                    if persistence == Persistence::Close {
                        response = response.closing();
                    }

                    tracing::info!(
                        peer = %self.peer,
                        method = %exchange.method,
                        path = %exchange.path,
                        status = response.status.as_u16(),
                        "request served"
                    );

                    ConnectionState::Writing(ResponseWriter::new(response), persistence)
                }

                ConnectionState::Writing(writer, persistence) => {
                    let status = writer.status();
                    writer
                        .write_to(&mut self.stream)
                        .with_context(|| format!("writing {} response to {}", status.as_u16(), self.peer))?;
                    self.served += 1;

                    match persistence {
                        Persistence::KeepAlive => ConnectionState::AwaitingRequest,
                        Persistence::Close => ConnectionState::Closed,
                    }
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    /// Parses the next request, answers `Expect: 100-continue`, and drains
    /// the declared body.
    pub fn receive(&mut self) -> Result<Option<Exchange>, HttpError> {
        let Some(request) = parser::parse(&mut self.stream, &mut self.buffer, &self.limits)? else {
            return Ok(None);
        };

        let keep_alive = !request.wants_close();
        let expects_continue = request.expects_continue();
        let Request { method, path, mut body, .. } = request;

        tracing::debug!(peer = %self.peer, %method, %path, "request head received");

        if expects_continue {
            writer::write_continue(body.get_mut())?;
            tracing::debug!(peer = %self.peer, "sent 100 Continue");
        }

        let declared = body.remaining();
        let mut received = 0;
        while body.remaining() > 0 {
            let chunk = body.read(self.limits.chunk_size);
            if chunk.is_empty() {
                break;
            }
            received += chunk.len();
        }
        self.buffer = body.finish();

        if received < declared {
            tracing::warn!(
                peer = %self.peer,
                declared,
                received,
                "request body ended early"
            );
        } else if declared > 0 {
            tracing::debug!(peer = %self.peer, bytes = received, "request body drained");
        }

        Ok(Some(Exchange {
            method,
            path,
            keep_alive,
            declared,
            received,
        }))
    }

    fn dispatch(&self, exchange: &Exchange) -> Response {
        if exchange.method != Method::GET {
            return Response::method_not_allowed();
        }

        match self.service.serve(&exchange.path) {
            Ok(file) => Response::ok(file.body, &file.content_type, file.size),
            Err(NotFound) => Response::not_found(),
        }
    }

    /// Gives back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}
