//! HTTP/1.1 protocol implementation.
//!
//! This module turns a blocking byte stream into requests and serves them
//! over keep-alive connections.
//!
//! # Architecture
//!
//! - **`lines`**: CRLF line tokenizer that keeps bytes read past the last line
//! - **`headers`**: case-insensitive, multi-valued header table
//! - **`parser`**: builds a [`request::Request`] from the tokenizer
//! - **`body`**: reads exactly Content-Length bytes, starting from the parser's spill
//! - **`connection`**: the per-connection request/response state machine
//! - **`response`** / **`writer`**: response representation and serialization
//! - **`service`**: the file-serving seam the connection dispatches GETs to
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← parse head, send 100 Continue if asked,
//!        └──────┬───────────┘   drain the body
//!               │ ├─ EOF / idle timeout → Closed
//!               │ └─ malformed head → Writing(400) → Closed
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← GET → FileService (200/404), else 405
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │     Writing      │ ← Send response to client
//!        └──────┬───────────┘
//!               ├─ Keep-Alive → AwaitingRequest (same connection)
//!               └─ Connection: close / short body → Closed
//! ```

pub mod body;
pub mod connection;
pub mod error;
pub mod headers;
pub mod lines;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod service;
pub mod writer;

pub use error::HttpError;
