//! Wicket - a small blocking HTTP/1.1 file server
//!
//! Core library: request parsing, the keep-alive connection loop, and the
//! bounded worker pool that drives it.

pub mod config;
pub mod http;
pub mod server;
pub mod static_files;
