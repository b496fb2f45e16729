//! The file-serving seam between the connection handler and whatever backs it.

use std::fmt;
use std::io::Read;

use thiserror::Error;

/// A resource ready to stream back to the client.
pub struct ServedFile {
    pub body: Box<dyn Read + Send>,
    pub content_type: String,
    /// Exact number of bytes `body` will yield
    pub size: u64,
}

impl fmt::Debug for ServedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServedFile")
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("resource not found")]
pub struct NotFound;

/// Resolves request paths to content.
///
/// Implementations own everything about where content lives; the connection
/// handler only passes the request path through and maps `NotFound` to 404.
pub trait FileService: Send + Sync {
    fn serve(&self, path: &str) -> Result<ServedFile, NotFound>;
}
