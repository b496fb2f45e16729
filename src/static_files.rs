//! Serves files from a directory on disk.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use url::Url;

use crate::http::mime;
use crate::http::service::{FileService, NotFound, ServedFile};

pub struct StaticFiles {
    root: PathBuf,
    index: String,
    base: Url,
}

impl StaticFiles {
    /// Serves from `root`, answering directory requests with `index`.
    ///
    /// Fails if `root` does not exist.
    pub fn new(root: impl AsRef<Path>, index: impl Into<String>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        let base = Url::parse("http://localhost/").map_err(io::Error::other)?;

        Ok(Self {
            root,
            index: index.into(),
            base,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request target to a file under the root.
    ///
    /// Dot segments are resolved against `/` first, so they can't climb out;
    /// symlinks are checked after canonicalizing.
    pub fn resolve(&self, target: &str) -> Option<PathBuf> {
        let url = self.base.join(target).ok()?;
        if url.host_str() != Some("localhost") {
            // absolute-form or scheme-relative targets
            return None;
        }

        let mut path = self.root.clone();
        for segment in url.path_segments()?.filter(|s| !s.is_empty()) {
            path.push(segment);
        }

        let mut path = path.canonicalize().ok()?;
        if path.is_dir() {
            path = path.join(&self.index).canonicalize().ok()?;
        }

        path.starts_with(&self.root).then_some(path)
    }
}

impl FileService for StaticFiles {
    fn serve(&self, path: &str) -> Result<ServedFile, NotFound> {
        let Some(resolved) = self.resolve(path) else {
            tracing::debug!(path, "no file for path");
            return Err(NotFound);
        };

        let file = File::open(&resolved).map_err(|e| {
            tracing::debug!(path, error = %e, "open failed");
            NotFound
        })?;
        let meta = file.metadata().map_err(|_| NotFound)?;
        if !meta.is_file() {
            return Err(NotFound);
        }

        Ok(ServedFile {
            body: Box::new(file),
            content_type: mime::guess(&resolved),
            size: meta.len(),
        })
    }
}
