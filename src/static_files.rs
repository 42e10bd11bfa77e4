//! Static file serving collaborator.
//!
//! The server core treats file contents as opaque bytes behind this
//! reader; handlers wire it up per route. Lookups are confined to the
//! configured base directory; parent-directory components are rejected
//! before any filesystem access.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::server::Response;

/// Byte reader for static content rooted at a base directory.
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    /// Create a reader rooted at `base`.
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    /// Map a URL path onto the base directory, refusing traversal.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// Content type declared for a file, by extension.
    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" => "text/html",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain",
            "svg" => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }

    /// Read a file's bytes and its declared content type.
    ///
    /// # Errors
    ///
    /// `NotFound` for traversal attempts, missing files and non-files;
    /// other `io::Error`s propagate from the read.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "static file read");
        Ok((bytes, Self::content_type(&path)))
    }

    /// Read a file into a ready-to-send response, or a 404 response when
    /// it cannot be served.
    #[must_use]
    pub fn response(&self, url_path: &str) -> Response {
        match self.load(url_path) {
            Ok((bytes, content_type)) => Response::bytes(bytes, content_type),
            Err(_) => Response::text("File not found").status(404),
        }
    }
}
