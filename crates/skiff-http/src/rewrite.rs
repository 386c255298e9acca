//! Framework rewrites: route pretty URLs to a front-controller file.
//!
//! A request is rewritten to `/<rewrite-file><original-path>` only when
//! nothing else claims it: not the socket endpoint, not the favicon, not a
//! script file, and not an existing file or directory in the webroot.

use std::path::Path;

use crate::welcome::local_path;

#[derive(Debug, Clone)]
pub struct FrameworkRewrites {
    file: String,
    script_extensions: Vec<String>,
    socket_path: String,
}

impl FrameworkRewrites {
    pub fn new(
        file: impl Into<String>,
        script_extensions: &[String],
        socket_path: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            script_extensions: script_extensions.to_vec(),
            socket_path: socket_path.into(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// The rewritten path, or `None` when the request should pass through
    /// untouched.
    pub fn apply(&self, webroot: &Path, url_path: &str) -> Option<String> {
        if url_path == self.socket_path || url_path.starts_with(&format!("{}/", self.socket_path)) {
            return None;
        }
        if url_path == "/favicon.ico" {
            return None;
        }
        if self.script_extensions.iter().any(|ext| {
            let marker = format!(".{ext}");
            url_path.ends_with(&marker) || url_path.contains(&format!("{marker}/"))
        }) {
            return None;
        }
        if let Some(path) = local_path(webroot, url_path) {
            if path.exists() {
                return None;
            }
        }
        Some(format!("/{}{}", self.file, url_path))
    }
}
