//! Welcome-file resolution for directory URLs.

use std::path::{Path, PathBuf};

/// What to do with a request that turned out to address a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Directory requested without a trailing slash: redirect so relative
    /// links inside the welcome page resolve correctly.
    Redirect(String),
    /// Serve this path (a welcome file inside the directory) instead.
    Rewrite(String),
}

/// Ordered list of welcome file names tried inside a directory.
#[derive(Debug, Clone)]
pub struct WelcomeFiles {
    files: Vec<String>,
}

impl WelcomeFiles {
    /// Defaults plus one `index.<ext>` entry per script extension.
    pub fn new(script_extensions: &[String]) -> Self {
        let mut files = vec!["index.html".to_string(), "index.htm".to_string()];
        for ext in script_extensions {
            files.push(format!("index.{ext}"));
        }
        Self { files }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Decide how to serve `url_path` when it maps to a directory under
    /// `webroot`. Returns `None` for non-directories and for directories
    /// with no welcome file (the static file service produces the 404).
    pub fn resolve(&self, webroot: &Path, url_path: &str) -> Option<Resolution> {
        let dir = local_path(webroot, url_path)?;
        if !dir.is_dir() {
            return None;
        }
        if !url_path.ends_with('/') {
            return Some(Resolution::Redirect(format!("{url_path}/")));
        }
        self.files
            .iter()
            .find(|file| dir.join(file).is_file())
            .map(|file| Resolution::Rewrite(format!("{url_path}{file}")))
    }
}

/// Map a URL path onto the webroot, segment by segment. Callers have already
/// rejected dotted segments, so no `..` can appear here.
pub(crate) fn local_path(webroot: &Path, url_path: &str) -> Option<PathBuf> {
    let mut path = webroot.to_path_buf();
    for segment in url_path.split('/').filter(|s| !s.is_empty()) {
        if segment.starts_with('.') {
            return None;
        }
        path.push(segment);
    }
    Some(path)
}
