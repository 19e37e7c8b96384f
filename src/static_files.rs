//! Serving files from a directory.
//!
//! Resolves request paths to files below a root directory and hands them to
//! the response as file bodies; the writer streams them and picks the content
//! type from the extension.

use std::path::{Component, Path, PathBuf};

use crate::http::handler::RequestHandler;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a decoded request path to an existing regular file under the
    /// root. Paths that climb out of the root (`..`) resolve to nothing.
    pub fn resolve(&self, uri_path: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();

        for component in Path::new(uri_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        path.is_file().then_some(path)
    }
}

impl RequestHandler for StaticFiles {
    fn handle(&self, request: &Request, response: &mut Response) -> anyhow::Result<()> {
        match self.resolve(&request.path) {
            Some(file) => {
                response.set_body_file(file);
            }
            None => {
                tracing::debug!(path = %request.path, root = %self.root.display(), "No such file");
                response.set_error_status(StatusCode::NotFound, Some(&request.path));
            }
        }
        Ok(())
    }
}
