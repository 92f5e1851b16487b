//! Static directory mounts.
//!
//! # Responsibilities
//! - Resolve request segments to a file under the mount root
//! - Directory index and implicit extension lookup
//! - Stream the file with tower-http `ServeFile`
//!
//! # Design Decisions
//! - A miss is terminal (`notFound`), never a fall-through
//! - `..` segments are refused (`forbidden`), dot-files are never served

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use serde_json::json;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::config::StaticConfig;
use crate::error::{ErrorKind, ServerError};
use crate::http::context::RequestHead;

/// A local directory served under a path prefix.
#[derive(Debug, Clone)]
pub struct StaticMount {
    root: PathBuf,
    extensions: Vec<String>,
    index: String,
}

impl StaticMount {
    pub fn new(root: impl Into<PathBuf>, config: &StaticConfig) -> Self {
        Self {
            root: root.into(),
            extensions: config.extensions.clone(),
            index: config.index.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the file for the decoded segments below the mount point.
    pub async fn resolve(&self, rest: &[String]) -> Result<PathBuf, ServerError> {
        let mut path = self.root.clone();
        for segment in rest {
            match segment.as_str() {
                "" | "." => continue,
                ".." => return Err(ErrorKind::Forbidden.with_info(json!({ "path": rest.join("/") }))),
                s if s.starts_with('.') || s.contains(['/', '\\', '\0']) => {
                    return Err(not_found(rest));
                }
                s => path.push(s),
            }
        }

        if is_file(&path).await {
            return Ok(path);
        }

        if is_dir(&path).await {
            let index = path.join(&self.index);
            if is_file(&index).await {
                return Ok(index);
            }
            return Err(not_found(rest));
        }

        if !rest.is_empty() {
            for ext in &self.extensions {
                let mut candidate = path.clone().into_os_string();
                candidate.push(".");
                candidate.push(ext);
                let candidate = PathBuf::from(candidate);
                if is_file(&candidate).await {
                    return Ok(candidate);
                }
            }
        }

        Err(not_found(rest))
    }

    /// Serve the resolved file for a GET or HEAD request.
    pub async fn serve(&self, head: &RequestHead, rest: &[String]) -> Result<Response, ServerError> {
        let file = self.resolve(rest).await?;
        tracing::debug!(file = %file.display(), "Serving static file");

        let mut request = Request::new(Body::empty());
        *request.method_mut() = head.method.clone();
        *request.uri_mut() = head.uri.clone();
        *request.headers_mut() = head.headers.clone();

        match ServeFile::new(&file).oneshot(request).await {
            Ok(response) => Ok(response.map(Body::new)),
            Err(never) => match never {},
        }
    }
}

fn not_found(rest: &[String]) -> ServerError {
    ErrorKind::NotFound.with_info(json!({ "path": format!("/{}", rest.join("/")) }))
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}
