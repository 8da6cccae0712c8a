//! File responses for root CA downloads and on-disk static overrides.
//!
//! Two ways of sending a file from disk:
//! - [`serve_file`] answers with a known path, either inline or as a download
//!   (`Content-Disposition: attachment`).
//! - [`FileServer`] maps a request path under a root directory to a file,
//!   rejecting anything that would escape the root.
//!
//! Both support `HEAD` and the `If-None-Match` / `If-Modified-Since`
//! conditional headers. Files here are small (PEM blobs, JS, CSS), so they are
//! read fully into memory.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use mime_guess::from_path;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, trace};

/// Cache policy for root CA downloads: always revalidate
const ATTACHMENT_CACHE_CONTROL: &str = "no-cache";

/// Cache policy for static assets
pub const ASSET_CACHE_CONTROL: &str = "public, max-age=3600";

/// Errors from file serving
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build response: {0}")]
    Http(#[from] http::Error),
}

/// How the browser should treat a served file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition<'a> {
    /// Render in place
    Inline,
    /// Offer as a download under the given file name
    Attachment(&'a str),
}

/// Send a single file from disk.
///
/// The MIME type is guessed from the download name for attachments (so
/// `.crt` and `.pem` aliases of the same file get their own type) and from
/// the file itself otherwise.
pub async fn serve_file(
    method: &Method,
    headers: &HeaderMap,
    file_path: &Path,
    disposition: Disposition<'_>,
) -> Result<Response<Full<Bytes>>, FileError> {
    let metadata = match fs::metadata(file_path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(FileError::NotFound(file_path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FileError::NotFound(file_path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let modified = metadata.modified()?;
    let file_size = metadata.len();

    let etag = file_etag(file_size, modified);

    if let Some(response) = check_conditional_headers(headers, &etag, modified)? {
        trace!(path = %file_path.display(), "Conditional request matched, 304");
        return Ok(response);
    }

    let (content_type, cache_control) = match disposition {
        Disposition::Attachment(name) => (content_type_for(Path::new(name)), ATTACHMENT_CACHE_CONTROL),
        Disposition::Inline => (content_type_for(file_path), ASSET_CACHE_CONTROL),
    };

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ETAG, &etag)
        .header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified))
        .header(header::CACHE_CONTROL, cache_control);

    if let Disposition::Attachment(name) = disposition {
        response = response.header(header::CONTENT_DISPOSITION, attachment_header(name)?);
    }

    // HEAD: headers only
    if method == Method::HEAD {
        return Ok(response
            .header(header::CONTENT_LENGTH, file_size)
            .body(Full::new(Bytes::new()))?);
    }

    let content = Bytes::from(fs::read(file_path).await?);
    debug!(
        path = %file_path.display(),
        size = content.len(),
        "Serving file"
    );

    Ok(response
        .header(header::CONTENT_LENGTH, content.len())
        .body(Full::new(content))?)
}

/// Serves files below a root directory.
#[derive(Debug, Clone)]
pub struct FileServer {
    root: PathBuf,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve the file at `path` (relative to the root) inline
    pub async fn serve(
        &self,
        method: &Method,
        headers: &HeaderMap,
        path: &str,
    ) -> Result<Response<Full<Bytes>>, FileError> {
        let file_path = self.resolve_path(path)?;
        serve_file(method, headers, &file_path, Disposition::Inline).await
    }

    /// Resolve and validate a request path
    pub fn resolve_path(&self, path: &str) -> Result<PathBuf, FileError> {
        let path = path.trim_start_matches('/');

        let mut full_path = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(c) => full_path.push(c),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(FileError::InvalidPath(
                        "contains parent directory".to_string(),
                    ));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(FileError::InvalidPath("not relative".to_string()));
                }
            }
        }

        if full_path == self.root || !full_path.starts_with(&self.root) {
            return Err(FileError::InvalidPath(
                "outside of root directory".to_string(),
            ));
        }

        Ok(full_path)
    }
}

/// Answer 304 when the client's cached copy is still current
fn check_conditional_headers(
    headers: &HeaderMap,
    etag: &str,
    modified: SystemTime,
) -> Result<Option<Response<Full<Bytes>>>, FileError> {
    let not_modified = || {
        Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, etag)
            .body(Full::new(Bytes::new()))
    };

    // If-None-Match takes precedence over If-Modified-Since
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH) {
        if let Ok(value) = if_none_match.to_str() {
            let matches = value == "*"
                || value
                    .split(',')
                    .any(|tag| tag.trim().trim_matches('"') == etag.trim_matches('"'));
            if matches {
                return Ok(Some(not_modified()?));
            }
        }
        return Ok(None);
    }

    if let Some(if_modified) = headers.get(header::IF_MODIFIED_SINCE) {
        if let Ok(since) = if_modified
            .to_str()
            .map_err(|_| ())
            .and_then(|s| httpdate::parse_http_date(s).map_err(|_| ()))
        {
            // HTTP dates have second precision
            if unix_secs(modified) <= unix_secs(since) {
                return Ok(Some(not_modified()?));
            }
        }
    }

    Ok(None)
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Validator of the form `"<size>-<mtime micros>"`, both hex
fn file_etag(size: u64, modified: SystemTime) -> String {
    let micros = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or_default();
    format!("\"{size:x}-{micros:x}\"")
}

fn content_type_for(path: &Path) -> String {
    from_path(path).first_or_octet_stream().to_string()
}

fn attachment_header(name: &str) -> Result<HeaderValue, FileError> {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", escaped))
        .map_err(|e| FileError::InvalidPath(format!("bad download name {:?}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serve_attachment() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rootCA.pem");
        fs::write(&path, b"-----BEGIN CERTIFICATE-----\n").await.unwrap();

        let response = serve_file(
            &Method::GET,
            &HeaderMap::new(),
            &path,
            Disposition::Attachment("mycertCA.crt"),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"mycertCA.crt\""
        );
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "28");
        assert!(response.headers().contains_key(header::ETAG));
        assert_eq!(body_string(response).await, "-----BEGIN CERTIFICATE-----\n");
    }

    #[tokio::test]
    async fn test_head_returns_headers_only() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.js");
        fs::write(&path, b"console.log('x');").await.unwrap();

        let response = serve_file(&Method::HEAD, &HeaderMap::new(), &path, Disposition::Inline)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "17");
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .contains("javascript"));
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = serve_file(
            &Method::GET,
            &HeaderMap::new(),
            &temp_dir.path().join("rootCA.pem"),
            Disposition::Attachment("mycertCA.pem"),
        )
        .await;
        assert!(matches!(result, Err(FileError::NotFound(_))));

        // Directories are not files
        let result = serve_file(&Method::GET, &HeaderMap::new(), temp_dir.path(), Disposition::Inline).await;
        assert!(matches!(result, Err(FileError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_conditional_requests() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rootCA.pem");
        fs::write(&path, b"cert").await.unwrap();

        let first = serve_file(&Method::GET, &HeaderMap::new(), &path, Disposition::Inline)
            .await
            .unwrap();
        let etag = first.headers()[header::ETAG].clone();
        let last_modified = first.headers()[header::LAST_MODIFIED].clone();

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, etag);
        let response = serve_file(&Method::GET, &headers, &path, Disposition::Inline)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"stale\""));
        let response = serve_file(&Method::GET, &headers, &path, Disposition::Inline)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_MODIFIED_SINCE, last_modified);
        let response = serve_file(&Method::GET, &headers, &path, Disposition::Inline)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn test_etag_tracks_size_and_mtime() {
        let t = UNIX_EPOCH + std::time::Duration::from_micros(0x1234);
        assert_eq!(file_etag(255, t), "\"ff-1234\"");
        assert_ne!(file_etag(255, t), file_etag(256, t));
        assert_ne!(
            file_etag(255, t),
            file_etag(255, t + std::time::Duration::from_micros(1))
        );
    }

    #[test]
    fn test_path_validation() {
        let server = FileServer::new("/srv/static");

        assert_eq!(
            server.resolve_path("/style.css").unwrap(),
            PathBuf::from("/srv/static/style.css")
        );
        assert_eq!(
            server.resolve_path("img/./logo.svg").unwrap(),
            PathBuf::from("/srv/static/img/logo.svg")
        );
        assert!(server.resolve_path("../etc/passwd").is_err());
        assert!(server.resolve_path("img/../../etc/passwd").is_err());
        assert!(server.resolve_path("").is_err());
        assert!(server.resolve_path("/").is_err());
    }

    #[tokio::test]
    async fn test_file_server_serves_under_root() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("style.css"), b"body {}")
            .await
            .unwrap();
        let server = FileServer::new(temp_dir.path());

        let response = server
            .serve(&Method::GET, &HeaderMap::new(), "style.css")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/css"));
        assert_eq!(response.headers()[header::CACHE_CONTROL], ASSET_CACHE_CONTROL);

        let result = server
            .serve(&Method::GET, &HeaderMap::new(), "missing.css")
            .await;
        assert!(matches!(result, Err(FileError::NotFound(_))));
    }
}
