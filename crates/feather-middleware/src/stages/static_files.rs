//! Static file serving.
//!
//! Serves files below the public root for `GET` and `HEAD`. Anything the
//! stage cannot serve (other methods, missing files, hidden files, directories
//! without an index file) continues down the chain, so the not-found stages
//! get a turn. Only paths escaping the root or failing to decode are rejected.

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response};
use bytes::Bytes;
use feather_core::{BoxFuture, StageError, StageResult};
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::Full;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Static file stage.
///
/// # Example
///
/// ```
/// use feather_middleware::stages::StaticFiles;
///
/// let files = StaticFiles::new("./public")
///     .precompressed_gzip(true)
///     .cache_control("max-age=3600");
/// assert_eq!(files.root().to_str(), Some("./public"));
/// ```
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_file: Option<String>,
    cache_control: Option<String>,
    precompressed_gzip: bool,
}

/// Outcome of mapping a URL path onto the public root.
enum Resolved {
    File(PathBuf),
    Missing,
    Rejected(StatusCode, &'static str),
}

impl StaticFiles {
    /// Creates a stage serving files below `root`, with `index.html` as the
    /// directory index.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index_file: Some("index.html".to_string()),
            cache_control: None,
            precompressed_gzip: false,
        }
    }

    /// Sets the directory index file name, or disables it with `None`.
    pub fn index(mut self, index: Option<String>) -> Self {
        self.index_file = index;
        self
    }

    /// Sets the `Cache-Control` header sent with every file.
    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Serves `<file>.gz` siblings to clients accepting gzip.
    pub fn precompressed_gzip(mut self, enabled: bool) -> Self {
        self.precompressed_gzip = enabled;
        self
    }

    /// The public root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a URL path onto a file below the root.
    ///
    /// The path is percent-decoded first; traversal checks run on the
    /// decoded form. Dotfiles are treated as missing.
    fn resolve_path(&self, request_path: &str) -> Resolved {
        let Ok(decoded) = urlencoding::decode(request_path) else {
            return Resolved::Rejected(StatusCode::BAD_REQUEST, "malformed percent-encoding in path");
        };
        if decoded.contains('\0') {
            return Resolved::Rejected(StatusCode::BAD_REQUEST, "null byte in path");
        }
        let relative = decoded.trim_start_matches('/');

        for component in Path::new(relative).components() {
            match component {
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Resolved::Rejected(StatusCode::FORBIDDEN, "directory traversal not allowed");
                }
                Component::Normal(name) if name.to_str().is_some_and(|n| n.starts_with('.')) => {
                    return Resolved::Missing;
                }
                _ => {}
            }
        }

        let path = self.root.join(relative);
        if path.is_file() {
            return Resolved::File(path);
        }
        if path.is_dir() {
            if let Some(index) = &self.index_file {
                let index_path = path.join(index);
                if index_path.is_file() {
                    return Resolved::File(index_path);
                }
            }
        }
        Resolved::Missing
    }

    /// Finds a precompressed sibling the client accepts.
    fn find_precompressed(&self, path: &Path, headers: &HeaderMap) -> Option<PathBuf> {
        let accepts_gzip = headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("gzip"));
        if !self.precompressed_gzip || !accepts_gzip {
            return None;
        }

        let mut gz = path.as_os_str().to_owned();
        gz.push(".gz");
        let gz = PathBuf::from(gz);
        gz.is_file().then_some(gz)
    }

    async fn serve(&self, path: &Path, ctx: &RequestContext) -> StageResult<Response> {
        let precompressed = self.find_precompressed(path, ctx.headers());
        let actual = precompressed.as_deref().unwrap_or(path);

        let io_error = |e: std::io::Error| {
            StageError::uncaught_with(format!("failed to read {}", actual.display()), e)
        };
        let metadata = tokio::fs::metadata(actual).await.map_err(io_error)?;
        let body = if ctx.method() == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(tokio::fs::read(actual).await.map_err(io_error)?)
        };

        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = StatusCode::OK;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(detect_mime_type(path)));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
        if precompressed.is_some() {
            headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
        }
        if let Some(value) = self.cache_control.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(header::CACHE_CONTROL, value);
        }
        if let Some(value) = metadata
            .modified()
            .ok()
            .and_then(|m: SystemTime| HeaderValue::from_str(&httpdate::fmt_http_date(m)).ok())
        {
            headers.insert(header::LAST_MODIFIED, value);
        }
        Ok(response)
    }
}

/// Maps a file extension to a content type.
fn detect_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "pdf" => "application/pdf",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "wasm" => "application/wasm",
        "webmanifest" => "application/manifest+json",
        _ => "application/octet-stream",
    }
}

impl Middleware for StaticFiles {
    fn name(&self) -> &'static str {
        "static_files"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            if ctx.method() != Method::GET && ctx.method() != Method::HEAD {
                return next.run(ctx, request).await;
            }

            match self.resolve_path(ctx.path()) {
                Resolved::File(path) => self.serve(&path, ctx).await,
                Resolved::Rejected(status, reason) => Err(StageError::status(status, reason)),
                Resolved::Missing => next.run(ctx, request).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("style.css"), "body {}").unwrap();
        fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        fs::write(dir.path().join("app.js.gz"), b"\x1f\x8bfake").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        fs::write(dir.path().join("my file.txt"), "spaced").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
        dir
    }

    fn request() -> Request {
        http::Request::new(Full::new(Bytes::new()))
    }

    async fn get(files: &StaticFiles, ctx: &mut RequestContext) -> StageResult<Response> {
        files.process(ctx, request(), Next::end()).await
    }

    #[tokio::test]
    async fn test_serve_css_file() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        let mut ctx = RequestContext::new(Method::GET, "/style.css?v=2");

        let response = get(&files, &mut ctx).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/css; charset=utf-8"
        );
        assert!(response.headers().contains_key(header::LAST_MODIFIED));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "body {}");
    }

    #[tokio::test]
    async fn test_directory_serves_index() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        let mut ctx = RequestContext::new(Method::GET, "/docs/");
        let body = get(&files, &mut ctx)
            .await
            .unwrap()
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(body, "<h1>docs</h1>");
    }

    #[tokio::test]
    async fn test_missing_file_continues() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        let mut ctx = RequestContext::new(Method::GET, "/missing.png");
        assert!(get(&files, &mut ctx).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_post_continues() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        let mut ctx = RequestContext::new(Method::POST, "/style.css");
        assert!(get(&files, &mut ctx).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_traversal_forbidden() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());

        for url in ["/../etc/passwd", "/%2e%2e/etc/passwd", "/docs/..%2F..%2Fetc/passwd"] {
            let mut ctx = RequestContext::new(Method::GET, url);
            assert_eq!(
                get(&files, &mut ctx).await.unwrap_err().status_code(),
                StatusCode::FORBIDDEN,
                "{url}"
            );
        }
    }

    #[tokio::test]
    async fn test_hidden_files_continue() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());

        for url in ["/.env", "/%2Eenv", "/.well-known/security.txt"] {
            let mut ctx = RequestContext::new(Method::GET, url);
            assert!(get(&files, &mut ctx).await.unwrap_err().is_not_found(), "{url}");
        }
    }

    #[tokio::test]
    async fn test_percent_encoded_path_is_decoded() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        let mut ctx = RequestContext::new(Method::GET, "/my%20file.txt");

        let response = get(&files, &mut ctx).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "spaced");
    }

    #[tokio::test]
    async fn test_encoded_leading_slash_stays_below_root() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        let mut ctx = RequestContext::new(Method::GET, "/%2Fetc/passwd");
        assert!(get(&files, &mut ctx).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_undecodable_path_is_bad_request() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());

        for url in ["/%ff%fe.txt", "/index.html%00.png"] {
            let mut ctx = RequestContext::new(Method::GET, url);
            assert_eq!(
                get(&files, &mut ctx).await.unwrap_err().status_code(),
                StatusCode::BAD_REQUEST,
                "{url}"
            );
        }
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        let mut ctx = RequestContext::new(Method::HEAD, "/style.css");
        let response = get(&files, &mut ctx).await.unwrap();
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "7");
        assert!(response.into_body().collect().await.unwrap().to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_precompressed_gzip_sibling() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path()).precompressed_gzip(true);

        let mut req = request();
        req.headers_mut()
            .insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, br"));
        *req.uri_mut() = "/app.js".parse().unwrap();
        let mut ctx = RequestContext::from_request(&req);

        let response = files.process(&mut ctx, req, Next::end()).await.unwrap();
        assert_eq!(response.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/javascript; charset=utf-8"
        );

        let mut ctx = RequestContext::new(Method::GET, "/app.js");
        let response = get(&files, &mut ctx).await.unwrap();
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    }
}
