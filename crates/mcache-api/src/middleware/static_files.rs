//! # Negotiated Static Files
//!
//! Serves files below a root directory, choosing the best sibling the client
//! can use:
//!
//! 1. `<name>.avif` in place of the extension, when `image/avif` is accepted.
//! 2. `<name>.webp` in place of the extension, when `image/webp` is accepted.
//! 3. `<file>.br`, when brotli is accepted (`Content-Encoding: br`).
//! 4. `<file>.gz`, when gzip is accepted (`Content-Encoding: gzip`).
//! 5. The file itself.
//!
//! Only `GET`, `HEAD` and `OPTIONS` are considered. A path that resolves to
//! nothing (or to a directory) is passed to the inner service untouched.
//! Paths containing NUL are rejected with 400, paths with `..` segments with
//! 403, both before the filesystem is touched.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use mcache_compress::precompress::sibling_path;
use mcache_core::{Encoding, MediaConfig};
use percent_encoding::percent_decode_str;

use crate::error::AppError;
use crate::middleware::metrics::record_variant;
use crate::negotiate::ClientCapabilities;
use crate::send::{send_file, ResolvedFile};

/// Root directory and response policy for the static middleware.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    max_age: Option<u64>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_age: None,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(&config.static_root).with_max_age(config.cache_max_age)
    }

    /// `Cache-Control: max-age` for served files; `None` sets no header.
    pub fn with_max_age(mut self, max_age: Option<u64>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a raw (percent-encoded) request path to a file below the root.
    pub fn resolve_path(&self, raw: &str) -> Result<PathBuf, AppError> {
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| AppError::BadRequest("failed to decode path".into()))?;
        if decoded.contains('\0') {
            return Err(AppError::BadRequest("malicious path".into()));
        }
        let relative = decoded.trim_start_matches(['/', '\\']);
        if relative.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(AppError::Forbidden("path escapes the static root".into()));
        }
        Ok(relative
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
            .fold(self.root.clone(), |path, segment| path.join(segment)))
    }

    /// Pick the file to send for `path`, or `None` when nothing is there.
    async fn select(
        &self,
        path: PathBuf,
        caps: ClientCapabilities,
    ) -> Result<Option<Selection>, AppError> {
        // Variant names are built from the file name, which the root lacks.
        if path == self.root || path.file_name().is_none() {
            return Ok(None);
        }
        let mut candidates = Vec::with_capacity(5);
        if caps.avif {
            candidates.push((path.with_extension("avif"), Variant::Avif));
        }
        if caps.webp {
            candidates.push((path.with_extension("webp"), Variant::Webp));
        }
        if caps.brotli {
            candidates.push((sibling_path(&path, Encoding::Brotli), Variant::Encoded(Encoding::Brotli)));
        }
        if caps.gzip {
            candidates.push((sibling_path(&path, Encoding::Gzip), Variant::Encoded(Encoding::Gzip)));
        }

        for (candidate, variant) in candidates {
            if let Some(metadata) = file_metadata(&candidate).await? {
                return Ok(Some(Selection {
                    content_type: variant.content_type(&path, &candidate),
                    path: candidate,
                    metadata,
                    variant,
                }));
            }
        }
        Ok(file_metadata(&path).await?.map(|metadata| Selection {
            content_type: content_type_of(&path),
            path,
            metadata,
            variant: Variant::Identity,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Avif,
    Webp,
    Encoded(Encoding),
    Identity,
}

impl Variant {
    fn label(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Encoded(Encoding::Brotli) => "br",
            Self::Encoded(Encoding::Gzip) => "gzip",
            Self::Identity => "identity",
        }
    }

    // Encoded siblings carry the type of the file they encode.
    fn content_type(self, original: &Path, chosen: &Path) -> String {
        match self {
            Self::Encoded(_) => content_type_of(original),
            _ => content_type_of(chosen),
        }
    }

    fn encoding(self) -> Option<Encoding> {
        match self {
            Self::Encoded(encoding) => Some(encoding),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Selection {
    path: PathBuf,
    metadata: std::fs::Metadata,
    content_type: String,
    variant: Variant,
}

/// MIME type from the file extension. AVIF is spelled out since not every
/// MIME table knows it.
pub fn content_type_of(path: &Path) -> String {
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("avif")) {
        return "image/avif".to_string();
    }
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Metadata of `path` if it is a regular file. Absence (including a missing
/// parent directory) is `None`; any other failure is an error.
/// ENAMETOOLONG on Linux and macOS.
const NAME_TOO_LONG: i32 = if cfg!(target_os = "macos") { 63 } else { 36 };

async fn file_metadata(path: &Path) -> Result<Option<std::fs::Metadata>, AppError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(Some(metadata)),
        Ok(_) => Ok(None),
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Lookup failures that mean no file can exist at the requested path.
fn is_absent(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
        || e.raw_os_error() == Some(NAME_TOO_LONG)
}

/// `from_fn_with_state` middleware serving negotiated static files.
pub async fn serve_static(
    State(files): State<Arc<StaticFiles>>,
    request: Request,
    next: Next,
) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(request).await;
    }

    let path = match files.resolve_path(request.uri().path()) {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };
    let caps = ClientCapabilities::from_headers(request.headers());

    let selection = match files.select(path, caps).await {
        Ok(Some(selection)) => selection,
        Ok(None) => return next.run(request).await,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(
        path = %selection.path.display(),
        variant = selection.variant.label(),
        "serving static file"
    );
    record_variant(selection.variant.label());

    let file = ResolvedFile {
        path: selection.path,
        metadata: selection.metadata,
        content_type: selection.content_type,
        encoding: selection.variant.encoding(),
        max_age: files.max_age,
        negotiated: true,
    };
    match send_file(request.method(), request.headers(), file).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_traversal_and_nul() {
        let files = StaticFiles::new("/srv/dist");
        assert!(matches!(
            files.resolve_path("/../etc/passwd"),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            files.resolve_path("/a/%2e%2e/b"),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            files.resolve_path("/a%5c..%5cb"),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            files.resolve_path("/a%00.js"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            files.resolve_path("/%ff"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn resolve_joins_below_root() {
        let files = StaticFiles::new("/srv/dist");
        assert_eq!(
            files.resolve_path("/static/app%20main.js").unwrap(),
            PathBuf::from("/srv/dist/static/app main.js")
        );
        assert_eq!(
            files.resolve_path("/./a//b").unwrap(),
            PathBuf::from("/srv/dist/a/b")
        );
        assert_eq!(files.resolve_path("/").unwrap(), PathBuf::from("/srv/dist"));
    }

    #[tokio::test]
    async fn root_never_selects_a_variant() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("dist");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(dir.path().join("dist.br"), b"outside").unwrap();
        std::fs::write(dir.path().join("dist.webp"), b"outside").unwrap();

        let files = StaticFiles::new(&root);
        let caps = ClientCapabilities {
            avif: true,
            webp: true,
            brotli: true,
            gzip: true,
        };
        let path = files.resolve_path("/").unwrap();
        assert!(files.select(path, caps).await.unwrap().is_none());
    }

    #[test]
    fn over_long_names_count_as_absent() {
        let e = std::io::Error::from_raw_os_error(NAME_TOO_LONG);
        assert!(is_absent(&e));
        assert!(is_absent(&std::io::Error::from(ErrorKind::NotFound)));
        assert!(!is_absent(&std::io::Error::from(ErrorKind::PermissionDenied)));
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_of(Path::new("a/b.avif")), "image/avif");
        assert_eq!(content_type_of(Path::new("a/b.webp")), "image/webp");
        assert_eq!(content_type_of(Path::new("a/b.css")), "text/css");
        assert_eq!(content_type_of(Path::new("a/b")), "application/octet-stream");
    }

    #[test]
    fn encoded_sibling_keeps_original_type() {
        let original = Path::new("site/app.js");
        let br = sibling_path(original, Encoding::Brotli);
        assert_eq!(br, PathBuf::from("site/app.js.br"));
        assert_eq!(
            Variant::Encoded(Encoding::Brotli).content_type(original, &br),
            content_type_of(original)
        );
    }
}
