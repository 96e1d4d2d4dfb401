//! # Configuration
//!
//! `MediaConfig` enumerates every option the cache recognizes, together with
//! its default. It is loaded once (YAML file plus environment overrides),
//! validated once, and then passed by value or `Arc` into the components that
//! need it. Nothing reads configuration lazily.
//!
//! ```yaml
//! media_root: /var/lib/mcache/media
//! static_root: /srv/www/dist
//! min_compress_size: 1024
//! workers:
//!   min: 2
//!   max: 8
//! filters: [coding, webp, resize]
//! resize: 1920x
//! cache_max_age: 2592000
//! fixed_files:
//!   /sw.js: /srv/www/dist/sw.js
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MediaError;
use crate::resize::ResizeSpec;

/// Names of the variant filters the workspace ships with.
pub const BUILTIN_FILTERS: [&str; 3] = ["coding", "webp", "resize"];

/// Files below this size are not worth compressing.
pub const DEFAULT_MIN_COMPRESS_SIZE: u64 = 1024;

/// Optimized SVGs at or below this size are stored unencoded.
pub const DEFAULT_SVG_COMPRESS_THRESHOLD: usize = 1024;

/// Target byte volume handled by one precompression worker.
pub const DEFAULT_WORKER_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// One year, the lifetime of immutable content-addressed responses.
pub const IMMUTABLE_MAX_AGE: u64 = 365 * 24 * 60 * 60;

/// Bounds for the precompression worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerBounds {
    /// Below this many workers the batch runs on the calling thread. A
    /// `min` above `max` keeps every batch single-threaded.
    pub min: usize,
    /// Upper bound, additionally clamped to hardware parallelism.
    pub max: usize,
    /// Bytes of input assigned per worker when sizing the pool.
    pub chunk_size: u64,
}

impl Default for WorkerBounds {
    fn default() -> Self {
        let max = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            min: max.min(2),
            max,
            chunk_size: DEFAULT_WORKER_CHUNK_SIZE,
        }
    }
}

/// Complete configuration for the media cache and its HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Root directory of the content-addressed image store.
    pub media_root: PathBuf,
    /// Root directory of the write-once video store.
    pub video_root: PathBuf,
    /// Static asset tree served by the negotiated delivery middleware.
    pub static_root: PathBuf,
    /// Minimum asset size for precompression.
    pub min_compress_size: u64,
    /// Optimized SVGs larger than this get a brotli variant.
    pub svg_compress_threshold: usize,
    /// Extensions picked up by the precompression scanner.
    pub compress_extensions: Vec<String>,
    pub workers: WorkerBounds,
    /// Enabled variant filters, in pipeline order.
    pub filters: Vec<String>,
    /// Bounding box for the `resize` filter, as `WxH`.
    pub resize: Option<String>,
    /// `Cache-Control: max-age` for static files. `None` leaves the header unset.
    pub cache_max_age: Option<u64>,
    /// `Cache-Control: max-age` for content-addressed image and video responses.
    pub media_max_age: u64,
    /// Maximum accepted upload body in bytes.
    pub max_upload_size: usize,
    pub port: u16,
    /// Precompress `static_root` before the server starts listening.
    pub precompress_on_start: bool,
    /// Single files served at fixed URL paths, e.g. `/sw.js`.
    pub fixed_files: BTreeMap<String, PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("data/media"),
            video_root: PathBuf::from("data/video"),
            static_root: PathBuf::from("dist"),
            min_compress_size: DEFAULT_MIN_COMPRESS_SIZE,
            svg_compress_threshold: DEFAULT_SVG_COMPRESS_THRESHOLD,
            compress_extensions: ["js", "css", "svg", "html", "xml"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            workers: WorkerBounds::default(),
            filters: vec!["coding".to_string(), "webp".to_string()],
            resize: None,
            cache_max_age: None,
            media_max_age: IMMUTABLE_MAX_AGE,
            max_upload_size: 50 * 1024 * 1024,
            port: 8080,
            precompress_on_start: true,
            fixed_files: BTreeMap::new(),
        }
    }
}

impl MediaConfig {
    /// Load configuration: YAML file (if given), then environment overrides,
    /// then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, MediaError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    MediaError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_yaml(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document. Missing keys take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, MediaError> {
        serde_yaml::from_str(text).map_err(|e| MediaError::Config(format!("invalid YAML: {e}")))
    }

    /// Apply `MCACHE_*` overrides from an environment lookup.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), MediaError> {
        if let Some(port) = lookup("MCACHE_PORT") {
            self.port = port
                .parse()
                .map_err(|_| MediaError::Config(format!("MCACHE_PORT is not a port: {port:?}")))?;
        }
        if let Some(root) = lookup("MCACHE_MEDIA_ROOT") {
            self.media_root = PathBuf::from(root);
        }
        if let Some(root) = lookup("MCACHE_VIDEO_ROOT") {
            self.video_root = PathBuf::from(root);
        }
        if let Some(root) = lookup("MCACHE_STATIC_ROOT") {
            self.static_root = PathBuf::from(root);
        }
        Ok(())
    }

    /// Reject configurations that cannot work. Called once at startup.
    pub fn validate(&self) -> Result<(), MediaError> {
        if self.min_compress_size == 0 {
            return Err(MediaError::Config("min_compress_size must be positive".into()));
        }
        if self.svg_compress_threshold == 0 {
            return Err(MediaError::Config(
                "svg_compress_threshold must be positive".into(),
            ));
        }
        if self.workers.max == 0 || self.workers.chunk_size == 0 {
            return Err(MediaError::Config(
                "workers.max and workers.chunk_size must be positive".into(),
            ));
        }
        for name in &self.filters {
            if !BUILTIN_FILTERS.contains(&name.as_str()) {
                return Err(MediaError::Config(format!("unknown filter {name:?}")));
            }
        }
        if self.filters.iter().any(|f| f == "resize") && self.resize.is_none() {
            return Err(MediaError::FilterArgument(
                "the resize filter is enabled but no resize spec is set".into(),
            ));
        }
        if let Some(path) = self.fixed_files.keys().find(|p| !p.starts_with('/')) {
            return Err(MediaError::Config(format!(
                "fixed file path {path:?} must start with '/'"
            )));
        }
        self.resize_spec()?;
        Ok(())
    }

    /// The parsed resize bounding box, if configured.
    pub fn resize_spec(&self) -> Result<Option<ResizeSpec>, MediaError> {
        self.resize.as_deref().map(ResizeSpec::parse).transpose()
    }
}
