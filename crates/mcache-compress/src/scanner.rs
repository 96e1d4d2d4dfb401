//! Asset tree scanner for precompression.

use std::path::{Path, PathBuf};

use mcache_core::MediaConfig;
use walkdir::WalkDir;

use crate::error::CompressError;

/// A candidate file and its size, used only for scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
}

/// Walks a static root and collects compressible files.
///
/// A file qualifies when its extension is in the configured list and it is
/// at least `min_size` bytes. Existing `.br` / `.gz` siblings never qualify
/// because those extensions are not compressible types.
#[derive(Debug, Clone)]
pub struct AssetScanner {
    root: PathBuf,
    extensions: Vec<String>,
    min_size: u64,
    follow_links: bool,
}

impl AssetScanner {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String], min_size: u64) -> Self {
        Self {
            root: root.into(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            min_size,
            follow_links: false,
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &MediaConfig) -> Self {
        Self::new(root, &config.compress_extensions, config.min_compress_size)
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Scan the tree. Order follows directory traversal and is not sorted.
    pub fn scan(&self) -> Result<Vec<FileInfo>, CompressError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(self.follow_links) {
            let entry = entry?;
            if !entry.file_type().is_file() || !self.has_compressible_extension(entry.path()) {
                continue;
            }
            let size = entry.metadata()?.len();
            if size < self.min_size {
                continue;
            }
            files.push(FileInfo {
                path: entry.into_path(),
                size,
            });
        }
        Ok(files)
    }

    fn has_compressible_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn extensions() -> Vec<String> {
        ["js", "css", "svg", "html", "xml"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn finds_compressible_files_above_threshold() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.css"), "a".repeat(2048)).unwrap();
        fs::write(dir.path().join("app.js"), "b".repeat(1024)).unwrap();
        fs::write(dir.path().join("small.js"), "c".repeat(1023)).unwrap();
        fs::write(dir.path().join("photo.png"), vec![0u8; 4096]).unwrap();

        let mut files = AssetScanner::new(dir.path(), &extensions(), 1024).scan().unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(files.len(), 2);
        assert!(files[0].path.ends_with("app.css"));
        assert_eq!(files[0].size, 2048);
        assert!(files[1].path.ends_with("app.js"));
    }

    #[test]
    fn recurses_and_ignores_existing_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("assets").join("css");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("site.CSS"), "x".repeat(4096)).unwrap();
        fs::write(sub.join("site.CSS.br"), "x".repeat(4096)).unwrap();
        fs::write(sub.join("site.CSS.gz"), "x".repeat(4096)).unwrap();

        let files = AssetScanner::new(dir.path(), &extensions(), 1024).scan().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("assets/css/site.CSS"));
    }

    #[test]
    fn missing_root_is_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AssetScanner::new(dir.path().join("absent"), &extensions(), 1)
            .scan()
            .unwrap_err();
        assert!(matches!(err, CompressError::Scan(_)));
    }
}
