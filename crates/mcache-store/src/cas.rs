//! # Content-Addressed Storage
//!
//! Stores media artifacts and their variants under a single flat directory.
//! File names are a pure function of the artifact [`Identity`] and the
//! [`CacheTag`], so resolution never consults an index.
//!
//! ## Write-Once Invariant
//!
//! Bytes are first written to a private temporary file and then hard-linked
//! to their final name. `link` fails with `AlreadyExists` when the name is
//! taken, so a slot file is never overwritten and a concurrent reader never
//! observes a partially written file. The loser of a race discards its copy
//! and reports [`WriteOutcome::AlreadyPresent`].
//!
//! ## Integrity
//!
//! The primary artifact's name encodes its SHA-256 digest.
//! [`verify()`](ContentAddressedStore::verify) recomputes the digest from the
//! stored bytes and compares in constant time.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use mcache_core::{sha256_digest, CacheTag, Identity, MediaError};
use subtle::ConstantTimeEq;
use tokio::fs;
use tokio::io::AsyncWriteExt;

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Result of a write-once store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// This call created the file.
    Created,
    /// The file already existed; the supplied bytes were discarded.
    AlreadyPresent,
}

impl WriteOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created)
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// The storage location of one identity: its primary artifact plus every
/// variant keyed by cache tag.
#[derive(Debug, Clone)]
pub struct Slot {
    base_dir: PathBuf,
    identity: Identity,
}

impl Slot {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Physical path of the file for `tag`. The file may not exist.
    pub fn path(&self, tag: &CacheTag) -> PathBuf {
        self.base_dir.join(self.identity.file_name(tag))
    }

    /// Path of the file for `tag` if it exists as a regular file.
    pub async fn resolve(&self, tag: &CacheTag) -> Result<Option<PathBuf>, MediaError> {
        let path = self.path(tag);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The first tag in `preference` whose file exists, with its path.
    pub async fn first_present(
        &self,
        preference: &[CacheTag],
    ) -> Result<Option<(CacheTag, PathBuf)>, MediaError> {
        for tag in preference {
            if let Some(path) = self.resolve(tag).await? {
                return Ok(Some((*tag, path)));
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// ContentAddressedStore
// ---------------------------------------------------------------------------

/// A content-addressed media store backed by the filesystem.
///
/// The store holds no state beyond its root directory and is cheap to clone.
#[derive(Debug, Clone)]
pub struct ContentAddressedStore {
    base_dir: PathBuf,
}

impl ContentAddressedStore {
    /// Create a store rooted at `base_dir`. The directory is created on the
    /// first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn slot(&self, identity: Identity) -> Slot {
        Slot {
            base_dir: self.base_dir.clone(),
            identity,
        }
    }

    /// Whether the primary artifact of `identity` is stored. Reads no content.
    pub async fn exists(&self, identity: &Identity) -> Result<bool, MediaError> {
        let path = self.base_dir.join(identity.file_name(&CacheTag::primary()));
        Ok(fs::try_exists(&path).await?)
    }

    /// Write `bytes` as the file for `(identity, tag)` unless it already
    /// exists. Never overwrites.
    pub async fn write(
        &self,
        identity: &Identity,
        tag: &CacheTag,
        bytes: &[u8],
    ) -> Result<WriteOutcome, MediaError> {
        let name = identity.file_name(tag);
        let outcome = write_once(&self.base_dir, &name, bytes).await?;
        tracing::debug!(file = %name, ?outcome, "store write");
        Ok(outcome)
    }

    /// Read the file for `(identity, tag)`. Returns `Ok(None)` when absent.
    pub async fn read(
        &self,
        identity: &Identity,
        tag: &CacheTag,
    ) -> Result<Option<Vec<u8>>, MediaError> {
        let path = self.base_dir.join(identity.file_name(tag));
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the file for `(identity, tag)` to a path for streaming.
    /// Returns `Ok(None)` when absent.
    pub async fn resolve_path(
        &self,
        identity: &Identity,
        tag: &CacheTag,
    ) -> Result<Option<PathBuf>, MediaError> {
        self.slot(*identity).resolve(tag).await
    }

    /// Recompute the digest of the primary artifact and compare it with the
    /// digest in its name.
    ///
    /// Returns `Ok(true)` when verified, `Ok(false)` when the artifact is not
    /// stored, and [`MediaError::Integrity`] on mismatch.
    pub async fn verify(&self, identity: &Identity) -> Result<bool, MediaError> {
        let Some(bytes) = self.read(identity, &CacheTag::primary()).await? else {
            return Ok(false);
        };
        let recomputed = sha256_digest(&bytes);
        if !bool::from(recomputed.as_bytes().ct_eq(identity.digest.as_bytes())) {
            return Err(MediaError::Integrity(format!(
                "{identity} has digest {}",
                recomputed.to_hex()
            )));
        }
        Ok(true)
    }
}

/// Create `dir/name` holding `bytes` unless that file already exists.
///
/// The file appears under its final name fully written or not at all, and an
/// existing file is never replaced. `dir` is created if missing.
pub async fn write_once(dir: &Path, name: &str, bytes: &[u8]) -> Result<WriteOutcome, MediaError> {
    let target = dir.join(name);
    if fs::try_exists(&target).await? {
        return Ok(WriteOutcome::AlreadyPresent);
    }
    fs::create_dir_all(dir).await?;

    let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let temp = dir.join(format!(".{name}.{}-{seq}.tmp", std::process::id()));
    let outcome = link_into_place(&temp, &target, bytes).await;
    if let Err(e) = fs::remove_file(&temp).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %temp.display(), error = %e, "failed to remove temporary file");
        }
    }
    outcome
}

async fn link_into_place(
    temp: &Path,
    target: &Path,
    bytes: &[u8],
) -> Result<WriteOutcome, MediaError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    match fs::hard_link(temp, target).await {
        Ok(()) => Ok(WriteOutcome::Created),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(WriteOutcome::AlreadyPresent),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mcache_core::{Encoding, MediaType};

    fn identity_of(bytes: &[u8], media_type: MediaType) -> Identity {
        Identity::new(sha256_digest(bytes), media_type)
    }

    #[tokio::test]
    async fn write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"png bytes", MediaType::Png);

        let outcome = cas.write(&id, &CacheTag::primary(), b"png bytes").await.unwrap();
        assert_eq!(outcome, WriteOutcome::Created);

        let read = cas.read(&id, &CacheTag::primary()).await.unwrap();
        assert_eq!(read.as_deref(), Some(&b"png bytes"[..]));
    }

    #[tokio::test]
    async fn second_write_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"first", MediaType::Jpg);
        let tag = CacheTag::format(MediaType::Webp);

        assert!(cas.write(&id, &tag, b"first").await.unwrap().is_created());
        let outcome = cas.write(&id, &tag, b"second").await.unwrap();
        assert_eq!(outcome, WriteOutcome::AlreadyPresent);

        let stored = cas.read(&id, &tag).await.unwrap().unwrap();
        assert_eq!(stored, b"first");
    }

    #[tokio::test]
    async fn missing_files_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"nothing", MediaType::Gif);

        assert!(!cas.exists(&id).await.unwrap());
        assert!(cas.read(&id, &CacheTag::primary()).await.unwrap().is_none());
        assert!(cas
            .resolve_path(&id, &CacheTag::primary())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn exists_tracks_primary_only() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"svg", MediaType::Svg);

        cas.write(&id, &CacheTag::format(MediaType::Svg), b"svg")
            .await
            .unwrap();
        assert!(!cas.exists(&id).await.unwrap());

        cas.write(&id, &CacheTag::primary(), b"svg").await.unwrap();
        assert!(cas.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn files_follow_naming_layout() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"vector", MediaType::Svg);
        let hex = id.digest.to_hex();
        let brotli = CacheTag::format(MediaType::Svg).with_encoding(Encoding::Brotli);

        cas.write(&id, &CacheTag::primary(), b"vector").await.unwrap();
        cas.write(&id, &brotli, b"compressed").await.unwrap();

        assert!(dir.path().join(format!("{hex}.svg")).is_file());
        assert!(dir.path().join(format!("{hex}.svg.svg.br")).is_file());
        let path = cas.resolve_path(&id, &brotli).await.unwrap().unwrap();
        assert_eq!(path, dir.path().join(format!("{hex}.svg.svg.br")));
    }

    #[tokio::test]
    async fn write_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"clean", MediaType::Png);

        cas.write(&id, &CacheTag::primary(), b"clean").await.unwrap();
        cas.write(&id, &CacheTag::primary(), b"clean").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![id.to_string()]);
    }

    #[tokio::test]
    async fn store_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("media");
        let cas = ContentAddressedStore::new(&nested);
        let id = identity_of(b"nested", MediaType::Png);

        cas.write(&id, &CacheTag::primary(), b"nested").await.unwrap();
        assert!(nested.join(id.to_string()).exists());
    }

    #[tokio::test]
    async fn verify_accepts_intact_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"intact", MediaType::Png);

        assert!(!cas.verify(&id).await.unwrap());
        cas.write(&id, &CacheTag::primary(), b"intact").await.unwrap();
        assert!(cas.verify(&id).await.unwrap());
    }

    #[tokio::test]
    async fn verify_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"original", MediaType::Png);

        cas.write(&id, &CacheTag::primary(), b"original").await.unwrap();
        std::fs::write(dir.path().join(id.to_string()), b"tampered").unwrap();

        let err = cas.verify(&id).await.unwrap_err();
        assert!(matches!(err, MediaError::Integrity(_)), "got: {err}");
    }

    #[tokio::test]
    async fn first_present_honors_preference_order() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"raster", MediaType::Png);
        let webp = CacheTag::format(MediaType::Webp);
        let png = CacheTag::format(MediaType::Png);

        cas.write(&id, &CacheTag::primary(), b"raster").await.unwrap();
        cas.write(&id, &png, b"smaller").await.unwrap();

        let slot = cas.slot(id);
        let (tag, path) = slot
            .first_present(&[webp, png, CacheTag::primary()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tag, png);
        assert_eq!(path, slot.path(&png));

        assert!(slot.first_present(&[webp]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn directory_at_slot_path_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let cas = ContentAddressedStore::new(dir.path());
        let id = identity_of(b"dir", MediaType::Png);

        std::fs::create_dir(dir.path().join(id.to_string())).unwrap();
        assert!(cas
            .resolve_path(&id, &CacheTag::primary())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn write_once_keeps_the_first_content() {
        let dir = tempfile::tempdir().unwrap();
        let videos = dir.path().join("video");

        let first = write_once(&videos, "clip.mp4", b"one").await.unwrap();
        let second = write_once(&videos, "clip.mp4", b"two").await.unwrap();
        assert_eq!(first, WriteOutcome::Created);
        assert_eq!(second, WriteOutcome::AlreadyPresent);
        assert_eq!(std::fs::read(videos.join("clip.mp4")).unwrap(), b"one");
    }
}
