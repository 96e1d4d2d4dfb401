//! # Pre-Generation Cache Service
//!
//! `save` derives every variant of a new image once; `get` picks the best
//! variant that exists. The two never meet: a missing variant on the read
//! path means "serve the next best", never "build it now".

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use mcache_compress::codec::{brotli_compress, BROTLI_QUALITY};
use mcache_core::{
    sha256_digest, CacheTag, Encoding, Identity, MediaConfig, MediaError, MediaType,
};
use mcache_store::ContentAddressedStore;
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, Span};

use crate::filter::{FilterOutcome, FilterRegistry, ImageFilter};
use crate::ingest::{prepare, validate_declared};
use crate::svg::SvgMinifier;

/// Where the selected variant of an artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantLocation {
    pub path: PathBuf,
    pub tag: CacheTag,
    /// Type of the (decoded) content in the file.
    pub media_type: MediaType,
    /// Content encoding applied to the file, if any.
    pub encoding: Option<Encoding>,
}

/// Cache tags to try for `identity`, best first, ending with the primary.
///
/// - SVG: `{svg, brotli}` when compression is accepted, then `{svg}`.
/// - Raster: `{webp}` when modern formats are accepted, then `{T}`.
pub fn variant_plan(identity: &Identity, modern: bool, compressed: bool) -> Vec<CacheTag> {
    let mut plan = Vec::with_capacity(3);
    let own = CacheTag::format(identity.media_type);
    if identity.media_type.is_vector() {
        if compressed {
            plan.push(own.with_encoding(Encoding::Brotli));
        }
    } else if modern {
        plan.push(CacheTag::format(MediaType::Webp));
    }
    plan.push(own);
    plan.push(CacheTag::primary());
    plan
}

/// Ingests media into a [`ContentAddressedStore`] and pre-builds variants.
#[derive(Debug, Clone)]
pub struct PreGenerationService {
    store: ContentAddressedStore,
    registry: Arc<FilterRegistry>,
    svg_compress_threshold: usize,
    span: Span,
}

impl PreGenerationService {
    pub fn new(store: ContentAddressedStore, registry: FilterRegistry) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            svg_compress_threshold: mcache_core::config::DEFAULT_SVG_COMPRESS_THRESHOLD,
            span: tracing::info_span!("image_service"),
        }
    }

    /// Build the service over `config.media_root` with the configured filters.
    pub fn from_config(config: &MediaConfig) -> Result<Self, MediaError> {
        let registry = FilterRegistry::from_config(config)?;
        Ok(Self::new(ContentAddressedStore::new(&config.media_root), registry)
            .with_svg_compress_threshold(config.svg_compress_threshold))
    }

    /// Emit every event of this service inside `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Optimized SVGs strictly larger than `threshold` bytes get a brotli
    /// variant.
    pub fn with_svg_compress_threshold(mut self, threshold: usize) -> Self {
        self.svg_compress_threshold = threshold;
        self
    }

    pub fn store(&self) -> &ContentAddressedStore {
        &self.store
    }

    /// Validate, normalize and store `bytes`, building all variants when the
    /// content is new. Returns the identity whether or not it already existed.
    ///
    /// Invalid input fails before anything is written.
    pub async fn save(&self, bytes: Vec<u8>, declared: &str) -> Result<Identity, MediaError> {
        self.save_inner(bytes, declared)
            .instrument(self.span.clone())
            .await
    }

    async fn save_inner(&self, bytes: Vec<u8>, declared: &str) -> Result<Identity, MediaError> {
        let declared = validate_declared(declared)?;
        let prepared = tokio::task::spawn_blocking(move || prepare(bytes, declared))
            .await
            .map_err(join_error)??;
        let identity = Identity::new(sha256_digest(&prepared.bytes), prepared.media_type);

        if self.store.exists(&identity).await? {
            tracing::debug!(name = %identity, "image already stored, skipping processing");
            return Ok(identity);
        }

        let started = Instant::now();
        let bytes: Arc<[u8]> = prepared.bytes.into();
        let variants = self.build_variants(&identity, Arc::clone(&bytes)).await?;

        if !self
            .store
            .write(&identity, &CacheTag::primary(), &bytes)
            .await?
            .is_created()
        {
            tracing::debug!(name = %identity, "concurrent save stored the image first");
            return Ok(identity);
        }

        let mut writes = JoinSet::new();
        for (tag, output) in variants {
            let store = self.store.clone();
            writes.spawn(async move { store.write(&identity, &tag, &output).await });
        }
        while let Some(written) = writes.join_next().await {
            written.map_err(join_error)??;
        }

        tracing::info!(
            name = %identity,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "processed new image"
        );
        Ok(identity)
    }

    /// Run every transform for `identity` concurrently. Unhandlable variants
    /// are dropped; a fatal outcome fails the whole build.
    async fn build_variants(
        &self,
        identity: &Identity,
        bytes: Arc<[u8]>,
    ) -> Result<Vec<(CacheTag, Vec<u8>)>, MediaError> {
        let mut jobs = JoinSet::new();

        if identity.media_type.is_vector() {
            let threshold = self.svg_compress_threshold;
            let tag = CacheTag::format(MediaType::Svg);
            jobs.spawn_blocking(move || {
                let minified = match SvgMinifier.apply(&bytes, &tag) {
                    FilterOutcome::Produced(out) => out,
                    other => return vec![(tag, other)],
                };
                let mut outcomes = Vec::with_capacity(2);
                if minified.len() > threshold {
                    let encoded = match brotli_compress(&minified, BROTLI_QUALITY) {
                        Ok(out) => FilterOutcome::Produced(out),
                        Err(e) => FilterOutcome::Unhandlable(e.to_string()),
                    };
                    outcomes.push((tag.with_encoding(Encoding::Brotli), encoded));
                }
                outcomes.push((tag, FilterOutcome::Produced(minified)));
                outcomes
            });
        } else {
            for tag in [
                CacheTag::format(identity.media_type),
                CacheTag::format(MediaType::Webp),
            ] {
                let registry = Arc::clone(&self.registry);
                let bytes = Arc::clone(&bytes);
                jobs.spawn_blocking(move || vec![(tag, registry.run(&bytes, &tag))]);
            }
        }

        let mut variants = Vec::new();
        while let Some(finished) = jobs.join_next().await {
            for (tag, outcome) in finished.map_err(join_error)? {
                match outcome {
                    FilterOutcome::Produced(out) => variants.push((tag, out)),
                    FilterOutcome::Unhandlable(reason) => {
                        tracing::warn!(name = %identity, %tag, %reason, "skipped variant");
                    }
                    FilterOutcome::Fatal(e) => return Err(e),
                }
            }
        }
        Ok(variants)
    }

    /// Resolve the best stored variant of `identity`.
    ///
    /// `modern` means the client accepts WebP; `compressed` means it accepts
    /// brotli. Returns `Ok(None)` only when the primary artifact is absent.
    pub async fn get(
        &self,
        identity: &Identity,
        modern: bool,
        compressed: bool,
    ) -> Result<Option<VariantLocation>, MediaError> {
        let plan = variant_plan(identity, modern, compressed);
        let found = self.store.slot(*identity).first_present(&plan).await?;
        Ok(found.map(|(tag, path)| VariantLocation {
            path,
            tag,
            media_type: tag.format.unwrap_or(identity.media_type),
            encoding: tag.encoding,
        }))
    }
}

fn join_error(e: JoinError) -> MediaError {
    MediaError::Io(std::io::Error::other(format!("background task failed: {e}")))
}
