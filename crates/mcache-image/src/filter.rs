//! # Variant Filters
//!
//! A filter turns input bytes into the bytes of one variant. Filters are
//! selected per [`CacheTag`] through [`ImageFilter::accepts`] and chained in
//! registry order: each accepting filter receives the previous one's output.
//!
//! The registry is an explicit value built by the caller and handed to the
//! service at construction. There is no process-wide filter table.

use std::sync::Arc;

use mcache_core::{CacheTag, MediaConfig, MediaError};

use crate::filters::{CodingFilter, ResizeFilter, WebpFilter};

/// Result of applying a filter.
#[derive(Debug)]
pub enum FilterOutcome {
    /// The transformed bytes.
    Produced(Vec<u8>),
    /// The filter cannot represent this content. The variant is skipped.
    Unhandlable(String),
    /// The input itself is broken. The whole save fails.
    Fatal(MediaError),
}

impl FilterOutcome {
    pub fn is_produced(&self) -> bool {
        matches!(self, Self::Produced(_))
    }
}

/// A transform producing one variant representation.
pub trait ImageFilter: Send + Sync {
    /// Whether this filter participates in building the variant for `tag`.
    fn accepts(&self, tag: &CacheTag) -> bool;

    /// Transform `input` toward the variant described by `tag`.
    fn apply(&self, input: &[u8], tag: &CacheTag) -> FilterOutcome;
}

/// Ordered mapping of filter names to filters.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: Vec<(String, Arc<dyn ImageFilter>)>,
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter. A filter registered under an existing name replaces
    /// it in place.
    pub fn register(mut self, name: impl Into<String>, filter: Arc<dyn ImageFilter>) -> Self {
        let name = name.into();
        match self.filters.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = filter,
            None => self.filters.push((name, filter)),
        }
        self
    }

    /// Build the registry named by `config.filters`, in that order.
    pub fn from_config(config: &MediaConfig) -> Result<Self, MediaError> {
        let mut registry = Self::new();
        for name in &config.filters {
            let filter: Arc<dyn ImageFilter> = match name.as_str() {
                "coding" => Arc::new(CodingFilter::default()),
                "webp" => Arc::new(WebpFilter),
                "resize" => {
                    let spec = config.resize_spec()?.ok_or_else(|| {
                        MediaError::FilterArgument("resize filter needs a WxH spec".into())
                    })?;
                    Arc::new(ResizeFilter::new(spec))
                }
                other => {
                    return Err(MediaError::Config(format!("unknown filter {other:?}")));
                }
            };
            registry = registry.register(name.clone(), filter);
        }
        Ok(registry)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run every accepting filter over `input`, in registry order.
    ///
    /// A tag no filter accepts is `Unhandlable`: storing the untouched input
    /// under a format tag would mislabel its content.
    pub fn run(&self, input: &[u8], tag: &CacheTag) -> FilterOutcome {
        let mut current: Option<Vec<u8>> = None;
        for (name, filter) in &self.filters {
            if !filter.accepts(tag) {
                continue;
            }
            let bytes = current.as_deref().unwrap_or(input);
            match filter.apply(bytes, tag) {
                FilterOutcome::Produced(out) => current = Some(out),
                FilterOutcome::Unhandlable(reason) => {
                    return FilterOutcome::Unhandlable(format!("{name}: {reason}"));
                }
                fatal @ FilterOutcome::Fatal(_) => return fatal,
            }
        }
        match current {
            Some(out) => FilterOutcome::Produced(out),
            None => FilterOutcome::Unhandlable(format!("no filter builds {tag}")),
        }
    }
}
