//! # Media Subcommands
//!
//! `save`, `resolve` and `verify` operate directly on the configured
//! `media_root`, without a running server.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use mcache_core::{Identity, MediaConfig, MediaError};
use mcache_image::PreGenerationService;
use mcache_store::ContentAddressedStore;

use crate::runtime;

/// Arguments for `mcache save`.
#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Image file to ingest.
    pub file: PathBuf,

    /// Declared type (`png`, `jpeg`, `image/svg+xml`, ...). Defaults to the
    /// file extension.
    #[arg(long = "type", value_name = "TYPE")]
    pub media_type: Option<String>,
}

/// Arguments for `mcache resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Artifact name, `<hash>.<type>`.
    pub name: String,

    /// Client accepts WebP.
    #[arg(long)]
    pub webp: bool,

    /// Client accepts brotli.
    #[arg(long)]
    pub brotli: bool,
}

/// Arguments for `mcache verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Artifact name, `<hash>.<type>`.
    pub name: String,
}

fn declared_type(args: &SaveArgs) -> Result<String> {
    if let Some(declared) = &args.media_type {
        return Ok(declared.clone());
    }
    extension_of(&args.file)
        .with_context(|| format!("cannot infer type of {}; pass --type", args.file.display()))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Execute the save subcommand: prints the artifact name.
pub fn run_save(args: &SaveArgs, config: &MediaConfig) -> Result<u8> {
    let declared = declared_type(args)?;
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let service = PreGenerationService::from_config(config)?;

    let identity = runtime()?
        .block_on(service.save(bytes, &declared))
        .with_context(|| format!("failed to save {}", args.file.display()))?;
    println!("{identity}");
    Ok(0)
}

/// Execute the resolve subcommand: prints the variant path, or exits with 1
/// when nothing is stored under the name.
pub fn run_resolve(args: &ResolveArgs, config: &MediaConfig) -> Result<u8> {
    let identity: Identity = args.name.parse()?;
    let service = PreGenerationService::from_config(config)?;

    match runtime()?.block_on(service.get(&identity, args.webp, args.brotli))? {
        Some(location) => {
            println!("  path:     {}", location.path.display());
            println!("  type:     {}", location.media_type.mime());
            if let Some(encoding) = location.encoding {
                println!("  encoding: {}", encoding.content_encoding());
            }
            Ok(0)
        }
        None => {
            eprintln!("not found: {}", args.name);
            Ok(1)
        }
    }
}

/// Execute the verify subcommand.
///
/// Exit codes: 0 verified, 1 not stored, 2 digest mismatch.
pub fn run_verify(args: &VerifyArgs, config: &MediaConfig) -> Result<u8> {
    let identity: Identity = args.name.parse()?;
    let store = ContentAddressedStore::new(&config.media_root);

    match runtime()?.block_on(store.verify(&identity)) {
        Ok(true) => {
            println!("OK {identity}");
            Ok(0)
        }
        Ok(false) => {
            eprintln!("MISSING {identity}");
            Ok(1)
        }
        Err(MediaError::Integrity(detail)) => {
            eprintln!("CORRUPT {detail}");
            Ok(2)
        }
        Err(e) => Err(e.into()),
    }
}
