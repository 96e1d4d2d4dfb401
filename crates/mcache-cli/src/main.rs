//! # mcache CLI entry point
//!
//! Parses command-line arguments, loads the configuration and dispatches to
//! the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mcache_cli::media::{run_resolve, run_save, run_verify, ResolveArgs, SaveArgs, VerifyArgs};
use mcache_cli::precompress::{run_precompress, PrecompressArgs};
use mcache_cli::serve::{run_serve, ServeArgs};
use mcache_core::MediaConfig;

/// Content-addressed media cache.
///
/// Ingests images once, pre-generates their delivery variants, precompresses
/// static trees and serves everything with content negotiation.
#[derive(Parser, Debug)]
#[command(name = "mcache", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true, env = "MCACHE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write brotli and gzip siblings for a static asset tree.
    Precompress(PrecompressArgs),

    /// Ingest an image and pre-generate its variants.
    Save(SaveArgs),

    /// Show the stored variant a client with the given capabilities gets.
    Resolve(ResolveArgs),

    /// Check a stored artifact against the digest in its name.
    Verify(VerifyArgs),

    /// Run the HTTP delivery service.
    Serve(ServeArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match MediaConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration rejected: {e}");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(media_root = %config.media_root.display(), "configuration loaded");

    let result = match cli.command {
        Commands::Precompress(args) => run_precompress(&args, &config),
        Commands::Save(args) => run_save(&args, &config),
        Commands::Resolve(args) => run_resolve(&args, &config),
        Commands::Verify(args) => run_verify(&args, &config),
        Commands::Serve(args) => run_serve(&args, config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_precompress_default_dir() {
        let cli = Cli::try_parse_from(["mcache", "precompress"]).unwrap();
        if let Commands::Precompress(args) = cli.command {
            assert!(args.dir.is_none());
        } else {
            panic!("expected precompress");
        }
    }

    #[test]
    fn cli_parse_save_with_type() {
        let cli = Cli::try_parse_from(["mcache", "save", "a.bin", "--type", "png"]).unwrap();
        if let Commands::Save(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("a.bin"));
            assert_eq!(args.media_type.as_deref(), Some("png"));
        } else {
            panic!("expected save");
        }
    }

    #[test]
    fn cli_parse_resolve_flags() {
        let cli = Cli::try_parse_from(["mcache", "resolve", "x.png", "--webp"]).unwrap();
        if let Commands::Resolve(args) = cli.command {
            assert_eq!(args.name, "x.png");
            assert!(args.webp);
            assert!(!args.brotli);
        } else {
            panic!("expected resolve");
        }
    }

    #[test]
    fn cli_parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["mcache", "verify", "x.png", "-vv", "--config", "m.yaml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("m.yaml")));
    }

    #[test]
    fn cli_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["mcache", "serve", "--port", "9000", "--no-precompress"])
            .unwrap();
        if let Commands::Serve(args) = cli.command {
            assert_eq!(args.port, Some(9000));
            assert!(args.no_precompress);
        } else {
            panic!("expected serve");
        }
    }

    #[test]
    fn cli_parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["mcache"]).is_err());
    }
}
