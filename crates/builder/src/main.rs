//! # norebo-build
//!
//! Rebuild the Project Oberon 2013 disk image with the norebo toolchain.
//!
//! ## Usage
//!
//! ```bash
//! norebo-build all TARGET      # Fetch sources + build TARGET/Oberon.dsk
//! norebo-build image SOURCES   # Build build/Oberon.dsk from fetched SOURCES
//! norebo-build fetch TARGET    # Fetch sources into TARGET only
//! ```
//!
//! TARGET must not exist yet. The toolchain root (holding the `norebo`
//! binary and its `Norebo/`, `Oberon/` and `Bootstrap/` trees) comes from
//! `--root` or `NOREBO_ROOT`.

use anyhow::{Context, Result};
use clap::Parser;
use norebo_builder::builder::{image, BuildCommands};
use norebo_builder::config::DEFAULT_USER_AGENT;
use norebo_builder::{BuildConfig, BuildError, HttpTransport, Manifest, Norebo};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "norebo-build", about = "Project Oberon 2013 disk image builder")]
struct Cli {
    /// Enable debug log output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Toolchain root directory
    #[arg(long, global = true, env = "NOREBO_ROOT", default_value = ".")]
    root: PathBuf,

    /// Source manifest [default: <root>/manifest.csv]
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// User-Agent header for source downloads
    #[arg(long, global = true, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    #[command(subcommand)]
    command: BuildCommands,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("Toolchain root {} not found", cli.root.display()))?;
    let mut config = BuildConfig::new(root).with_user_agent(cli.user_agent);
    if let Some(manifest) = cli.manifest {
        config = config.with_manifest(manifest);
    }

    let mut manifest = Manifest::load(&config.manifest)
        .with_context(|| format!("Loading {}", config.manifest.display()))?;
    tracing::debug!("Loaded {} manifest entries", manifest.len());

    let result = match cli.command {
        BuildCommands::All { target } => {
            let norebo = Norebo::new(config.toolchain_binary());
            let transport = HttpTransport::new(&config.user_agent)?;
            image::build_all(&config, &mut manifest, &target, &norebo, &transport).map(|_| ())
        }
        BuildCommands::Image { sources } => {
            let norebo = Norebo::new(config.toolchain_binary());
            image::build_image(&config, &manifest, &sources, &norebo).map(|_| ())
        }
        BuildCommands::Fetch { target } => {
            let transport = HttpTransport::new(&config.user_agent)?;
            image::fetch_sources(&mut manifest, &target, &transport).map(|count| {
                tracing::info!("Fetched {count} files into {}", target.display());
            })
        }
    };

    match result {
        Err(err) if err.is_precondition() => precondition_failed(&err),
        other => other.map_err(Into::into),
    }
}

fn precondition_failed(err: &BuildError) -> ! {
    tracing::error!("norebo-build: {err}");
    std::process::exit(1);
}
