//! Build system for the Oberon disk image.
//!
//! Structure:
//! - `manifest` - Source manifest (CSV) model
//! - `vendor` - Source fetching and archive extraction
//! - `stage` - Bulk extension rename/delete between phases
//! - `toolchain` - `norebo` invocation
//! - `image` - Phase sequencing
//! - `install` - Install mapping for the finished image

pub mod image;
pub mod install;
pub mod manifest;
pub mod stage;
pub mod toolchain;
pub mod vendor;

use clap::Subcommand;
use std::path::PathBuf;

/// Build commands for the CLI.
#[derive(Subcommand)]
pub enum BuildCommands {
    /// Fetch sources and build the disk image (TARGET must not exist)
    All {
        /// Directory to create for sources and build output
        target: PathBuf,
    },
    /// Build the disk image from an already fetched sources directory
    Image {
        /// Directory holding the fetched sources
        sources: PathBuf,
    },
    /// Fetch sources only (TARGET must not exist)
    Fetch {
        /// Directory to download the sources into
        target: PathBuf,
    },
}
