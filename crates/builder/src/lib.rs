//! # norebo-builder
//!
//! Rebuilds a bootable Project Oberon 2013 disk image from source.
//!
//! The sources listed in a manifest are downloaded, a host toolchain is
//! bootstrapped with the external `norebo` runtime, a cross-compiler is built
//! from the downloaded compiler sources, and every module is compiled, linked
//! into an inner core and installed onto `Oberon.dsk`.
//!
//! All stages communicate through directories only, and every stage is
//! fail-fast: the first error ends the run.

pub mod builder;
pub mod config;
pub mod error;

pub use builder::image::{build_all, build_image, fetch_sources, Phase, Pipeline};
pub use builder::manifest::{Manifest, ManifestEntry, Mode};
pub use builder::toolchain::{Norebo, SearchPath, Toolchain};
pub use builder::vendor::{HttpTransport, Response, Transport};
pub use config::{BuildConfig, BuildLayout};
pub use error::BuildError;
