//! Build configuration.
//!
//! A [`BuildConfig`] is constructed once (by the CLI, or by a test) and passed
//! explicitly into every stage. Nothing reads global state.

use std::path::{Path, PathBuf};

/// File name of the manifest inside the toolchain root.
pub const MANIFEST_FILE: &str = "manifest.csv";

/// Name of the toolchain executable inside the toolchain root.
pub const TOOLCHAIN_BINARY: &str = "norebo";

/// Directory under the root used by image-build mode.
pub const BUILD_DIR: &str = "build";

/// Default HTTP user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("norebo-builder/", env!("CARGO_PKG_VERSION"));

/// Source roots the host toolchain is bootstrapped from, relative to the root.
const BOOTSTRAP_ROOTS: [&str; 3] = ["Norebo", "Oberon", "Bootstrap"];

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Toolchain root: holds the `norebo` binary and the bootstrap sources.
    pub root: PathBuf,
    /// Manifest of sources to fetch and compile.
    pub manifest: PathBuf,
    pub user_agent: String,
}

impl BuildConfig {
    /// Configuration rooted at `root`, with the manifest at its default location.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let manifest = root.join(MANIFEST_FILE);
        Self {
            root,
            manifest,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    #[must_use]
    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = manifest.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn toolchain_binary(&self) -> PathBuf {
        self.root.join(TOOLCHAIN_BINARY)
    }

    /// `Norebo`, `Oberon` and `Bootstrap` under the root, in search order.
    pub fn bootstrap_roots(&self) -> [PathBuf; 3] {
        BOOTSTRAP_ROOTS.map(|dir| self.root.join(dir))
    }

    /// Runtime support and prebuilt seed only; used by the serial link.
    pub fn link_roots(&self) -> [PathBuf; 2] {
        [
            self.root.join(BOOTSTRAP_ROOTS[0]),
            self.root.join(BOOTSTRAP_ROOTS[2]),
        ]
    }

    pub fn image_build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }
}

/// Directories of one pipeline run.
///
/// Every directory except `sources` in image-build mode is created fresh by
/// [`BuildLayout::create`].
#[derive(Debug, Clone)]
pub struct BuildLayout {
    /// Top-level build directory; the disk image lands here.
    pub target: PathBuf,
    pub sources: PathBuf,
    /// Bootstrapped host toolchain.
    pub norebo: PathBuf,
    /// Cross-compiler output.
    pub compiler: PathBuf,
    /// Compiled target modules.
    pub oberon: PathBuf,
}

impl BuildLayout {
    /// Layout for a build from an existing sources directory.
    pub fn with_sources(target: &Path, sources: &Path) -> Self {
        Self {
            target: target.to_path_buf(),
            sources: sources.to_path_buf(),
            norebo: target.join("norebo"),
            compiler: target.join("compiler"),
            oberon: target.join("oberon"),
        }
    }

    /// Layout for a combined fetch and build; sources live inside the target.
    pub fn self_contained(target: &Path) -> Self {
        Self::with_sources(target, &target.join("sources"))
    }

    /// The finished disk image.
    pub fn image(&self) -> PathBuf {
        self.target.join(crate::builder::install::DISK_IMAGE)
    }

    /// Create the phase directories. Fails if any already exists.
    pub fn create(&self, include_sources: bool) -> std::io::Result<()> {
        std::fs::create_dir(&self.target)?;
        if include_sources {
            std::fs::create_dir(&self.sources)?;
        }
        for dir in [&self.norebo, &self.compiler, &self.oberon] {
            std::fs::create_dir(dir)?;
        }
        Ok(())
    }
}
