//! Disk image pipeline.
//!
//! Phases run strictly in order and the first failure ends the run. Each
//! phase writes into its own directory; the next one only reads it.
//!
//! ```text
//! BootstrapHost -> BuildCrossCompiler -> IsolateToolchains
//!     -> CompileTargets -> LinkDiskImage -> Install
//! ```

use crate::builder::install::{self, SourceListing, DISK_IMAGE};
use crate::builder::manifest::Manifest;
use crate::builder::stage::{self, UnitState, SYMBOL_EXT};
use crate::builder::toolchain::{self, SearchPath, Toolchain};
use crate::builder::vendor::{self, Transport};
use crate::config::{BuildConfig, BuildLayout};
use crate::error::{BuildError, PhaseError};
use std::fmt;
use std::path::{Path, PathBuf};

/// Modules of the self-hosted host toolchain, in compile order.
pub const HOST_MODULES: &[&str] = &[
    "Norebo.Mod",
    "Kernel.Mod",
    "FileDir.Mod",
    "Files.Mod",
    "Modules.Mod",
    "Fonts.Mod",
    "Texts.Mod",
    "RS232.Mod",
    "Oberon.Mod",
    "ORS.Mod",
    "ORB.Mod",
    "ORG.Mod",
    "ORP.Mod",
    "CoreLinker.Mod",
    "VDisk.Mod",
    "VFileDir.Mod",
    "VFiles.Mod",
    "VDiskUtil.Mod",
];

/// Compiler front and back end, rebuilt from the fetched sources.
pub const COMPILER_MODULES: &[&str] = &["ORS.Mod", "ORB.Mod", "ORG.Mod", "ORP.Mod"];

const SERIAL_LINK: [&str; 3] = ["CoreLinker.LinkSerial", "Modules", "InnerCore"];
const DISK_LINK: [&str; 3] = ["CoreLinker.LinkDisk", "Modules", DISK_IMAGE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchSources,
    BootstrapHost,
    BuildCrossCompiler,
    IsolateToolchains,
    CompileTargets,
    LinkDiskImage,
    Install,
}

impl Phase {
    fn banner(self) -> &'static str {
        match self {
            Self::FetchSources => "Downloading sources",
            Self::BootstrapHost => "Building norebo",
            Self::BuildCrossCompiler => "Building a cross-compiler",
            Self::IsolateToolchains => "Removing host symbol files",
            Self::CompileTargets => "Compiling the complete Project Oberon 2013",
            Self::LinkDiskImage => "Linking the Inner Core",
            Self::Install => "Installing files",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FetchSources => "FetchSources",
            Self::BootstrapHost => "BootstrapHost",
            Self::BuildCrossCompiler => "BuildCrossCompiler",
            Self::IsolateToolchains => "IsolateToolchains",
            Self::CompileTargets => "CompileTargets",
            Self::LinkDiskImage => "LinkDiskImage",
            Self::Install => "Install",
        })
    }
}

fn step(phase: Phase, work: impl FnOnce() -> Result<(), PhaseError>) -> Result<(), BuildError> {
    tracing::info!("{}", phase.banner());
    work().map_err(|source| BuildError::Phase { phase, source })
}

/// One run of the build phases over a created [`BuildLayout`].
pub struct Pipeline<'a, T: Toolchain + ?Sized> {
    config: &'a BuildConfig,
    layout: &'a BuildLayout,
    toolchain: &'a T,
    listing: SourceListing,
}

impl<'a, T: Toolchain + ?Sized> Pipeline<'a, T> {
    pub fn new(
        config: &'a BuildConfig,
        layout: &'a BuildLayout,
        toolchain: &'a T,
        listing: SourceListing,
    ) -> Self {
        Self {
            config,
            layout,
            toolchain,
            listing,
        }
    }

    /// Run every phase from `BootstrapHost` through `Install`.
    pub fn run(&self, manifest: &Manifest) -> Result<PathBuf, BuildError> {
        step(Phase::BootstrapHost, || self.bootstrap_host())?;
        step(Phase::BuildCrossCompiler, || self.build_cross_compiler())?;
        step(Phase::IsolateToolchains, || self.isolate_toolchains())?;
        step(Phase::CompileTargets, || self.compile_targets(manifest))?;
        step(Phase::LinkDiskImage, || self.link_disk_image())?;
        step(Phase::Install, || self.install(manifest))?;

        let image = self.layout.image();
        tracing::info!("All done! Finished disk image is {}", image.display());
        Ok(image)
    }

    /// Search path for work against freshly fetched sources.
    fn cross_path(&self) -> SearchPath {
        let l = self.layout;
        SearchPath::new([&l.sources, &l.compiler, &l.norebo])
    }

    fn bootstrap_host(&self) -> Result<(), PhaseError> {
        let dir = &self.layout.norebo;
        let roots = SearchPath::new(self.config.bootstrap_roots());
        toolchain::compile(self.toolchain, HOST_MODULES, dir, &roots)?;

        stage::transition(dir, UnitState::Active, UnitState::Staged)?;
        let link_roots = SearchPath::new(self.config.link_roots());
        toolchain::run(self.toolchain, &SERIAL_LINK, dir, &link_roots)?;
        stage::transition(dir, UnitState::Staged, UnitState::Active)?;
        Ok(())
    }

    fn build_cross_compiler(&self) -> Result<(), PhaseError> {
        toolchain::compile(
            self.toolchain,
            COMPILER_MODULES,
            &self.layout.compiler,
            &self.cross_path(),
        )?;
        Ok(())
    }

    // Target modules must only see symbol files they compile themselves.
    fn isolate_toolchains(&self) -> Result<(), PhaseError> {
        stage::bulk_delete(&self.layout.norebo, SYMBOL_EXT)?;
        stage::bulk_delete(&self.layout.compiler, SYMBOL_EXT)?;
        Ok(())
    }

    fn compile_targets(&self, manifest: &Manifest) -> Result<(), PhaseError> {
        let modules: Vec<&str> = manifest.sources().map(|e| e.filename.as_str()).collect();
        if modules.is_empty() {
            tracing::warn!("Manifest has no source entries; nothing to compile");
            return Ok(());
        }
        toolchain::compile(self.toolchain, &modules, &self.layout.oberon, &self.cross_path())?;
        Ok(())
    }

    fn link_disk_image(&self) -> Result<(), PhaseError> {
        let l = self.layout;
        let staged = stage::transition(&l.oberon, UnitState::Active, UnitState::Staged)?;
        tracing::debug!("Staged {} units for the disk linker", staged.len());
        toolchain::run(
            self.toolchain,
            &DISK_LINK,
            &l.target,
            &SearchPath::new([&l.oberon, &l.norebo]),
        )?;
        Ok(())
    }

    fn install(&self, manifest: &Manifest) -> Result<(), PhaseError> {
        let l = self.layout;
        let mapping = install::mapping(manifest, self.listing, &l.sources).map_err(|source| {
            PhaseError::Io {
                path: l.sources.clone(),
                source,
            }
        })?;
        tracing::debug!("Installing {} files", mapping.copies.len());
        self.toolchain.invoke(
            &mapping.args(),
            &l.target,
            &SearchPath::new([&l.oberon, &l.sources, &l.norebo]),
        )?;
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn require_absent(path: &Path) -> Result<(), BuildError> {
    if path.exists() {
        return Err(BuildError::AlreadyExists(path.to_path_buf()));
    }
    Ok(())
}

/// Build an image from an existing sources directory into `<root>/build`.
pub fn build_image<T: Toolchain + ?Sized>(
    config: &BuildConfig,
    manifest: &Manifest,
    sources: &Path,
    toolchain: &T,
) -> Result<PathBuf, BuildError> {
    if !sources.exists() {
        return Err(BuildError::NotFound(sources.to_path_buf()));
    }
    if !sources.is_dir() {
        return Err(BuildError::NotADirectory(sources.to_path_buf()));
    }
    let target = config.image_build_dir();
    require_absent(&target)?;

    let sources = sources.canonicalize().map_err(io_err(sources))?;
    let layout = BuildLayout::with_sources(&target, &sources);
    layout.create(false).map_err(io_err(&target))?;

    Pipeline::new(config, &layout, toolchain, SourceListing::Directory).run(manifest)
}

/// Fetch the manifest into `<target>/sources`, then build the image in `target`.
pub fn build_all<T, N>(
    config: &BuildConfig,
    manifest: &mut Manifest,
    target: &Path,
    toolchain: &T,
    transport: &N,
) -> Result<PathBuf, BuildError>
where
    T: Toolchain + ?Sized,
    N: Transport + ?Sized,
{
    require_absent(target)?;
    let target = std::path::absolute(target).map_err(io_err(target))?;
    let layout = BuildLayout::self_contained(&target);
    layout.create(true).map_err(io_err(&target))?;

    step(Phase::FetchSources, || {
        Ok(vendor::fetch_into(manifest, &layout.sources, transport)?)
    })?;
    Pipeline::new(config, &layout, toolchain, SourceListing::Manifest).run(manifest)
}

/// Fetch the manifest into a new directory without building anything.
pub fn fetch_sources<N: Transport + ?Sized>(
    manifest: &mut Manifest,
    target: &Path,
    transport: &N,
) -> Result<usize, BuildError> {
    require_absent(target)?;
    step(Phase::FetchSources, || Ok(vendor::fetch(manifest, target, transport)?))?;
    Ok(vendor::fetched_files(manifest, target).count())
}
