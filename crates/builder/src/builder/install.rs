//! Install mapping for the final disk image.
//!
//! Computed once, after linking, from the manifest and the sources directory.

use crate::builder::manifest::{Manifest, Mode};
use crate::builder::stage::{CODE_EXT, STAGED_EXT, SYMBOL_EXT};
use std::fmt;
use std::path::Path;

/// File name of the linked disk image, relative to the build directory.
pub const DISK_IMAGE: &str = "Oberon.dsk";

/// Toolchain command that copies files onto a disk image.
pub const INSTALL_COMMAND: &str = "VDiskUtil.InstallFiles";

/// One `source=>destination` copy onto the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySpec {
    pub source: String,
    pub destination: String,
}

impl CopySpec {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Copy a file under its own name.
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            destination: name,
        }
    }
}

impl fmt::Display for CopySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=>{}", self.source, self.destination)
    }
}

/// Where the list of plain source files to install comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceListing {
    /// Every non-hidden file in the sources directory, sorted by name.
    Directory,
    /// The manifest's text and source entries plus recorded archive members.
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallMapping {
    pub image: String,
    pub copies: Vec<CopySpec>,
}

impl InstallMapping {
    /// Arguments for the install command, image first.
    pub fn args(&self) -> Vec<String> {
        std::iter::once(INSTALL_COMMAND.to_string())
            .chain(std::iter::once(self.image.clone()))
            .chain(self.copies.iter().map(ToString::to_string))
            .collect()
    }
}

/// Symbol file and compiled code for one module stem.
///
/// The linker consumed the staged `.rsx` form; it is installed back under the
/// canonical `.rsc` name.
fn compiled_artifacts(stem: &str) -> [CopySpec; 2] {
    [
        CopySpec::same(format!("{stem}.{SYMBOL_EXT}")),
        CopySpec::new(format!("{stem}.{STAGED_EXT}"), format!("{stem}.{CODE_EXT}")),
    ]
}

/// Sorted non-hidden file names directly inside `dir`.
pub fn list_sources(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        // Follows symlinks.
        if !entry.path().is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            if !name.starts_with('.') {
                names.push(name);
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Build the ordered install mapping.
pub fn mapping(
    manifest: &Manifest,
    listing: SourceListing,
    sources_dir: &Path,
) -> std::io::Result<InstallMapping> {
    let mut copies = Vec::new();

    match listing {
        SourceListing::Directory => {
            copies.extend(list_sources(sources_dir)?.into_iter().map(CopySpec::same));
            for stem in manifest.sources().filter_map(|e| e.module_stem()) {
                copies.extend(compiled_artifacts(stem));
            }
        }
        SourceListing::Manifest => {
            for entry in manifest.entries() {
                match entry.mode {
                    Mode::Text => copies.push(CopySpec::same(&entry.filename)),
                    Mode::Source => {
                        copies.push(CopySpec::same(&entry.filename));
                        if let Some(stem) = entry.module_stem() {
                            copies.extend(compiled_artifacts(stem));
                        }
                    }
                    Mode::Archive => {
                        copies.extend(entry.members().iter().map(CopySpec::same));
                    }
                }
            }
        }
    }

    Ok(InstallMapping {
        image: DISK_IMAGE.to_string(),
        copies,
    })
}
