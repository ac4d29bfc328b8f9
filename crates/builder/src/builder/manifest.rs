//! Source manifest.
//!
//! The manifest is a CSV file with a `filename,url,mode` header. Row order is
//! significant: it fixes compile order and install order.

use crate::error::{FetchError, ManifestError};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Extension of Oberon module sources.
pub const MODULE_SUFFIX: &str = ".Mod";

/// How a manifest entry is handled after download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Plain text, installed as-is after line terminator normalization.
    Text,
    /// A module source: normalized, installed, and compiled.
    Source,
    /// A zip archive whose members are extracted flat.
    Archive,
}

impl Mode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "source" => Some(Self::Source),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Source => "source",
            Self::Archive => "archive",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub filename: String,
    pub url: String,
    pub mode: Mode,
    members: Option<Vec<String>>,
}

impl ManifestEntry {
    pub fn new(filename: impl Into<String>, url: impl Into<String>, mode: Mode) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            mode,
            members: None,
        }
    }

    /// Extracted archive members in archive order. Empty until fetched.
    pub fn members(&self) -> &[String] {
        self.members.as_deref().unwrap_or_default()
    }

    /// Record the extracted members. Allowed once per entry.
    pub(crate) fn set_members(&mut self, members: Vec<String>) -> Result<(), FetchError> {
        if self.members.is_some() {
            return Err(FetchError::MembersAlreadySet(self.filename.clone()));
        }
        self.members = Some(members);
        Ok(())
    }

    /// Module name with the `.Mod` suffix removed, for source entries.
    pub fn module_stem(&self) -> Option<&str> {
        match self.mode {
            Mode::Source => self.filename.strip_suffix(MODULE_SUFFIX),
            _ => None,
        }
    }
}

/// Column positions resolved from the header row.
struct Columns {
    filename: usize,
    url: usize,
    mode: usize,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, ManifestError> {
        let find = |field: &'static str| {
            headers
                .iter()
                .position(|h| h == field)
                .ok_or(ManifestError::MissingField { line: 1, field })
        };
        Ok(Self {
            filename: find("filename")?,
            url: find("url")?,
            mode: find("mode")?,
        })
    }
}

fn required<'r>(
    record: &'r csv::StringRecord,
    column: usize,
    line: u64,
    field: &'static str,
) -> Result<&'r str, ManifestError> {
    match record.get(column) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ManifestError::MissingField { line, field }),
    }
}

/// Ordered list of manifest entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Load and validate the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let file = std::fs::File::open(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader(input: impl Read) -> Result<Self, ManifestError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);
        let columns = Columns::resolve(reader.headers()?)?;
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, csv::Position::line);

            let filename = required(&record, columns.filename, line, "filename")?.to_string();
            let url = required(&record, columns.url, line, "url")?;
            let mode = required(&record, columns.mode, line, "mode")?;
            let mode = Mode::parse(mode).ok_or_else(|| ManifestError::UnknownMode {
                line,
                mode: mode.to_string(),
            })?;

            if mode == Mode::Source && !filename.ends_with(MODULE_SUFFIX) {
                return Err(ManifestError::NotAModule { line, filename });
            }
            if mode != Mode::Archive && !seen.insert(filename.clone()) {
                return Err(ManifestError::DuplicateFilename { line, filename });
            }

            entries.push(ManifestEntry::new(filename, url, mode));
        }

        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [ManifestEntry] {
        &mut self.entries
    }

    /// Entries with mode `source`, in manifest order.
    pub fn sources(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| e.mode == Mode::Source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
