//! Error types for the image builder.
//!
//! Each stage has its own error enum; [`BuildError`] aggregates them and
//! records which pipeline phase failed.

use crate::builder::image::Phase;
use std::path::PathBuf;
use thiserror::Error;

/// Manifest parse failures. Raised before any filesystem or network action.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest")]
    Csv(#[from] csv::Error),

    #[error("manifest line {line}: missing required field '{field}'")]
    MissingField { line: u64, field: &'static str },

    #[error("manifest line {line}: unknown mode '{mode}' (expected text, source or archive)")]
    UnknownMode { line: u64, mode: String },

    #[error("manifest line {line}: duplicate filename '{filename}'")]
    DuplicateFilename { line: u64, filename: String },

    #[error("manifest line {line}: source entry '{filename}' is not a .Mod file")]
    NotAModule { line: u64, filename: String },
}

/// Source download and extraction failures. Never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("destination {0} already exists")]
    DestinationExists(PathBuf),

    #[error("GET {url} for {filename} failed")]
    Request {
        filename: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} for {filename} returned HTTP {status}")]
    Status {
        filename: String,
        url: String,
        status: u16,
    },

    #[error("{filename} is not a readable zip archive")]
    Archive {
        filename: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive members of {0} were already recorded")]
    MembersAlreadySet(String),

    #[error("archive {archive} member '{member}' would overwrite an existing file")]
    DuplicateMember { archive: String, member: String },

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Bulk rename/delete failures.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot rename {from} to {to}: destination exists")]
    Collision { from: PathBuf, to: PathBuf },
}

/// External toolchain failures. Fatal to the whole run.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("invalid search path entry")]
    SearchPath(#[from] std::env::JoinPathsError),

    #[error("failed to start {program}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with {}", exit_description(*.code))]
    Exit { command: String, code: Option<i32> },
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "termination by signal".to_string(),
    }
}

/// The failure cause inside a single phase.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error for a pipeline run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("'{0}': File exists")]
    AlreadyExists(PathBuf),

    #[error("'{0}': No such file or directory")]
    NotFound(PathBuf),

    #[error("'{0}': Not a directory")]
    NotADirectory(PathBuf),

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("phase {phase} failed")]
    Phase {
        phase: Phase,
        #[source]
        source: PhaseError,
    },
}

impl BuildError {
    /// Whether this error was detected before any work began.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_) | Self::NotFound(_) | Self::NotADirectory(_)
        )
    }

    /// The phase that failed, if the run got that far.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
