//! External toolchain invocation.
//!
//! Every compile, link and install step runs the `norebo` binary with a
//! working directory and an ordered module search path. The search path is
//! handed to the child through `NOREBO_PATH`; our own environment is never
//! modified.

use crate::error::ToolchainError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable the toolchain reads its search path from.
pub const SEARCH_PATH_VAR: &str = "NOREBO_PATH";

/// Ordered list of directories the toolchain resolves modules against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath(Vec<PathBuf>);

impl SearchPath {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self(dirs.into_iter().map(Into::into).collect())
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.0
    }

    /// Joined with the platform path separator.
    pub fn to_os_string(&self) -> Result<OsString, ToolchainError> {
        Ok(std::env::join_paths(&self.0)?)
    }
}

/// Something that can run toolchain commands.
pub trait Toolchain {
    /// Run one toolchain command to completion. Non-zero exit is an error.
    fn invoke(
        &self,
        args: &[String],
        working_dir: &Path,
        search_path: &SearchPath,
    ) -> Result<(), ToolchainError>;
}

/// The `norebo` executable.
#[derive(Debug, Clone)]
pub struct Norebo {
    binary: PathBuf,
}

impl Norebo {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Toolchain for Norebo {
    fn invoke(
        &self,
        args: &[String],
        working_dir: &Path,
        search_path: &SearchPath,
    ) -> Result<(), ToolchainError> {
        let joined = search_path.to_os_string()?;
        tracing::debug!(
            "Running norebo\n\tCWD = {}\n\tPATH = {}\n\t{}",
            working_dir.display(),
            joined.to_string_lossy(),
            args.join(" ")
        );

        let status = Command::new(&self.binary)
            .args(args)
            .current_dir(working_dir)
            .env(SEARCH_PATH_VAR, &joined)
            .status()
            .map_err(|source| ToolchainError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ToolchainError::Exit {
                command: args.join(" "),
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// Toolchain command that compiles modules.
pub const COMPILE_COMMAND: &str = "ORP.Compile";

/// Compile `modules` in `working_dir`.
///
/// Each module is passed with the `/s` option, which lets the compiler
/// (re)write its symbol file.
pub fn compile<T: Toolchain + ?Sized>(
    toolchain: &T,
    modules: &[&str],
    working_dir: &Path,
    search_path: &SearchPath,
) -> Result<(), ToolchainError> {
    toolchain.invoke(&compile_args(modules), working_dir, search_path)
}

fn compile_args(modules: &[&str]) -> Vec<String> {
    std::iter::once(COMPILE_COMMAND.to_string())
        .chain(modules.iter().map(|m| format!("{m}/s")))
        .collect()
}

/// Run an arbitrary toolchain command (linker, installer).
pub fn run<T: Toolchain + ?Sized>(
    toolchain: &T,
    args: &[&str],
    working_dir: &Path,
    search_path: &SearchPath,
) -> Result<(), ToolchainError> {
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    toolchain.invoke(&args, working_dir, search_path)
}
