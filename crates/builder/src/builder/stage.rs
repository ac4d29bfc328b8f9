//! Extension-based staging of compiled artifacts.
//!
//! The toolchain's module loader only sees `.rsc` files and the core linker
//! only reads `.rsx` files. Handing a directory from one to the other is a bulk
//! rename of every unit in it. Only direct children are touched.

use crate::error::StageError;
use std::path::{Path, PathBuf};

/// Symbol file extension.
pub const SYMBOL_EXT: &str = "smb";
/// Compiled code, loadable by the toolchain.
pub const CODE_EXT: &str = "rsc";
/// Compiled code hidden from the loader; the linker's input form.
pub const STAGED_EXT: &str = "rsx";

/// Which form a directory's compiled units are currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// `.rsc`: visible to the toolchain module loader.
    Active,
    /// `.rsx`: visible only to the core linker.
    Staged,
}

impl UnitState {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Active => CODE_EXT,
            Self::Staged => STAGED_EXT,
        }
    }
}

/// A compiled module at a known stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    pub name: String,
    pub state: UnitState,
}

impl CompiledUnit {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.state.extension())
    }
}

/// Final dot-delimited suffix of a file name, if it has one.
fn suffix(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('.')
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StageError + '_ {
    move |source| StageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Direct child files whose suffix is `ext`, as `(path, stem)` pairs, sorted.
fn matching(dir: &Path, ext: &str) -> Result<Vec<(PathBuf, String)>, StageError> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        if !entry.path().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Some((stem, name_ext)) = suffix(&name) {
            if name_ext == ext {
                found.push((entry.path(), stem.to_string()));
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Rename every `*.old_ext` file in `dir` to `*.new_ext`.
///
/// All destinations are checked before anything is renamed; if one already
/// exists the directory is left untouched and [`StageError::Collision`] is
/// returned. Returns the new paths.
pub fn bulk_rename(dir: &Path, old_ext: &str, new_ext: &str) -> Result<Vec<PathBuf>, StageError> {
    let plan: Vec<(PathBuf, PathBuf)> = matching(dir, old_ext)?
        .into_iter()
        .map(|(from, stem)| {
            let to = dir.join(format!("{stem}.{new_ext}"));
            (from, to)
        })
        .collect();

    if let Some((from, to)) = plan.iter().find(|(_, to)| to.exists()) {
        return Err(StageError::Collision {
            from: from.clone(),
            to: to.clone(),
        });
    }

    let mut renamed = Vec::with_capacity(plan.len());
    for (from, to) in plan {
        std::fs::rename(&from, &to).map_err(io_err(&from))?;
        renamed.push(to);
    }
    tracing::debug!(
        "Renamed {} .{old_ext} -> .{new_ext} in {}",
        renamed.len(),
        dir.display()
    );
    Ok(renamed)
}

/// Remove every `*.ext` file in `dir`. Returns how many were removed.
pub fn bulk_delete(dir: &Path, ext: &str) -> Result<usize, StageError> {
    let doomed = matching(dir, ext)?;
    for (path, _) in &doomed {
        std::fs::remove_file(path).map_err(io_err(path))?;
    }
    tracing::debug!("Deleted {} .{ext} files in {}", doomed.len(), dir.display());
    Ok(doomed.len())
}

/// Move every compiled unit in `dir` from one state to another.
pub fn transition(dir: &Path, from: UnitState, to: UnitState) -> Result<Vec<CompiledUnit>, StageError> {
    let renamed = bulk_rename(dir, from.extension(), to.extension())?;
    Ok(renamed
        .iter()
        .filter_map(|path| path.file_stem()?.to_str())
        .map(|name| CompiledUnit {
            name: name.to_string(),
            state: to,
        })
        .collect())
}

/// Compiled units in `dir` currently in `state`.
pub fn units(dir: &Path, state: UnitState) -> Result<Vec<CompiledUnit>, StageError> {
    Ok(matching(dir, state.extension())?
        .into_iter()
        .map(|(_, name)| CompiledUnit { name, state })
        .collect())
}
