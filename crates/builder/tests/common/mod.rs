//! Shared fixtures for integration tests.

#![allow(dead_code)]

mod fakes;

pub use fakes::{zip_bytes, Call, FakeToolchain, FakeTransport};

use norebo_builder::BuildConfig;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway toolchain root with an empty bootstrap tree.
pub struct TestEnv {
    pub tmp: TempDir,
    pub config: BuildConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        for dir in ["Norebo", "Oberon", "Bootstrap"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        let config = BuildConfig::new(root);
        Self { tmp, config }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.tmp.path().join(rel)
    }

    /// Create a populated sources directory.
    pub fn sources(&self, files: &[&str]) -> PathBuf {
        let dir = self.path("sources");
        std::fs::create_dir(&dir).unwrap();
        for name in files {
            std::fs::write(dir.join(name), b"MODULE X;\rEND X.\r").unwrap();
        }
        dir
    }
}

/// Sorted file names directly inside `dir`.
pub fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

/// Names in `dir` with the given extension.
pub fn with_ext(dir: &Path, ext: &str) -> Vec<String> {
    list(dir)
        .into_iter()
        .filter(|n| n.rsplit_once('.').is_some_and(|(_, e)| e == ext))
        .collect()
}
