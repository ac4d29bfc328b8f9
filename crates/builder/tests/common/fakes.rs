//! In-process stand-ins for the `norebo` binary and the network.

use norebo_builder::error::{FetchError, ToolchainError};
use norebo_builder::{ManifestEntry, Response, SearchPath, Toolchain, Transport};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One recorded toolchain invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub search_path: Vec<PathBuf>,
}

impl Call {
    pub fn command(&self) -> &str {
        &self.args[0]
    }
}

type FailWhen = Box<dyn Fn(&Call) -> bool>;

/// Records every call and writes the files the real toolchain would.
///
/// `ORP.Compile X.Mod/s` leaves `X.smb` and `X.rsc` in the working
/// directory, `LinkSerial` leaves `InnerCore`, `LinkDisk` leaves the image.
#[derive(Default)]
pub struct FakeToolchain {
    calls: RefCell<Vec<Call>>,
    fail_when: Option<FailWhen>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with status 1 on the first call matching `pred`.
    pub fn failing(pred: impl Fn(&Call) -> bool + 'static) -> Self {
        Self {
            calls: RefCell::default(),
            fail_when: Some(Box::new(pred)),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| c.command().to_string())
            .collect()
    }
}

impl Toolchain for FakeToolchain {
    fn invoke(
        &self,
        args: &[String],
        working_dir: &Path,
        search_path: &SearchPath,
    ) -> Result<(), ToolchainError> {
        let call = Call {
            args: args.to_vec(),
            cwd: working_dir.to_path_buf(),
            search_path: search_path.dirs().to_vec(),
        };
        self.calls.borrow_mut().push(call.clone());

        if self.fail_when.as_ref().is_some_and(|pred| pred(&call)) {
            return Err(ToolchainError::Exit {
                command: args.join(" "),
                code: Some(1),
            });
        }

        match args[0].as_str() {
            "ORP.Compile" => {
                for module in &args[1..] {
                    let stem = module.trim_end_matches("/s").trim_end_matches(".Mod");
                    std::fs::write(working_dir.join(format!("{stem}.smb")), b"sym").unwrap();
                    std::fs::write(working_dir.join(format!("{stem}.rsc")), b"code").unwrap();
                }
            }
            "CoreLinker.LinkSerial" => {
                std::fs::write(working_dir.join(&args[2]), b"core").unwrap();
            }
            "CoreLinker.LinkDisk" => {
                std::fs::write(working_dir.join(&args[2]), b"disk").unwrap();
            }
            _ => {}
        }
        Ok(())
    }
}

/// Serves canned responses by URL; anything unknown is a 404.
#[derive(Default)]
pub struct FakeTransport {
    responses: HashMap<String, Response>,
    requests: RefCell<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(
            url.to_string(),
            Response {
                status: 200,
                body: body.into(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, entry: &ManifestEntry) -> Result<Response, FetchError> {
        self.requests.borrow_mut().push(entry.url.clone());
        Ok(self.responses.get(&entry.url).cloned().unwrap_or(Response {
            status: 404,
            body: b"not found".to_vec(),
        }))
    }
}

/// Build a zip archive in memory. Names ending in `/` become directories.
pub fn zip_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in members {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}
