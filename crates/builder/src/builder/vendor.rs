//! Source fetching.
//!
//! Downloads every manifest entry into a fresh sources directory. Text and
//! module sources get their line terminators rewritten to the bare carriage
//! returns Oberon expects; archives are unpacked flat.

use crate::builder::manifest::{Manifest, ManifestEntry, Mode};
use crate::error::FetchError;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Archive members with this suffix are documentation and are not extracted.
pub const DOC_SUFFIX: &str = ".txt";

/// Status and body of a completed GET.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches raw bytes from a URL.
pub trait Transport {
    fn get(&self, entry: &ManifestEntry) -> Result<Response, FetchError>;
}

/// HTTP(S) transport sharing one connection pool across all entries.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, entry: &ManifestEntry) -> Result<Response, FetchError> {
        let request_err = |source| FetchError::Request {
            filename: entry.filename.clone(),
            url: entry.url.clone(),
            source,
        };
        let resp = self.client.get(&entry.url).send().map_err(request_err)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().map_err(request_err)?.to_vec();
        Ok(Response { status, body })
    }
}

/// Rewrite every `\r\n` and lone `\n` as `\r`.
pub fn normalize_line_endings(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.iter().copied().peekable();
    while let Some(b) = bytes.next() {
        match b {
            b'\r' if bytes.peek() == Some(&b'\n') => {
                bytes.next();
                out.push(b'\r');
            }
            b'\n' => out.push(b'\r'),
            other => out.push(other),
        }
    }
    out
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), FetchError> {
    std::fs::write(path, data).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Unpack `data` into `dest`, dropping directory structure and `.txt` members.
///
/// Returns extracted base names in archive order. `taken` holds names already
/// present in `dest`; a member that would overwrite one is an error.
fn extract_archive(
    entry: &ManifestEntry,
    data: Vec<u8>,
    dest: &Path,
    taken: &mut HashSet<String>,
) -> Result<Vec<String>, FetchError> {
    let archive_err = |source| FetchError::Archive {
        filename: entry.filename.clone(),
        source,
    };
    let mut zip = zip::ZipArchive::new(Cursor::new(data)).map_err(archive_err)?;
    let mut members = Vec::new();

    for index in 0..zip.len() {
        let mut file = zip.by_index(index).map_err(archive_err)?;
        if file.is_dir() {
            continue;
        }
        let name = match file.name().rsplit_once('/') {
            Some((_, base)) => base.to_string(),
            None => file.name().to_string(),
        };
        if name.is_empty() || name.ends_with(DOC_SUFFIX) {
            continue;
        }
        if !taken.insert(name.clone()) {
            return Err(FetchError::DuplicateMember {
                archive: entry.filename.clone(),
                member: name,
            });
        }

        let path = dest.join(&name);
        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })?;
        write_file(&path, &content)?;
        members.push(name);
    }
    Ok(members)
}

/// Download every entry of `manifest` into `dest`, which is created here and
/// must not exist yet. Its parent must.
///
/// Entries are fetched in order and the first failure aborts the run; files
/// already written stay on disk. Archive entries get their member lists filled.
pub fn fetch<T: Transport + ?Sized>(
    manifest: &mut Manifest,
    dest: &Path,
    transport: &T,
) -> Result<(), FetchError> {
    std::fs::create_dir(dest).map_err(|source| match source.kind() {
        std::io::ErrorKind::AlreadyExists => FetchError::DestinationExists(dest.to_path_buf()),
        _ => FetchError::Io {
            path: dest.to_path_buf(),
            source,
        },
    })?;
    fetch_into(manifest, dest, transport)
}

/// Like [`fetch`], for a directory the caller has already created.
pub fn fetch_into<T: Transport + ?Sized>(
    manifest: &mut Manifest,
    dest: &Path,
    transport: &T,
) -> Result<(), FetchError> {
    let mut taken = HashSet::new();

    for entry in manifest.entries_mut() {
        tracing::info!("Fetching {} ({})", entry.filename, entry.mode);
        let resp = transport.get(entry)?;
        if !resp.is_success() {
            return Err(FetchError::Status {
                filename: entry.filename.clone(),
                url: entry.url.clone(),
                status: resp.status,
            });
        }
        tracing::debug!("  {} bytes from {}", resp.body.len(), entry.url);

        match entry.mode {
            Mode::Text | Mode::Source => {
                taken.insert(entry.filename.clone());
                write_file(&dest.join(&entry.filename), &normalize_line_endings(&resp.body))?;
            }
            Mode::Archive => {
                let members = extract_archive(entry, resp.body, dest, &mut taken)?;
                tracing::debug!("  extracted {} members", members.len());
                entry.set_members(members)?;
            }
        }
    }
    Ok(())
}

/// Paths of every file `fetch` wrote for `manifest`, in manifest order.
pub fn fetched_files<'a>(
    manifest: &'a Manifest,
    dest: &'a Path,
) -> impl Iterator<Item = PathBuf> + 'a {
    manifest
        .entries()
        .iter()
        .flat_map(|entry| match entry.mode {
            Mode::Archive => entry.members(),
            _ => std::slice::from_ref(&entry.filename),
        })
        .map(move |name| dest.join(name))
}
