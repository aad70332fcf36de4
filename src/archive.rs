//! Archive normalizer
//!
//! Flattens a downloaded file into [`FileRecord`]s: zip, tar and tar.gz are
//! unpacked entry by entry (directories skipped), anything else is read as a
//! single file. The container type comes from the file name only.

use crate::error::{MediaError, Result};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::EntryType;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Truncated entry {name}: header declares {declared} bytes, read {actual}")]
    Truncated { name: String, declared: u64, actual: u64 },
}

// Upper bound on the buffer reserved up front from a header's declared size
const ENTRY_PREALLOC_LIMIT: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    Zip,
    Tar,
    Tgz,
    None,
}

/// One file pulled out of an archive, or the input file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub data: Vec<u8>,
    /// Sniffed from content.
    pub mime_type: String,
    /// Lowercase, with leading dot; empty when the name has none.
    pub extension: String,
}

impl FileRecord {
    pub fn new(data: Vec<u8>, name: &Path) -> Self {
        Self {
            mime_type: sniff_mime(&data),
            extension: extension_of(name),
            data,
        }
    }
}

pub fn classify(path: impl AsRef<Path>) -> ArchiveKind {
    let path = path.as_ref();
    match extension_of(path).as_str() {
        ".zip" => ArchiveKind::Zip,
        ".tar" => ArchiveKind::Tar,
        ".gz" if path.to_string_lossy().to_lowercase().ends_with(".tar.gz") => ArchiveKind::Tgz,
        _ => ArchiveKind::None,
    }
}

/// Read every regular file under `path`. Any failure aborts the whole read.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<FileRecord>> {
    let path = path.as_ref();
    let kind = classify(path);

    let records = match kind {
        ArchiveKind::Zip => read_zip(path),
        ArchiveKind::Tar => read_tar(path, false),
        ArchiveKind::Tgz => read_tar(path, true),
        ArchiveKind::None => read_single(path),
    }
    .map_err(|source| MediaError::Archive {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), ?kind, files = records.len(), "normalized archive");
    Ok(records)
}

fn read_single(path: &Path) -> std::result::Result<Vec<FileRecord>, ArchiveError> {
    let data = std::fs::read(path)?;
    Ok(vec![FileRecord::new(data, path)])
}

fn read_zip(path: &Path) -> std::result::Result<Vec<FileRecord>, ArchiveError> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut records = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = PathBuf::from(entry.name());
        let declared = entry.size();
        let data = read_entry(&mut entry, &name, declared)?;
        records.push(FileRecord::new(data, &name));
    }
    Ok(records)
}

fn read_tar(path: &Path, gzipped: bool) -> std::result::Result<Vec<FileRecord>, ArchiveError> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut archive = tar::Archive::new(reader);
    let mut records = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        // Regular files only: directories, links and special entries are skipped
        if entry.header().entry_type() != EntryType::Regular {
            continue;
        }
        let name = entry.path()?.into_owned();
        let declared = entry.size();
        let data = read_entry(&mut entry, &name, declared)?;
        records.push(FileRecord::new(data, &name));
    }
    Ok(records)
}

/// Read an entry body, trusting the header's size only as a capped hint.
fn read_entry(entry: &mut impl Read, name: &Path, declared: u64) -> std::result::Result<Vec<u8>, ArchiveError> {
    let mut data = Vec::with_capacity(declared.min(ENTRY_PREALLOC_LIMIT) as usize);
    entry.read_to_end(&mut data)?;

    let actual = data.len() as u64;
    if actual != declared {
        return Err(ArchiveError::Truncated {
            name: name.display().to_string(),
            declared,
            actual,
        });
    }
    Ok(data)
}

/// Magic-number detection first, then content heuristics.
pub fn sniff_mime(data: &[u8]) -> String {
    match infer::get(data) {
        Some(kind) => kind.mime_type().to_string(),
        None => tree_magic_mini::from_u8(data).to_string(),
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
