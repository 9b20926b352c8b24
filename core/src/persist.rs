//! Single-file index snapshots.
//!
//! `.bin` paths are written with bincode, anything else as pretty JSON.
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a reader never sees a half-written snapshot.

use crate::error::{Error, Result};
use crate::Index;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCE_DIR: &str = "kb/chapters";
pub const DEFAULT_INDEX_PATH: &str = "kb/index.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Bincode,
}

impl SnapshotFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bin") => SnapshotFormat::Bincode,
            _ => SnapshotFormat::Json,
        }
    }
}

fn encode(index: &Index, format: SnapshotFormat) -> std::result::Result<Vec<u8>, String> {
    match format {
        SnapshotFormat::Json => serde_json::to_vec_pretty(index).map_err(|e| e.to_string()),
        SnapshotFormat::Bincode => bincode::serialize(index).map_err(|e| e.to_string()),
    }
}

fn decode(bytes: &[u8], format: SnapshotFormat) -> std::result::Result<Index, String> {
    match format {
        SnapshotFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
        SnapshotFormat::Bincode => bincode::deserialize(bytes).map_err(|e| e.to_string()),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the snapshot, replacing any previous one at `path`.
pub fn save_index(path: &Path, index: &Index) -> Result<()> {
    let format = SnapshotFormat::for_path(path);
    let bytes = encode(index, format)
        .map_err(|reason| Error::io(path, std::io::Error::other(reason)))?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let tmp = temp_path(path);
    if let Err(e) = write_and_rename(&tmp, path, &bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), ?format, "saved index snapshot");
    Ok(())
}

fn write_and_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(tmp).map_err(|e| Error::io(tmp, e))?;
    f.write_all(bytes).map_err(|e| Error::io(tmp, e))?;
    f.sync_all().map_err(|e| Error::io(tmp, e))?;
    drop(f);
    fs::rename(tmp, path).map_err(|e| Error::io(path, e))
}

/// Load and validate a snapshot.
pub fn load_index(path: &Path) -> Result<Index> {
    let mut f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::MissingIndex { path: path.to_path_buf() })
        }
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| Error::io(path, e))?;

    let malformed = |reason: String| Error::MalformedSnapshot { path: path.to_path_buf(), reason };
    let index = decode(&buf, SnapshotFormat::for_path(path)).map_err(malformed)?;
    index.validate().map_err(malformed)?;
    Ok(index)
}
