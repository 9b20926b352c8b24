use crate::error::{Error, Result};
use crate::index::SourceDoc;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const EXTENSIONS: &[&str] = &["txt", "md", "json"];

/// Provenance label for a chapter file.
pub fn chapter_label(file_name: &str) -> String {
    format!("Urusobanuro rwasomwe muri {file_name}")
}

fn is_chapter(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Read every chapter file at the top level of `dir`, in file-name order.
/// A missing directory is created and yields no documents.
pub fn read_source_dir(dir: &Path) -> Result<Vec<SourceDoc>> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        tracing::info!(dir = %dir.display(), "created empty source directory");
        return Ok(Vec::new());
    }

    let mut docs = Vec::new();
    let walker = WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(path, e.into())
        })?;
        let p = entry.path();
        if !entry.file_type().is_file() || !is_chapter(p) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let raw = match fs::read_to_string(p) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!(path = %p.display(), "skipping file that is not valid UTF-8");
                continue;
            }
            Err(e) => return Err(Error::io(p, e)),
        };
        docs.push(SourceDoc::new(file_name.clone(), chapter_label(&file_name), raw.trim()));
    }
    tracing::debug!(dir = %dir.display(), count = docs.len(), "read source documents");
    Ok(docs)
}
