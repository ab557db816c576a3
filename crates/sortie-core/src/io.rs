use crate::error::Result;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `data` to `path` through a sibling tempfile, replacing any existing
/// file in one rename.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    staged(path, data)?.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Like [`atomic_write`] but never replaces an existing file. Returns `false`
/// when `path` was already there, including when another writer won the race.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    match staged(path, data)?.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error.into()),
    }
}

fn staged(path: &Path, data: &[u8]) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    Ok(tmp)
}
