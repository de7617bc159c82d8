//! File-backed record store, one file per entity kind.
//!
//! Contract:
//! - `read_all` on a missing file returns an empty list.
//! - `append` adds one record line and creates the file if needed.
//! - `replace_all` rewrites the whole file through a temporary file in the
//!   same directory that is renamed over the target. Zero records leave an
//!   empty file.
//! - malformed lines are skipped on read (see `codec`).

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use super::codec::{decode_lines, encode_line, encode_lines};
use super::error::{CatalogError, CatalogResult};

pub fn read_all<T: DeserializeOwned>(path: &Path) -> CatalogResult<Vec<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(CatalogError::io(path, err)),
    };
    let decoded = decode_lines(&text, path);
    debug!(
        "Read {} records from {} ({} skipped)",
        decoded.records.len(),
        path.display(),
        decoded.skipped
    );
    Ok(decoded.records)
}

pub fn append<T: Serialize>(path: &Path, record: &T) -> CatalogResult<()> {
    let line = encode_line(record)?;
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| CatalogError::io(path, e))?;

    // A file cut short by a crash may lack its final newline; never glue the
    // new record onto that partial line.
    let len = file.metadata().map_err(|e| CatalogError::io(path, e))?.len();
    let mut prefix = "";
    if len > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(|e| CatalogError::io(path, e))?;
        if last[0] != b'\n' {
            prefix = "\n";
        }
    }

    file.write_all(format!("{}{}", prefix, line).as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| CatalogError::io(path, e))?;
    debug!("Appended one record to {}", path.display());
    Ok(())
}

pub fn ensure_exists(path: &Path) -> CatalogResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }
    }
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| CatalogError::io(path, e))?;
    Ok(())
}

pub fn replace_all<T: Serialize>(path: &Path, records: &[T]) -> CatalogResult<()> {
    let content = encode_lines(records)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| CatalogError::io(&dir, e))?;
    tmp.write_all(content.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| CatalogError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| CatalogError::io(path, e.error))?;

    debug!("Rewrote {} with {} records", path.display(), records.len());
    Ok(())
}

/// Typed handle on one record file.
pub struct RecordStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        RecordStore {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for RecordStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").field("path", &self.path).finish()
    }
}

impl<T: Serialize + DeserializeOwned> RecordStore<T> {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        RecordStore {
            path: path.as_ref().to_path_buf(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> CatalogResult<Vec<T>> {
        read_all(&self.path)
    }

    pub fn append(&self, record: &T) -> CatalogResult<()> {
        append(&self.path, record)
    }

    pub fn ensure_exists(&self) -> CatalogResult<()> {
        ensure_exists(&self.path)
    }

    pub fn replace_all(&self, records: &[T]) -> CatalogResult<()> {
        replace_all(&self.path, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: String,
        label: Option<String>,
    }

    fn row(id: &str) -> Row {
        Row {
            id: id.to_string(),
            label: Some(format!("label-{}", id)),
        }
    }

    fn create_test_store() -> (TempDir, RecordStore<Row>) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("rows.jsonl"));
        (dir, store)
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let (_dir, store) = create_test_store();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_creates_file() {
        let (_dir, store) = create_test_store();
        store.append(&row("a")).unwrap();
        store.append(&row("b")).unwrap();
        assert_eq!(store.read_all().unwrap(), vec![row("a"), row("b")]);
    }

    #[test]
    fn test_replace_all_round_trip() {
        let (_dir, store) = create_test_store();
        store.append(&row("stale")).unwrap();

        let rows = vec![row("x"), row("y"), row("z")];
        store.replace_all(&rows).unwrap();
        assert_eq!(store.read_all().unwrap(), rows);
    }

    #[test]
    fn test_replace_all_with_nothing_truncates() {
        let (_dir, store) = create_test_store();
        store.append(&row("a")).unwrap();
        store.replace_all(&[]).unwrap();

        assert!(store.read_all().unwrap().is_empty());
        assert_eq!(fs::metadata(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_ensure_exists_keeps_content() {
        let (dir, _) = create_test_store();
        let store: RecordStore<Row> = RecordStore::new(dir.path().join("nested/rows.jsonl"));
        store.ensure_exists().unwrap();
        assert!(store.path().exists());

        store.append(&row("a")).unwrap();
        store.ensure_exists().unwrap();
        assert_eq!(store.read_all().unwrap(), vec![row("a")]);
    }

    #[test]
    fn test_append_after_truncated_line_starts_new_line() {
        let (_dir, store) = create_test_store();
        store.append(&row("a")).unwrap();
        let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
        file.write_all(b"{\"id\":\"half").unwrap();

        store.append(&row("b")).unwrap();
        assert_eq!(store.read_all().unwrap(), vec![row("a"), row("b")]);
    }

    #[test]
    fn test_malformed_line_does_not_hide_others() {
        let (_dir, store) = create_test_store();
        store.append(&row("a")).unwrap();
        let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
        file.write_all(b"garbage\n").unwrap();
        store.append(&row("b")).unwrap();

        assert_eq!(store.read_all().unwrap(), vec![row("a"), row("b")]);
    }
}
