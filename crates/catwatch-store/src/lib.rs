//! Single-record JSON state files.
//!
//! Each store holds exactly one snapshot and every save replaces it whole.
//! Saves go through a temp file in the target directory followed by a
//! rename, so a crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use catwatch_core::{CountsState, ProductState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// A JSON file holding one `T`.
#[derive(Debug, Clone)]
pub struct JsonStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

/// Store for the counts tracker.
pub type CountsStore = JsonStore<CountsState>;

/// Store for the product tracker.
pub type ProductStore = JsonStore<ProductState>;

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned,
{
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored snapshot. A missing file means no previous run and
    /// yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read, or
    /// [`StoreError::Parse`] if its contents are not a valid record.
    pub fn load(&self) -> Result<Option<T>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Parse {
                path: self.path.display().to_string(),
                source: e,
            })
    }

    /// Replace the stored snapshot with `record`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if `record` cannot be encoded, or
    /// [`StoreError::Io`] if the temp file cannot be written or renamed into
    /// place.
    pub fn save(&self, record: &T) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, record).map_err(StoreError::Serialize)?;
            writer.write_all(b"\n").map_err(|e| self.io_error(e))?;
            writer.flush().map_err(|e| self.io_error(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        tracing::debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use catwatch_core::{ProductRecord, SignalMap};
    use chrono::{DateTime, Utc};

    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountsStore::new(dir.path().join("product_counts.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn counts_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountsStore::new(dir.path().join("product_counts.json"));

        let first = CountsState::new(SignalMap::from([("total".to_string(), 100)]), ts());
        store.save(&first).unwrap();
        let second = CountsState::new(
            SignalMap::from([("total".to_string(), 105), ("women".to_string(), 40)]),
            ts(),
        );
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), Some(second));
    }

    #[test]
    fn counts_file_has_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("product_counts.json");
        let store = CountsStore::new(&path);
        store
            .save(&CountsState::new(
                SignalMap::from([("men".to_string(), 7)]),
                ts(),
            ))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["counts"]["men"], 7);
        assert_eq!(raw["timestamp"], "2025-01-15T10:00:00Z");
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProductStore::new(dir.path().join("state/nested/tracked_products.json"));

        let state = ProductState {
            men: vec![ProductRecord {
                id: "4".to_string(),
                name: "Cargo Shorts".to_string(),
                url: "https://www.sheinindia.in/cargo-shorts-p-4".to_string(),
                price: "₹649".to_string(),
                detected_at: ts(),
            }],
            women: Vec::new(),
            timestamp: Some(ts()),
        };
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountsStore::new(dir.path().join("product_counts.json"));
        store
            .save(&CountsState::new(SignalMap::from([("total".to_string(), 1)]), ts()))
            .unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("product_counts.json");
        fs::write(&path, "{\"counts\": {\"total\": 1").unwrap();

        let err = CountsStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }
}
