//! Persistent record store.
//!
//! One JSON document per record, laid out as `<data_dir>/<kind>/<id>.json`.
//! Writes go through a temp file and an atomic rename so a crash mid-write
//! never leaves a half-serialized record behind. Reads of missing records
//! return `None`; `delete` of a missing record reports the miss to the
//! caller, which decides whether that is an error.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A record persistable in the store.
///
/// `KIND` names the subdirectory holding all records of the type;
/// `record_id` is the filename stem and must be filesystem-safe
/// (uuids and hex ids are; arbitrary user input is not).
pub trait Record: Serialize + DeserializeOwned {
    const KIND: &'static str;

    fn record_id(&self) -> &str;
}

/// Directory-backed store of JSON records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    data_dir: PathBuf,
}

impl RecordStore {
    /// Open a store rooted at `data_dir`, creating it if needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|source| StoreError::Io {
            path: data_dir.clone(),
            source,
        })?;
        Ok(Self { data_dir })
    }

    /// Root directory of the store.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn kind_dir<T: Record>(&self) -> PathBuf {
        self.data_dir.join(T::KIND)
    }

    fn record_path<T: Record>(&self, id: &str) -> PathBuf {
        self.kind_dir::<T>().join(format!("{id}.json"))
    }

    /// Insert or overwrite a record.
    pub async fn put<T: Record>(&self, record: &T) -> Result<()> {
        let path = self.record_path::<T>(record.record_id());
        write_json_atomic(&path, record).await
    }

    /// Fetch a record by id. `None` when absent.
    pub async fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        read_json(&self.record_path::<T>(id)).await
    }

    /// List every record of a kind. Order is not guaranteed.
    pub async fn list<T: Record>(&self) -> Result<Vec<T>> {
        let dir = self.kind_dir::<T>();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = read_json::<T>(&path).await? {
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Delete a record by id. Returns whether a record was present.
    pub async fn delete<T: Record>(&self, id: &str) -> Result<bool> {
        let path = self.record_path::<T>(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Serialize `value` and write it through a temp file plus rename, so a
/// crash mid-write never leaves a torn document. Also used for the few
/// JSON files that live outside the store's kind directories.
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)
        .await
        .map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp_path, &data)
        .await
        .map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(())
}
