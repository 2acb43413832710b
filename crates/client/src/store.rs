//! File-backed token store (persisted session credentials).

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agriportal_auth::{StorageKey, StoreError, TokenStore};

const DOCUMENT_VERSION: u32 = 1;

/// On-disk layout of the session file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionDocument {
    version: u32,
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// JSON-file token store.
///
/// Every read goes to disk, so a logout performed by another process is seen
/// on the next read. Writes replace the whole document via a temp file and a
/// rename; the mutex serialises writers within this process.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the per-user default location.
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::new(default_session_path()?))
    }

    /// Store at `<base>/agriportal/session.json`. The directory is created on
    /// first write.
    pub fn open_in(base: impl AsRef<Path>) -> Self {
        Self::new(session_path_in(base.as_ref()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the document was last written, if ever.
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.load()?.updated_at)
    }

    fn load(&self) -> Result<SessionDocument, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionDocument::default());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SessionDocument::default());
        }

        let doc: SessionDocument = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))?;

        if doc.version > DOCUMENT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "{}: unsupported document version {}",
                self.path.display(),
                doc.version
            )));
        }

        Ok(doc)
    }

    fn store(&self, mut doc: SessionDocument) -> Result<(), StoreError> {
        doc.version = DOCUMENT_VERSION;
        doc.updated_at = Some(Utc::now());

        let bytes = serde_json::to_vec_pretty(&doc)
            .map_err(|e| StoreError::Corrupt(format!("failed to encode session document: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut doc = self.load()?;
        f(&mut doc.entries);
        self.store(doc)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.entries.get(key.as_str()).cloned())
    }

    fn set_many(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError> {
        self.update(|map| {
            for (key, value) in entries {
                map.insert(key.as_str().to_string(), value.clone());
            }
        })
    }

    fn remove_many(&self, keys: &[StorageKey]) -> Result<(), StoreError> {
        self.update(|map| {
            for key in keys {
                map.remove(key.as_str());
            }
        })
    }

    fn replace_all(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError> {
        self.update(|map| {
            map.clear();
            for (key, value) in entries {
                map.insert(key.as_str().to_string(), value.clone());
            }
        })
    }
}

fn default_session_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_local_dir() and home_dir()/.local/share")?;

    Ok(session_path_in(&base))
}

fn session_path_in(base: &Path) -> PathBuf {
    base.join("agriportal").join("session.json")
}
