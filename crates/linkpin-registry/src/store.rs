use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::entry::LinkEntry;
use crate::error::StoreError;

/// Durable home of the registry, the pinned summary id and the next update offset.
///
/// Each resource is rewritten in full on every save. A missing or blank resource
/// loads as "no data yet"; malformed content is an error the caller recovers from.
pub trait StateStore: Send + Sync {
    fn load_entries(&self) -> Result<Vec<LinkEntry>, StoreError>;
    fn save_entries(&self, entries: &[LinkEntry]) -> Result<(), StoreError>;
    fn load_pin_ref(&self) -> Result<Option<i64>, StoreError>;
    fn save_pin_ref(&self, message_id: i64) -> Result<(), StoreError>;
    fn load_update_offset(&self) -> Result<Option<i64>, StoreError>;
    fn save_update_offset(&self, offset: i64) -> Result<(), StoreError>;
}

/// JSON files: a pretty-printed entry array, a bare message id and a bare update offset.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    entries_path: PathBuf,
    pin_path: PathBuf,
    offset_path: PathBuf,
}

impl JsonStateStore {
    pub fn new(
        entries_path: impl Into<PathBuf>,
        pin_path: impl Into<PathBuf>,
        offset_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            entries_path: entries_path.into(),
            pin_path: pin_path.into(),
            offset_path: offset_path.into(),
        }
    }

    pub fn entries_path(&self) -> &Path {
        &self.entries_path
    }

    pub fn pin_path(&self) -> &Path {
        &self.pin_path
    }

    pub fn offset_path(&self) -> &Path {
        &self.offset_path
    }
}

impl StateStore for JsonStateStore {
    fn load_entries(&self) -> Result<Vec<LinkEntry>, StoreError> {
        let Some(raw) = read_optional(&self.entries_path)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.entries_path.clone(),
            source,
        })
    }

    fn save_entries(&self, entries: &[LinkEntry]) -> Result<(), StoreError> {
        let raw = serde_json::to_vec_pretty(entries)?;
        atomic_write(&self.entries_path, &raw)
    }

    fn load_pin_ref(&self) -> Result<Option<i64>, StoreError> {
        read_scalar(&self.pin_path)
    }

    fn save_pin_ref(&self, message_id: i64) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(&message_id)?;
        atomic_write(&self.pin_path, &raw)
    }

    fn load_update_offset(&self) -> Result<Option<i64>, StoreError> {
        read_scalar(&self.offset_path)
    }

    fn save_update_offset(&self, offset: i64) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(&offset)?;
        atomic_write(&self.offset_path, &raw)
    }
}

fn read_scalar(path: &Path) -> Result<Option<i64>, StoreError> {
    let Some(raw) = read_optional(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(raw))
}

/// Writes through a sibling temp file so a crash never leaves a truncated resource.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(data).map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}

/// Process-local store for tests and dry runs. Writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: Mutex<Vec<LinkEntry>>,
    pin_ref: Mutex<Option<i64>>,
    update_offset: Mutex<Option<i64>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<LinkEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Self::default()
        }
    }

    /// Makes `load_entries` fail as if the saved links were unreadable.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn saved_entries(&self) -> Vec<LinkEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn saved_pin_ref(&self) -> Option<i64> {
        *self.pin_ref.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn saved_update_offset(&self) -> Option<i64> {
        *self
            .update_offset
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self, what: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                path: PathBuf::from(format!("memory://{what}")),
                source: std::io::Error::other("writes disabled"),
            });
        }
        Ok(())
    }
}

impl StateStore for InMemoryStateStore {
    fn load_entries(&self) -> Result<Vec<LinkEntry>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Read {
                path: PathBuf::from("memory://entries"),
                source: std::io::Error::other("reads disabled"),
            });
        }
        Ok(self.saved_entries())
    }

    fn save_entries(&self, entries: &[LinkEntry]) -> Result<(), StoreError> {
        self.check_writable("entries")?;
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries.to_vec();
        Ok(())
    }

    fn load_pin_ref(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.saved_pin_ref())
    }

    fn save_pin_ref(&self, message_id: i64) -> Result<(), StoreError> {
        self.check_writable("pin")?;
        *self.pin_ref.lock().unwrap_or_else(PoisonError::into_inner) = Some(message_id);
        Ok(())
    }

    fn load_update_offset(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.saved_update_offset())
    }

    fn save_update_offset(&self, offset: i64) -> Result<(), StoreError> {
        self.check_writable("offset")?;
        *self
            .update_offset
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(offset);
        Ok(())
    }
}
