use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::ReadingContext;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session storage is unavailable: {0}")]
    Unavailable(String),

    #[error("session storage quota exceeded writing {key}")]
    QuotaExceeded { key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed session storage file: {0}")]
    Decode(#[from] serde_json::Error),
}

/// String key-value storage that lives as long as the browsing session.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, String>>,
    max_entries: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that refuses to hold more than `max_entries` keys.
    pub fn with_quota(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_entries: Some(max_entries),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if let Some(max) = self.max_entries {
            if !inner.contains_key(key) && inner.len() >= max {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        inner.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Session storage persisted as a flat JSON object, so a session survives
/// reopening the reader.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entries = if path.exists() {
            let mut buf = String::new();
            File::open(&path)?.read_to_string(&mut buf)?;
            if buf.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&buf)?
            }
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Drops every entry, on disk and in memory.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.clear();
        self.write(&entries)
    }

    fn write(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(entries)?;
        let mut file = File::create(&tmp)?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.write(&entries)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    namespace: String,
    slug: String,
    chapter: String,
}

impl PositionKey {
    pub fn new(namespace: &str, context: &ReadingContext) -> Self {
        Self {
            namespace: namespace.to_string(),
            slug: context.slug.clone(),
            chapter: context.chapter.clone(),
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.slug, self.chapter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorePlan {
    pub offset: u32,
    pub delay: Duration,
}

/// Reads a stored offset the way a lenient integer parse would: leading
/// whitespace, an optional sign, then as many digits as are present.
/// Negative values clamp to zero.
pub fn parse_offset(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }
    let value: u64 = digits[..end].parse().unwrap_or(u64::MAX);
    Some(value.min(u64::from(u32::MAX)) as u32)
}

fn offset_to_stored(offset: f32) -> u32 {
    if !offset.is_finite() || offset <= 0.0 {
        0
    } else if offset >= u32::MAX as f32 {
        u32::MAX
    } else {
        offset as u32
    }
}

/// Per-chapter scroll position with frame-coalesced, best-effort saves.
pub struct PositionStore {
    key: PositionKey,
    storage: Arc<dyn SessionStorage>,
    restore_delay: Duration,
    pending: bool,
}

impl PositionStore {
    pub fn new(
        namespace: &str,
        context: &ReadingContext,
        storage: Arc<dyn SessionStorage>,
        restore_delay: Duration,
    ) -> Self {
        Self {
            key: PositionKey::new(namespace, context),
            storage,
            restore_delay,
            pending: false,
        }
    }

    pub fn key(&self) -> &PositionKey {
        &self.key
    }

    pub fn saved_offset(&self) -> Option<u32> {
        match self.storage.get_item(&self.key.to_string()) {
            Ok(Some(raw)) => {
                let parsed = parse_offset(&raw);
                if parsed.is_none() {
                    debug!(key = %self.key, %raw, "ignoring unparseable saved position");
                }
                parsed
            }
            Ok(None) => None,
            Err(err) => {
                debug!(key = %self.key, "reading saved position failed: {err}");
                None
            }
        }
    }

    pub fn restore(&self) -> Option<RestorePlan> {
        self.saved_offset().map(|offset| RestorePlan {
            offset,
            delay: self.restore_delay,
        })
    }

    /// Notes a scroll. Returns true when the caller should schedule a flush
    /// for the next frame; false while one is already pending.
    pub fn request_save(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Writes the offset current at flush time. Failures are reported to the
    /// caller but never escape the reader.
    #[instrument(skip(self), fields(key = %self.key))]
    pub fn flush(&mut self, offset: f32) -> Result<u32, StorageError> {
        self.pending = false;
        let value = offset_to_stored(offset);
        self.storage
            .set_item(&self.key.to_string(), &value.to_string())?;
        Ok(value)
    }
}
