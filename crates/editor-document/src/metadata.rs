//! Per-location metadata.
//!
//! Small persisted attributes (cursor position, language id, encoding) keyed by document
//! location. Stores use interior mutability: they are shared by every document of an
//! application through an `Rc<dyn MetadataStore>` on a single thread.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::location::Location;

/// Cursor character offset.
pub const POSITION_KEY: &str = "position";
/// Language id chosen by the user (`_NORMAL_` for plain text).
pub const LANGUAGE_KEY: &str = "language";
/// Charset name of the encoding chosen by the user.
pub const ENCODING_KEY: &str = "encoding";

/// Key/value store of metadata, keyed by location.
pub trait MetadataStore {
    /// Value of `key` for `location`.
    fn get(&self, location: &Location, key: &str) -> Option<String>;

    /// Set (`Some`) or unset (`None`) `key` for `location`.
    fn set(&self, location: &Location, key: &str, value: Option<&str>);
}

type Entries = HashMap<String, BTreeMap<String, String>>;

fn set_entry(entries: &mut Entries, location: &Location, key: &str, value: Option<&str>) {
    match value {
        Some(value) => {
            entries
                .entry(location.as_str().to_string())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
        None => {
            if let Some(values) = entries.get_mut(location.as_str()) {
                values.remove(key);
                if values.is_empty() {
                    entries.remove(location.as_str());
                }
            }
        }
    }
}

/// In-memory [`MetadataStore`].
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    entries: RefCell<Entries>,
}

impl MemoryMetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn get(&self, location: &Location, key: &str) -> Option<String> {
        self.entries
            .borrow()
            .get(location.as_str())
            .and_then(|values| values.get(key))
            .cloned()
    }

    fn set(&self, location: &Location, key: &str, value: Option<&str>) {
        set_entry(&mut self.entries.borrow_mut(), location, key, value);
    }
}

/// Metadata persistence errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("I/O error: {0}")]
    /// Reading or writing the metadata file failed.
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    /// The metadata file is not valid JSON.
    Json(#[from] serde_json::Error),
}

/// [`MetadataStore`] persisted as a JSON file.
///
/// Changes are kept in memory until [`JsonMetadataStore::flush`]; dropping a store with
/// unflushed changes flushes it and logs a warning if that fails.
#[derive(Debug)]
pub struct JsonMetadataStore {
    path: PathBuf,
    entries: RefCell<Entries>,
    dirty: Cell<bool>,
}

impl JsonMetadataStore {
    /// Open the store at `path`. A missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Entries::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            entries: RefCell::new(entries),
            dirty: Cell::new(false),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write pending changes to disk.
    pub fn flush(&self) -> Result<(), MetadataError> {
        if !self.dirty.get() {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&*self.entries.borrow())?;
        fs::write(&self.path, json)?;
        self.dirty.set(false);
        tracing::debug!(path = %self.path.display(), "metadata flushed");
        Ok(())
    }
}

impl MetadataStore for JsonMetadataStore {
    fn get(&self, location: &Location, key: &str) -> Option<String> {
        self.entries
            .borrow()
            .get(location.as_str())
            .and_then(|values| values.get(key))
            .cloned()
    }

    fn set(&self, location: &Location, key: &str, value: Option<&str>) {
        set_entry(&mut self.entries.borrow_mut(), location, key, value);
        self.dirty.set(true);
    }
}

impl Drop for JsonMetadataStore {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to persist metadata");
        }
    }
}
