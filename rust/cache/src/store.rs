// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk-based object cache.
//!
//! One directory per namespace, one `<key>.bin` record per object. Records
//! are written to a temporary file in the same directory and renamed into
//! place, so concurrent readers see either the old record or the new one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use obj_lite_core::{MappedView, ParsedObject, VertexBuffer};

use crate::error::{Error, RecordError, Result};
use crate::keys;
use crate::options::CacheOptions;
use crate::record;

const RECORD_EXTENSION: &str = "bin";

/// Namespace-scoped store of packed objects.
#[derive(Debug)]
pub struct ObjectCache {
    name: String,
    directory: PathBuf,
    options: CacheOptions,
    enabled: AtomicBool,
}

impl ObjectCache {
    /// Create (or reopen) the cache named `name` under `options.root`.
    pub fn new(name: &str, options: CacheOptions) -> Result<Self> {
        let name = keys::escape(name.as_bytes());
        let directory = options.root.join(&name);

        fs::create_dir_all(&directory).map_err(|source| Error::CacheDirectory {
            path: directory.clone(),
            source,
        })?;
        tracing::debug!(
            cache = %name,
            path = %directory.display(),
            "Opened object cache"
        );

        Ok(Self {
            name,
            directory,
            options,
            enabled: AtomicBool::new(true),
        })
    }

    /// The default cache for an OBJ file, namespaced by its path or contents.
    pub fn for_file(path: impl AsRef<Path>, options: CacheOptions) -> Result<Self> {
        let namespace = keys::namespace_for_file(path.as_ref(), options.hash_file_contents)?;
        Self::new(&namespace, options)
    }

    /// Key under which an object with this name is stored
    pub fn key_for(name: Option<&str>) -> String {
        keys::object_key(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Namespace directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Disabled caches miss on every `get` and ignore every `put`.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Get the cached object stored under `key`.
    ///
    /// Missing entries, directories and corrupt records are all misses.
    pub fn get(&self, key: &str) -> Option<ParsedObject> {
        self.load(key, None)
    }

    /// Get the cached object for the provided name
    pub fn cached_object_for_name(&self, name: &str) -> Option<ParsedObject> {
        self.load(&keys::object_key(Some(name)), Some(name.to_string()))
    }

    /// Get the cached object for the default (unnamed) object
    pub fn cached_object_for_root_object(&self) -> Option<ParsedObject> {
        self.load(keys::ROOT_OBJECT_KEY, None)
    }

    /// Store `object` under `key`. Returns whether the record was written.
    pub fn put(&self, object: &ParsedObject, key: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let Some(path) = self.entry_path(key) else {
            return false;
        };

        match self.write_record(object, &path) {
            Ok(()) => {
                tracing::debug!(key = %key, size = object.buffer.len(), "Cached object");
                true
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Failed to write cache record"
                );
                false
            }
        }
    }

    /// Store `object` under its own name, or the root key when unnamed.
    pub fn cache_object(&self, object: &ParsedObject) -> bool {
        self.put(object, &keys::object_key(object.name.as_deref()))
    }

    /// Remove a cached entry. Returns whether an entry existed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        keys::validate_key(key)?;
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Clear all cached entries. Entries that vanish concurrently are ignored.
    pub fn clear(&self) -> Result<()> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0usize;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let result = match entry.file_type() {
                Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path),
                Ok(_) => fs::remove_file(&path),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(cache = %self.name, removed, "Cleared object cache");
        Ok(())
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", key, RECORD_EXTENSION))
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        match keys::validate_key(key) {
            Ok(()) => Some(self.record_path(key)),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected cache key");
                None
            }
        }
    }

    fn load(&self, key: &str, name: Option<String>) -> Option<ParsedObject> {
        if !self.is_enabled() {
            return None;
        }
        let path = self.entry_path(key)?;

        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {}
            _ => {
                tracing::trace!(key = %key, "Cache miss");
                return None;
            }
        }

        let restored = if self.options.memory_mapped_reads {
            Self::read_mapped(&path, name)
        } else {
            Self::read_eager(&path, name)
        };

        match restored {
            Ok(object) => {
                tracing::debug!(
                    key = %key,
                    vertices = object.vertex_count,
                    mapped = object.buffer.is_mapped(),
                    "Cache hit"
                );
                Some(object)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Ignoring unreadable cache record"
                );
                None
            }
        }
    }

    fn read_eager(path: &Path, name: Option<String>) -> Result<ParsedObject> {
        let mut bytes = fs::read(path)?;
        let header = record::decode_header(&bytes)?;
        bytes.drain(..header.header_len);
        Self::restore(name, header, VertexBuffer::Owned(bytes))
    }

    fn read_mapped(path: &Path, name: Option<String>) -> Result<ParsedObject> {
        let view = MappedView::open(path)?;
        let header = record::decode_header(&view)?;
        let buffer = match header.buffer_len() {
            0 => VertexBuffer::Owned(Vec::new()),
            len => VertexBuffer::Mapped(view.subrange(header.header_len, len)?),
        };
        Self::restore(name, header, buffer)
    }

    fn restore(name: Option<String>, header: record::RecordHeader, buffer: VertexBuffer) -> Result<ParsedObject> {
        let actual = buffer.len();
        ParsedObject::from_cache(name, header.layout, header.vertex_count, buffer).ok_or_else(|| {
            RecordError::SizeMismatch {
                expected: header.buffer_len(),
                actual,
            }
            .into()
        })
    }

    fn write_record(&self, object: &ParsedObject, path: &Path) -> Result<()> {
        let mut temp = tempfile::NamedTempFile::new_in(&self.directory)?;
        record::write_record(&mut temp, object)?;
        temp.flush()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}
