// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A Wavefront `.obj` file with lazily loaded objects.

use std::path::Path;

use obj_lite_cache::{CacheOptions, ObjectCache};
use obj_lite_core::ParsedObject;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::loader::{load_with_options, LoadOptions, ObjSource};

/// A Wavefront `.obj` file.
///
/// Objects are loaded on first access and kept for the lifetime of the file.
/// A failed load is not remembered, so the next access retries.
pub struct ObjFile {
    source: ObjSource,
    cache: Option<ObjectCache>,
    options: LoadOptions,
    objects: OnceCell<Vec<ParsedObject>>,
    by_name: OnceCell<FxHashMap<String, usize>>,
}

impl ObjFile {
    /// Open a file with its default cache.
    ///
    /// If the cache cannot be created the file loads without one.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let cache = match ObjectCache::for_file(path, CacheOptions::default()) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Loading without cache"
                );
                None
            }
        };
        Self::with_cache(path, cache)
    }

    /// Open a file with a default cache built from `options`.
    pub fn open_with_options(path: impl AsRef<Path>, options: CacheOptions) -> Result<Self> {
        let path = path.as_ref();
        let cache = ObjectCache::for_file(path, options)?;
        Ok(Self::with_cache(path, Some(cache)))
    }

    /// Open a file with an explicit cache; `None` disables caching.
    pub fn with_cache(path: impl AsRef<Path>, cache: Option<ObjectCache>) -> Self {
        Self::new(ObjSource::from(path.as_ref()), cache)
    }

    /// Wrap in-memory OBJ text.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, cache: Option<ObjectCache>) -> Self {
        Self::new(ObjSource::Bytes(bytes.into()), cache)
    }

    fn new(source: ObjSource, cache: Option<ObjectCache>) -> Self {
        Self {
            source,
            cache,
            options: LoadOptions::default(),
            objects: OnceCell::new(),
            by_name: OnceCell::new(),
        }
    }

    /// Replace the load options. Has no effect once objects are loaded.
    pub fn with_load_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &ObjSource {
        &self.source
    }

    pub fn cache(&self) -> Option<&ObjectCache> {
        self.cache.as_ref()
    }

    /// True once objects have been loaded
    pub fn is_loaded(&self) -> bool {
        self.objects.get().is_some()
    }

    /// Objects in order of appearance, loading them on first call.
    pub fn objects(&self) -> Result<&[ParsedObject]> {
        self.objects
            .get_or_try_init(|| load_with_options(&self.source, self.cache.as_ref(), &self.options))
            .map(Vec::as_slice)
    }

    /// The first object with this name
    pub fn object(&self, name: &str) -> Result<Option<&ParsedObject>> {
        let objects = self.objects()?;
        let index = self.by_name.get_or_init(|| {
            let mut index = FxHashMap::default();
            for (position, object) in objects.iter().enumerate() {
                if let Some(name) = &object.name {
                    index.entry(name.clone()).or_insert(position);
                }
            }
            index
        });
        Ok(index.get(name).map(|&position| &objects[position]))
    }

    /// The unnamed object, present only when the file has no `o` directives
    pub fn root_object(&self) -> Result<Option<&ParsedObject>> {
        Ok(self.objects()?.iter().find(|object| object.name.is_none()))
    }

    /// Take the loaded objects, loading them first if needed.
    pub fn into_objects(self) -> Result<Vec<ParsedObject>> {
        match self.objects.into_inner() {
            Some(objects) => Ok(objects),
            None => load_with_options(&self.source, self.cache.as_ref(), &self.options),
        }
    }
}

impl std::fmt::Debug for ObjFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjFile")
            .field("source", &match &self.source {
                ObjSource::Path(path) => path.display().to_string(),
                ObjSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            })
            .field("cache", &self.cache.as_ref().map(ObjectCache::name))
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
