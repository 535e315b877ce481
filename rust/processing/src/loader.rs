// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loading pipeline
//!
//! Scans object boundaries sequentially, then completes every object
//! (cache lookup, parse on miss, cache store) in parallel. Objects own
//! disjoint source ranges and distinct cache keys, so completion needs no
//! locking.

use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use obj_lite_cache::ObjectCache;
use obj_lite_core::{
    GeometryParser, MappedView, ObjectBoundary, ObjectScanner, ParseOptions, ParsedObject,
    Provenance,
};
use rayon::prelude::*;

use crate::error::{LoadError, Result};

/// Accepted text encodings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// 7-bit ASCII only
    Ascii,
    /// UTF-8 (ASCII is a subset)
    #[default]
    Utf8,
}

impl TextEncoding {
    /// Validate `bytes` and view them as text
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<&'a str> {
        if *self == TextEncoding::Ascii {
            if let Some(position) = bytes.iter().position(|b| !b.is_ascii()) {
                return Err(LoadError::Encoding {
                    valid_up_to: position,
                    reason: format!("non-ASCII byte 0x{:02x}", bytes[position]),
                });
            }
        }
        std::str::from_utf8(bytes).map_err(|e| obj_lite_core::Error::from(e).into())
    }
}

/// Loader configuration
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub parse: ParseOptions,
    pub encoding: TextEncoding,
    /// Complete objects on the rayon pool
    pub parallel: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            encoding: TextEncoding::default(),
            parallel: true,
        }
    }
}

/// Where OBJ text comes from
#[derive(Debug, Clone)]
pub enum ObjSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for ObjSource {
    fn from(path: PathBuf) -> Self {
        ObjSource::Path(path)
    }
}

impl From<&Path> for ObjSource {
    fn from(path: &Path) -> Self {
        ObjSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ObjSource {
    fn from(bytes: Vec<u8>) -> Self {
        ObjSource::Bytes(bytes)
    }
}

impl From<&[u8]> for ObjSource {
    fn from(bytes: &[u8]) -> Self {
        ObjSource::Bytes(bytes.to_vec())
    }
}

/// Source bytes; files are mapped rather than read
enum SourceBytes<'a> {
    Borrowed(&'a [u8]),
    Mapped(MappedView),
}

impl Deref for SourceBytes<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            SourceBytes::Borrowed(bytes) => bytes,
            SourceBytes::Mapped(view) => view.as_bytes(),
        }
    }
}

fn read_source(source: &ObjSource) -> Result<SourceBytes<'_>> {
    match source {
        ObjSource::Bytes(bytes) => Ok(SourceBytes::Borrowed(bytes.as_slice())),
        ObjSource::Path(path) => {
            let file = File::open(path)?;
            let len = usize::try_from(file.metadata()?.len()).map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, "file too large to map")
            })?;
            if len == 0 {
                return Ok(SourceBytes::Borrowed(&[]));
            }
            Ok(SourceBytes::Mapped(MappedView::new(Arc::new(file), 0, len)?))
        }
    }
}

/// Load every object of an OBJ source with default options.
pub fn load(source: impl Into<ObjSource>, cache: Option<&ObjectCache>) -> Result<Vec<ParsedObject>> {
    load_with_options(&source.into(), cache, &LoadOptions::default())
}

/// Load every object of an OBJ source, in order of appearance.
pub fn load_with_options(
    source: &ObjSource,
    cache: Option<&ObjectCache>,
    options: &LoadOptions,
) -> Result<Vec<ParsedObject>> {
    let started = Instant::now();
    let bytes = read_source(source)?;
    let text = options.encoding.decode(&bytes)?;

    let boundaries = ObjectScanner::new(text).boundaries();
    let parser = GeometryParser::new(options.parse);
    let complete = |boundary: ObjectBoundary| complete_object(&parser, text.as_bytes(), boundary, cache);

    let objects = if options.parallel && boundaries.len() > 1 {
        boundaries
            .into_par_iter()
            .map(complete)
            .collect::<Result<Vec<_>>>()?
    } else {
        boundaries
            .into_iter()
            .map(complete)
            .collect::<Result<Vec<_>>>()?
    };

    let cached = objects
        .iter()
        .filter(|object| object.provenance == Provenance::Cached)
        .count();
    tracing::info!(
        objects = objects.len(),
        cached,
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Loaded OBJ"
    );

    Ok(objects)
}

/// Resolve one object: cached record if present, otherwise parse and offer
/// the result back to the cache.
fn complete_object(
    parser: &GeometryParser,
    source: &[u8],
    boundary: ObjectBoundary,
    cache: Option<&ObjectCache>,
) -> Result<ParsedObject> {
    let key = ObjectCache::key_for(boundary.name.as_deref());

    if let Some(mut object) = cache.and_then(|cache| cache.get(&key)) {
        object.name = boundary.name;
        return Ok(object);
    }

    let object = parser.parse(source, boundary.name, boundary.range)?;

    if let Some(cache) = cache {
        if !cache.put(&object, &key) && cache.is_enabled() {
            tracing::debug!(
                object = object.name.as_deref().unwrap_or("<root>"),
                "Object not cached"
            );
        }
    }

    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_rejects_multibyte() {
        let err = TextEncoding::Ascii.decode("o Würfel\n".as_bytes()).unwrap_err();
        match err {
            LoadError::Encoding { valid_up_to, .. } => assert_eq!(valid_up_to, 3),
            other => panic!("expected encoding error, got {:?}", other),
        }
        assert!(TextEncoding::Utf8.decode("o Würfel\n".as_bytes()).is_ok());
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            TextEncoding::Utf8.decode(b"v 1 2 \xff\n"),
            Err(LoadError::Encoding { valid_up_to: 6, .. })
        ));
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let text = b"o a\nv 1 2 3\nf 1 1 1\no b\nv 4 5 6\nf 1 1 1\no c\nv 7 8 9\nf 1 1 1\n".to_vec();
        let source = ObjSource::from(text);

        let parallel = load_with_options(&source, None, &LoadOptions::default()).unwrap();
        let sequential = load_with_options(
            &source,
            None,
            &LoadOptions {
                parallel: false,
                ..LoadOptions::default()
            },
        )
        .unwrap();

        assert_eq!(parallel.len(), 3);
        for (p, s) in parallel.iter().zip(&sequential) {
            assert_eq!(p.name, s.name);
            assert_eq!(p.buffer.as_bytes(), s.buffer.as_bytes());
        }
        let names: Vec<_> = parallel.iter().map(|o| o.name.as_deref().unwrap()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
