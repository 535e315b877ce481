// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only memory-mapped file views
//!
//! A [`MappedView`] maps `[offset, offset + len)` of a file and derefs to the
//! mapped bytes. Sub-ranges establish their own independent mapping over the
//! same file handle instead of borrowing the parent, so a sub-view can outlive
//! the view it was cut from. Copies are always explicit (`to_vec`).

use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use memmap2::{Mmap, MmapOptions};

use crate::error::{Error, Result};

/// Zero-copy view over a region of a file
pub struct MappedView {
    file: Arc<File>,
    offset: u64,
    map: Mmap,
}

impl MappedView {
    /// Map an entire file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::map(0, 0, format!("cannot open {}: {}", path.display(), e))
        })?;
        let len = file_len(&file, 0, 0)?;
        Self::new(Arc::new(file), 0, len)
    }

    /// Map `[offset, offset + len)` of an open file.
    pub fn new(file: Arc<File>, offset: u64, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::map(offset, len, "cannot map an empty range"));
        }

        let file_len = file_len(&file, offset, len)?;
        let end = offset
            .checked_add(len as u64)
            .ok_or_else(|| Error::map(offset, len, "range overflows"))?;
        if end > file_len as u64 {
            return Err(Error::map(
                offset,
                len,
                format!("range ends at {} but file is {} bytes", end, file_len),
            ));
        }

        // SAFETY: the mapping is read-only and private to this view. Cache
        // records are replaced by rename, never rewritten in place, so the
        // mapped pages do not change underneath us.
        let map = unsafe { MmapOptions::new().offset(offset).len(len).map(&*file) }
            .map_err(|e| Error::map(offset, len, e.to_string()))?;

        Ok(Self { file, offset, map })
    }

    /// Map a sub-range of this view.
    ///
    /// `offset` is relative to this view; the result owns a new mapping at the
    /// composed absolute offset.
    pub fn subrange(&self, offset: usize, len: usize) -> Result<Self> {
        let within = offset
            .checked_add(len)
            .map_or(false, |end| end <= self.len());
        if !within {
            return Err(Error::map(
                self.offset + offset as u64,
                len,
                format!("sub-range exceeds view of {} bytes", self.len()),
            ));
        }
        Self::new(Arc::clone(&self.file), self.offset + offset as u64, len)
    }

    /// Absolute byte offset of this view in the file
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.map
    }

    /// Materialize a private, owned copy of the mapped bytes
    pub fn to_vec(&self) -> Vec<u8> {
        self.map.to_vec()
    }

    /// The file handle backing this view
    pub fn file(&self) -> &Arc<File> {
        &self.file
    }
}

fn file_len(file: &File, offset: u64, len: usize) -> Result<usize> {
    let metadata = file
        .metadata()
        .map_err(|e| Error::map(offset, len, format!("cannot size file: {}", e)))?;
    usize::try_from(metadata.len())
        .map_err(|_| Error::map(offset, len, "file too large to map"))
}

impl Deref for MappedView {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.map
    }
}

impl AsRef<[u8]> for MappedView {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.map
    }
}

impl fmt::Debug for MappedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedView")
            .field("offset", &self.offset)
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for MappedView {
    fn drop(&mut self) {
        // memmap2 unmaps when `map` drops and swallows munmap failures.
        tracing::trace!(offset = self.offset, len = self.len(), "Unmapping view");
    }
}
