// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cache configuration.

use std::path::{Path, PathBuf};

const CACHE_SUBDIR: &str = "obj-lite-cache";

/// Process-temporary root that holds one directory per cache namespace
pub fn default_root() -> PathBuf {
    std::env::temp_dir().join(CACHE_SUBDIR)
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Read records through a memory map instead of an eager read.
    pub memory_mapped_reads: bool,
    /// Derive a file's namespace from its contents rather than its path, so
    /// edits to the file invalidate the cache.
    pub hash_file_contents: bool,
    /// Directory under which namespaces are created.
    pub root: PathBuf,
}

impl CacheOptions {
    pub fn with_memory_mapped_reads(mut self, enabled: bool) -> Self {
        self.memory_mapped_reads = enabled;
        self
    }

    pub fn with_hash_file_contents(mut self, enabled: bool) -> Self {
        self.hash_file_contents = enabled;
        self
    }

    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            memory_mapped_reads: true,
            hash_file_contents: false,
            root: default_root(),
        }
    }
}
