// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the object cache.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Cache error types.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot create cache directory {}: {source}", .path.display())]
    CacheDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Invalid cache record: {0}")]
    Record(#[from] RecordError),

    #[error("Core error: {0}")]
    Core(#[from] obj_lite_core::Error),
}

/// Reasons a cache record fails validation. Readers treat all of them as a
/// cache miss.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record truncated: needed {needed} bytes, found {available}")]
    Truncated { needed: usize, available: usize },

    #[error("malformed length field: {0}")]
    BadLength(String),

    #[error("metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("unsupported layout: {0}")]
    Layout(String),

    #[error("payload is {actual} bytes, metadata describes {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}
