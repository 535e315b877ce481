// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for loading
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors surfaced by the loading pipeline
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid text encoding: {reason} (valid up to byte {valid_up_to})")]
    Encoding { valid_up_to: usize, reason: String },

    #[error("Core error: {0}")]
    Core(obj_lite_core::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] obj_lite_cache::Error),
}

impl From<obj_lite_core::Error> for LoadError {
    fn from(err: obj_lite_core::Error) -> Self {
        match err {
            obj_lite_core::Error::Io(e) => LoadError::Io(e),
            obj_lite_core::Error::Encoding { valid_up_to, reason } => {
                LoadError::Encoding { valid_up_to, reason }
            }
            other => LoadError::Core(other),
        }
    }
}
