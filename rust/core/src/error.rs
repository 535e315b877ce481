// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for parsing and mapping operations
pub type Result<T> = std::result::Result<T, Error>;

/// Vertex attribute referenced by a face index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Position,
    Normal,
    Texture,
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Attribute::Position => "position",
            Attribute::Normal => "normal",
            Attribute::Texture => "texture",
        })
    }
}

/// Errors that can occur while reading, mapping or packing geometry
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid text encoding: {reason} (valid up to byte {valid_up_to})")]
    Encoding { valid_up_to: usize, reason: String },

    #[error("Memory map failed at offset {offset} (+{len} bytes): {reason}")]
    Map { offset: u64, len: usize, reason: String },

    #[error(
        "Malformed face index: face {face}, vertex {group} references {attribute} {index} \
         but only {available} are defined"
    )]
    MalformedFaceIndex {
        face: usize,
        group: usize,
        attribute: Attribute,
        index: u32,
        available: usize,
    },
}

impl Error {
    /// Create a mapping error
    pub fn map(offset: u64, len: usize, reason: impl Into<String>) -> Self {
        Error::Map {
            offset,
            len,
            reason: reason.into(),
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::Encoding {
            valid_up_to: err.valid_up_to(),
            reason: err.to_string(),
        }
    }
}
