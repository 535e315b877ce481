// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # OBJ-Lite Cache
//!
//! Persists packed objects so later loads of the same file skip parsing.
//!
//! - **Namespaces**: one directory per source file, named by a SHA-256 digest
//!   of the file's path or contents
//! - **Records**: compact length-prefixed binary records
//!   (see [`record`]) holding layout metadata and the raw vertex buffer
//! - **Reads**: eager reads into owned buffers, or memory-mapped reads whose
//!   buffers alias the record file without copying
//!
//! ```rust,ignore
//! use obj_lite_cache::{CacheOptions, ObjectCache};
//!
//! let cache = ObjectCache::for_file("models/cube.obj", CacheOptions::default())?;
//! if let Some(cube) = cache.cached_object_for_name("Cube") {
//!     upload(cube.buffer.as_bytes(), cube.stride());
//! }
//! ```

pub mod error;
pub mod keys;
pub mod options;
pub mod record;
pub mod store;

pub use error::{Error, RecordError, Result};
pub use keys::ROOT_OBJECT_KEY;
pub use options::{default_root, CacheOptions};
pub use store::ObjectCache;
