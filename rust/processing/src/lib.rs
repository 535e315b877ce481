// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loading pipeline shared by hosts of OBJ-Lite.
//!
//! ```rust,ignore
//! use obj_lite_processing::ObjFile;
//!
//! let file = ObjFile::open("models/scene.obj");
//! for object in file.objects()? {
//!     upload(object.buffer.as_bytes(), object.stride(), object.len());
//! }
//! ```

pub mod error;
pub mod file;
pub mod loader;

pub use error::{LoadError, Result};
pub use file::ObjFile;
pub use loader::{load, load_with_options, LoadOptions, ObjSource, TextEncoding};

pub use obj_lite_cache::{CacheOptions, ObjectCache};
pub use obj_lite_core::{ParsedObject, Provenance, VertexLayout};
