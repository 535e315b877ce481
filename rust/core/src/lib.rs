// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # OBJ-Lite Core Parser
//!
//! Two-pass Wavefront OBJ parser that turns each object of a file into a
//! single interleaved, GPU-ready vertex buffer.
//!
//! ## Overview
//!
//! - **Object Scanning**: [memchr](https://docs.rs/memchr)-driven discovery of
//!   `o` directives and the byte range each object owns
//! - **Two-Pass Parsing**: a sizing pass computes counts, component widths
//!   and face arity, a fill pass writes exact-size arrays
//! - **Packing**: every face vertex is expanded to `position | normal |
//!   texture` floats; no welding, no index buffer
//! - **Mapped Views**: read-only [memmap2](https://docs.rs/memmap2) views with
//!   independent, zero-copy sub-ranges
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use obj_lite_core::{GeometryParser, ObjectScanner};
//!
//! let content = "o Tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
//! let parser = GeometryParser::default();
//!
//! for boundary in ObjectScanner::new(content) {
//!     let object = parser.parse(content.as_bytes(), boundary.name, boundary.range)?;
//!     println!("{:?}: {} vertices, stride {}", object.name, object.len(), object.stride());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for [`VertexLayout`]

pub mod error;
pub mod fast_parse;
pub mod mapped;
pub mod object;
pub mod parser;
pub mod scanner;

pub use error::{Attribute, Error, Result};
pub use fast_parse::{LineKind, VertexGroup};
pub use mapped::MappedView;
pub use object::{ParsedObject, Provenance, VertexBuffer, VertexLayout, COMPONENT_SIZE, NORMAL_COMPONENTS};
pub use parser::{GeometryParser, IndexPolicy, ParseOptions};
pub use scanner::{ObjectBoundary, ObjectScanner};
