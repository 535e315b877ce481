// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two-pass OBJ geometry parser
//!
//! Pass 1 sizes every attribute array (counts, component widths, face
//! arity). Pass 2 fills exact-size arrays. Packing then expands every face
//! vertex into an interleaved `position | normal | texture` record. Faces are
//! not welded and no index buffer is produced.

use std::ops::Range;

use crate::error::{Attribute, Error, Result};
use crate::fast_parse::{
    classify, count_vertex_groups, measure_numbers, parse_face, parse_numbers_into, LineKind,
    LineSpans,
};
use crate::object::{ParsedObject, Provenance, VertexBuffer, VertexLayout, COMPONENT_SIZE, NORMAL_COMPONENTS};

const MAX_POSITION_COMPONENTS: usize = 4;
const MAX_TEXTURE_COMPONENTS: usize = 3;

/// How packing treats face indices with no backing data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexPolicy {
    /// Absent, zero and out-of-range indices pack as zero components
    #[default]
    ZeroFill,
    /// Zero or out-of-range position indices and out-of-range normal or
    /// texture indices fail with [`Error::MalformedFaceIndex`]
    Strict,
}

/// Parser configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub index_policy: IndexPolicy,
}

/// Widest line seen for one attribute class
#[derive(Debug, Default)]
struct WidthTracker {
    count: usize,
    width: usize,
    /// Last component shared by every line of maximum width
    trailing: Option<f32>,
}

impl WidthTracker {
    fn observe(&mut self, width: usize, last: f32) {
        self.count += 1;
        if width > self.width {
            self.width = width;
            self.trailing = Some(last);
        } else if width == self.width && width > 0 && self.trailing != Some(last) {
            self.trailing = None;
        }
    }
}

/// Pass 1 results
#[derive(Debug, Default)]
struct Sizing {
    positions: WidthTracker,
    textures: WidthTracker,
    normals: usize,
    faces: usize,
    face_arity: usize,
}

impl Sizing {
    fn scan(bytes: &[u8]) -> Self {
        let mut sizing = Sizing::default();
        for (_, line) in LineSpans::new(bytes) {
            let Some((kind, rest)) = classify(line) else {
                continue;
            };
            match kind {
                LineKind::Position => {
                    let (width, last) = measure_numbers(rest, MAX_POSITION_COMPONENTS);
                    sizing.positions.observe(width, last);
                }
                LineKind::Texture => {
                    let (width, last) = measure_numbers(rest, MAX_TEXTURE_COMPONENTS);
                    sizing.textures.observe(width, last);
                }
                LineKind::Normal => sizing.normals += 1,
                LineKind::Face => {
                    sizing.faces += 1;
                    sizing.face_arity = sizing.face_arity.max(count_vertex_groups(rest));
                }
            }
        }
        sizing
    }

    /// A homogeneous `w` of exactly 1.0 on every widest line is dropped.
    fn position_components(&self) -> usize {
        let tracker = &self.positions;
        if tracker.width == 4 && tracker.trailing == Some(1.0) {
            3
        } else {
            tracker.width.clamp(3, MAX_POSITION_COMPONENTS)
        }
    }

    /// An unused `w` of exactly 0.0 on every widest line is dropped.
    fn texture_components(&self) -> usize {
        let tracker = &self.textures;
        match tracker.width {
            0 => 0,
            3 if tracker.trailing == Some(0.0) => 2,
            width => width.clamp(2, MAX_TEXTURE_COMPONENTS),
        }
    }
}

/// Pass 2 output. Face triples are stored as `(position, normal, texture)`.
#[derive(Debug)]
struct AttributeArrays {
    positions: Vec<f32>,
    normals: Vec<f32>,
    textures: Vec<f32>,
    faces: Vec<[u32; 3]>,
    /// Groups actually written per face; the rest of its slots are padding
    face_sizes: Vec<usize>,
}

impl AttributeArrays {
    fn allocate(sizing: &Sizing, layout: &VertexLayout, arity: usize) -> Self {
        Self {
            positions: vec![0.0; sizing.positions.count * layout.position_components],
            normals: vec![0.0; sizing.normals * NORMAL_COMPONENTS],
            textures: vec![0.0; sizing.textures.count * layout.texture_components],
            faces: vec![[0; 3]; sizing.faces * arity],
            face_sizes: vec![0; sizing.faces],
        }
    }

    fn fill(&mut self, bytes: &[u8], layout: &VertexLayout, arity: usize) {
        let pw = layout.position_components;
        let tw = layout.texture_components;
        let (mut position, mut normal, mut texture, mut face) = (0, 0, 0, 0);

        for (_, line) in LineSpans::new(bytes) {
            let Some((kind, rest)) = classify(line) else {
                continue;
            };
            match kind {
                LineKind::Position => {
                    parse_numbers_into(rest, &mut self.positions[position * pw..(position + 1) * pw]);
                    position += 1;
                }
                LineKind::Normal => {
                    let start = normal * NORMAL_COMPONENTS;
                    parse_numbers_into(rest, &mut self.normals[start..start + NORMAL_COMPONENTS]);
                    normal += 1;
                }
                LineKind::Texture => {
                    parse_numbers_into(rest, &mut self.textures[texture * tw..(texture + 1) * tw]);
                    texture += 1;
                }
                LineKind::Face => {
                    let slots = &mut self.faces[face * arity..(face + 1) * arity];
                    let mut written = 0;
                    for (slot, group) in slots.iter_mut().zip(parse_face(rest)) {
                        *slot = [group.position, group.normal, group.texture];
                        written += 1;
                    }
                    self.face_sizes[face] = written;
                    face += 1;
                }
            }
        }
    }

    fn pack(&self, layout: &VertexLayout, arity: usize, policy: IndexPolicy) -> Result<Vec<u8>> {
        if arity == 0 {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(self.faces.len() * layout.stride());
        for (face, groups) in self.faces.chunks_exact(arity).enumerate() {
            for (group, &[position, normal, texture]) in groups.iter().enumerate() {
                if group >= self.face_sizes[face] {
                    // Padding of a shorter face, never checked against the policy
                    out.resize(out.len() + layout.stride(), 0);
                    continue;
                }
                let mut packer = Packer {
                    out: &mut out,
                    policy,
                    face,
                    group,
                };
                packer.append(&self.positions, position, layout.position_components, Attribute::Position)?;
                packer.append(&self.normals, normal, NORMAL_COMPONENTS, Attribute::Normal)?;
                packer.append(&self.textures, texture, layout.texture_components, Attribute::Texture)?;
            }
        }
        Ok(out)
    }
}

struct Packer<'a> {
    out: &'a mut Vec<u8>,
    policy: IndexPolicy,
    face: usize,
    group: usize,
}

impl Packer<'_> {
    fn append(&mut self, source: &[f32], index: u32, width: usize, attribute: Attribute) -> Result<()> {
        if width == 0 {
            return Ok(());
        }

        let range = (index as usize)
            .checked_sub(1)
            .map(|slot| slot * width..slot * width + width)
            .filter(|range| range.end <= source.len());

        match range {
            Some(range) => self.out.extend_from_slice(bytemuck::cast_slice(&source[range])),
            None => {
                let absent = index == 0 && attribute != Attribute::Position;
                if self.policy == IndexPolicy::Strict && !absent {
                    return Err(Error::MalformedFaceIndex {
                        face: self.face,
                        group: self.group,
                        attribute,
                        index,
                        available: source.len() / width,
                    });
                }
                self.out.resize(self.out.len() + width * COMPONENT_SIZE, 0);
            }
        }
        Ok(())
    }
}

/// Converts the text of one object into an interleaved vertex buffer
#[derive(Debug, Clone, Default)]
pub struct GeometryParser {
    options: ParseOptions,
}

impl GeometryParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse `source[range]` into a packed object.
    ///
    /// The range is clamped to the source. Malformed numbers never fail the
    /// parse; only the strict index policy can.
    pub fn parse(&self, source: &[u8], name: Option<String>, range: Range<usize>) -> Result<ParsedObject> {
        let end = range.end.min(source.len());
        let start = range.start.min(end);
        let bytes = &source[start..end];

        let sizing = Sizing::scan(bytes);
        let arity = sizing.face_arity;
        let layout = VertexLayout {
            position_components: sizing.position_components(),
            texture_components: sizing.texture_components(),
            face_vertex_count: Some(arity),
        };

        let mut arrays = AttributeArrays::allocate(&sizing, &layout, arity);
        arrays.fill(bytes, &layout, arity);
        let buffer = arrays.pack(&layout, arity, self.options.index_policy)?;
        let vertex_count = sizing.faces * arity;

        tracing::debug!(
            object = name.as_deref().unwrap_or("<root>"),
            positions = sizing.positions.count,
            normals = sizing.normals,
            textures = sizing.textures.count,
            faces = sizing.faces,
            vertices = vertex_count,
            "Parsed object"
        );

        Ok(ParsedObject {
            name,
            source_range: Some(start..end),
            layout,
            vertex_count,
            buffer: VertexBuffer::Owned(buffer),
            provenance: Provenance::Parsed,
        })
    }

    /// Parse a whole text as a single unnamed object
    pub fn parse_all(&self, source: &[u8]) -> Result<ParsedObject> {
        self.parse(source, None, 0..source.len())
    }
}
