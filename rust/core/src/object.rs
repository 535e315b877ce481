// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsed object data structures

use std::ops::{Deref, Range};

use crate::mapped::MappedView;

/// Size of one packed component in bytes (f32)
pub const COMPONENT_SIZE: usize = std::mem::size_of::<f32>();

/// Normals are always packed with three components
pub const NORMAL_COMPONENTS: usize = 3;

/// Attribute layout of an interleaved vertex buffer
///
/// Packed in the following order per vertex:
///   - Position (xyz / xyzw)
///   - Normal (xyz)
///   - Texture (uv / uvw), omitted when `texture_components == 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexLayout {
    /// 3 or 4
    pub position_components: usize,
    /// 0, 2 or 3
    pub texture_components: usize,
    /// Polygon arity shared by every face of the object; `None` when the
    /// object was restored from a cache record that did not store it.
    pub face_vertex_count: Option<usize>,
}

impl VertexLayout {
    pub fn new(position_components: usize, texture_components: usize) -> Self {
        Self {
            position_components,
            texture_components,
            face_vertex_count: None,
        }
    }

    #[inline]
    pub fn normal_components(&self) -> usize {
        NORMAL_COMPONENTS
    }

    /// Floats per vertex
    #[inline]
    pub fn components_per_vertex(&self) -> usize {
        self.position_components + NORMAL_COMPONENTS + self.texture_components
    }

    /// Byte distance between consecutive vertices
    #[inline]
    pub fn stride(&self) -> usize {
        COMPONENT_SIZE * self.components_per_vertex()
    }

    #[inline]
    pub fn position_offset(&self) -> usize {
        0
    }

    #[inline]
    pub fn normal_offset(&self) -> usize {
        COMPONENT_SIZE * self.position_components
    }

    #[inline]
    pub fn texture_coord_offset(&self) -> usize {
        COMPONENT_SIZE * (self.position_components + NORMAL_COMPONENTS)
    }
}

/// Where a [`ParsedObject`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Parsed from source text in this process
    Parsed,
    /// Restored from a cache record; the source text was never read
    Cached,
}

/// Packed vertex bytes, either owned or aliasing a file mapping
#[derive(Debug)]
pub enum VertexBuffer {
    Owned(Vec<u8>),
    Mapped(MappedView),
}

impl VertexBuffer {
    /// True when the bytes alias a file mapping
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self, VertexBuffer::Mapped(_))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            VertexBuffer::Owned(bytes) => bytes.as_slice(),
            VertexBuffer::Mapped(view) => view.as_bytes(),
        }
    }

    /// Zero-copy float view, available when the bytes are 4-byte aligned
    pub fn as_floats(&self) -> Option<&[f32]> {
        bytemuck::try_cast_slice(self.as_bytes()).ok()
    }

    /// Copy the buffer out as floats regardless of alignment
    pub fn to_floats(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(self.as_bytes())
    }

    /// Take ownership of the bytes, copying only if mapped
    pub fn into_owned(self) -> Vec<u8> {
        match self {
            VertexBuffer::Owned(bytes) => bytes,
            VertexBuffer::Mapped(view) => view.to_vec(),
        }
    }
}

impl Deref for VertexBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for VertexBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Cloning a mapped buffer materializes a private copy.
impl Clone for VertexBuffer {
    fn clone(&self) -> Self {
        VertexBuffer::Owned(self.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for VertexBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        VertexBuffer::Owned(bytes)
    }
}

impl From<MappedView> for VertexBuffer {
    fn from(view: MappedView) -> Self {
        VertexBuffer::Mapped(view)
    }
}

/// One object of an OBJ file, packed for drawing.
///
/// Example upload with glow-style bindings:
/// `vertex_attrib_pointer(POSITION, obj.position_size(), FLOAT, false, obj.stride(), obj.position_offset())`
#[derive(Debug, Clone)]
pub struct ParsedObject {
    /// Object name from the `o` directive, `None` for the root object
    pub name: Option<String>,
    /// Bytes of the source text this object was parsed from
    pub source_range: Option<Range<usize>>,
    pub layout: VertexLayout,
    /// Number of vertices in `buffer`
    pub vertex_count: usize,
    pub buffer: VertexBuffer,
    pub provenance: Provenance,
}

impl ParsedObject {
    /// Restore an object from cached parts.
    ///
    /// Returns `None` when the buffer length disagrees with the layout.
    pub fn from_cache(
        name: Option<String>,
        layout: VertexLayout,
        vertex_count: usize,
        buffer: VertexBuffer,
    ) -> Option<Self> {
        let expected = vertex_count.checked_mul(layout.stride())?;
        if buffer.len() != expected {
            return None;
        }
        Some(Self {
            name,
            source_range: None,
            layout,
            vertex_count,
            buffer,
            provenance: Provenance::Cached,
        })
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    #[inline]
    pub fn position_size(&self) -> usize {
        self.layout.position_components
    }

    #[inline]
    pub fn normal_size(&self) -> usize {
        self.layout.normal_components()
    }

    #[inline]
    pub fn texture_coord_size(&self) -> usize {
        self.layout.texture_components
    }

    #[inline]
    pub fn position_offset(&self) -> usize {
        self.layout.position_offset()
    }

    #[inline]
    pub fn normal_offset(&self) -> usize {
        self.layout.normal_offset()
    }

    #[inline]
    pub fn texture_coord_offset(&self) -> usize {
        self.layout.texture_coord_offset()
    }

    /// Vertex count for a non-indexed draw call (not bytes)
    #[inline]
    pub fn len(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    /// Number of faces, when the arity is known
    pub fn face_count(&self) -> Option<usize> {
        self.layout
            .face_vertex_count
            .filter(|&arity| arity > 0)
            .map(|arity| self.vertex_count / arity)
    }

    /// Packed floats of vertex `index`
    pub fn vertex(&self, index: usize) -> Option<Vec<f32>> {
        let stride = self.stride();
        let start = index.checked_mul(stride)?;
        let end = start.checked_add(stride)?;
        let bytes = self.buffer.get(start..end)?;
        Some(bytemuck::pod_collect_to_vec(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_offsets() {
        let layout = VertexLayout::new(3, 2);
        assert_eq!(layout.stride(), 32);
        assert_eq!(layout.position_offset(), 0);
        assert_eq!(layout.normal_offset(), 12);
        assert_eq!(layout.texture_coord_offset(), 24);

        let homogeneous = VertexLayout::new(4, 0);
        assert_eq!(homogeneous.stride(), 28);
        assert_eq!(homogeneous.texture_coord_offset(), 28);
    }

    #[test]
    fn test_from_cache_checks_length() {
        let layout = VertexLayout::new(3, 0);
        assert!(ParsedObject::from_cache(None, layout, 2, vec![0u8; 48].into()).is_some());
        assert!(ParsedObject::from_cache(None, layout, 2, vec![0u8; 47].into()).is_none());
    }

    #[test]
    fn test_vertex_accessor() {
        let floats: [f32; 6] = [1.0, 2.0, 3.0, 0.0, 0.0, 1.0];
        let bytes = bytemuck::cast_slice::<f32, u8>(&floats).to_vec();
        let object =
            ParsedObject::from_cache(Some("tri".into()), VertexLayout::new(3, 0), 1, bytes.into())
                .unwrap();

        assert_eq!(object.vertex(0), Some(floats.to_vec()));
        assert_eq!(object.vertex(1), None);
        assert_eq!(object.provenance, Provenance::Cached);
        assert_eq!(object.face_count(), None);
    }

    #[test]
    fn test_clone_materializes() {
        let buffer = VertexBuffer::Owned(vec![1, 2, 3, 4]);
        let copy = buffer.clone();
        assert!(!copy.is_mapped());
        assert_eq!(copy.as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(buffer.into_owned(), vec![1, 2, 3, 4]);
    }
}
