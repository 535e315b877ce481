// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary cache record format.
//!
//! ```text
//! byte[2]   length-of-length: 2 ASCII decimal digits = N
//! byte[N]   metadata length: N ASCII decimal digits = M
//! byte[M]   metadata block (JSON object, space padded)
//! byte[..]  packed interleaved vertex buffer, host-native f32
//! ```
//!
//! The metadata block is padded with trailing spaces so the payload starts on
//! a 4-byte boundary; a mapped payload can then be viewed as `&[f32]`
//! directly. Records are host-native and not portable across byte orders.

use std::io::Write;

use obj_lite_core::{ParsedObject, VertexLayout};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Width of the length-of-length field
pub const LENGTH_OF_LENGTH_DIGITS: usize = 2;

/// Alignment of the payload within a record
pub const PAYLOAD_ALIGNMENT: usize = std::mem::align_of::<f32>();

/// Metadata block contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub position_components: i32,
    pub texture_components: i32,
    pub vertex_count: i64,
    /// Absent in records written before face arity was stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_vertex_count: Option<i32>,
}

impl RecordMetadata {
    pub fn from_object(object: &ParsedObject) -> Self {
        Self {
            position_components: object.layout.position_components as i32,
            texture_components: object.layout.texture_components as i32,
            vertex_count: object.vertex_count as i64,
            face_vertex_count: object.layout.face_vertex_count.map(|arity| arity as i32),
        }
    }

    fn validate(&self) -> Result<(VertexLayout, usize), RecordError> {
        if !matches!(self.position_components, 3 | 4) {
            return Err(RecordError::Layout(format!(
                "positionComponents = {}",
                self.position_components
            )));
        }
        if !matches!(self.texture_components, 0 | 2 | 3) {
            return Err(RecordError::Layout(format!(
                "textureComponents = {}",
                self.texture_components
            )));
        }
        let vertex_count = usize::try_from(self.vertex_count)
            .map_err(|_| RecordError::Layout(format!("vertexCount = {}", self.vertex_count)))?;
        let face_vertex_count = self
            .face_vertex_count
            .map(|arity| {
                usize::try_from(arity)
                    .map_err(|_| RecordError::Layout(format!("faceVertexCount = {}", arity)))
            })
            .transpose()?;

        let layout = VertexLayout {
            position_components: self.position_components as usize,
            texture_components: self.texture_components as usize,
            face_vertex_count,
        };
        Ok((layout, vertex_count))
    }
}

/// A validated record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub layout: VertexLayout,
    pub vertex_count: usize,
    /// Offset of the payload from the start of the record
    pub header_len: usize,
}

impl RecordHeader {
    /// Payload size in bytes
    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.vertex_count * self.layout.stride()
    }
}

/// Encode the framing and metadata block for `object`.
pub fn encode_header(object: &ParsedObject) -> Result<Vec<u8>, RecordError> {
    let metadata = serde_json::to_vec(&RecordMetadata::from_object(object))?;

    // Padding can change the digit count of the length, so search upward.
    let mut padding = 0;
    loop {
        let metadata_len = metadata.len() + padding;
        let digits = metadata_len.to_string();
        let header_len = LENGTH_OF_LENGTH_DIGITS + digits.len() + metadata_len;
        if header_len % PAYLOAD_ALIGNMENT == 0 {
            let mut header = Vec::with_capacity(header_len);
            header.extend_from_slice(format!("{:02}", digits.len()).as_bytes());
            header.extend_from_slice(digits.as_bytes());
            header.extend_from_slice(&metadata);
            header.resize(header_len, b' ');
            return Ok(header);
        }
        padding += 1;
    }
}

/// Write a complete record for `object`.
pub fn write_record<W: Write>(writer: &mut W, object: &ParsedObject) -> std::io::Result<()> {
    let header = encode_header(object)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_all(&header)?;
    writer.write_all(object.buffer.as_bytes())?;
    Ok(())
}

/// Encode a complete record into memory.
pub fn encode(object: &ParsedObject) -> Result<Vec<u8>, RecordError> {
    let mut record = encode_header(object)?;
    record.extend_from_slice(object.buffer.as_bytes());
    Ok(record)
}

/// Parse and validate the header of a complete record.
///
/// Every length field is checked against `record.len()`, so a truncated or
/// tampered file fails here instead of producing a short buffer.
pub fn decode_header(record: &[u8]) -> Result<RecordHeader, RecordError> {
    let digits = decimal_field(record, 0, LENGTH_OF_LENGTH_DIGITS)?;
    if digits == 0 || digits > 20 {
        return Err(RecordError::BadLength(format!("length-of-length {}", digits)));
    }

    let metadata_start = LENGTH_OF_LENGTH_DIGITS + digits;
    let metadata_len = decimal_field(record, LENGTH_OF_LENGTH_DIGITS, digits)?;
    let header_len = metadata_start
        .checked_add(metadata_len)
        .ok_or_else(|| RecordError::BadLength(format!("metadata length {}", metadata_len)))?;
    let metadata_bytes = record.get(metadata_start..header_len).ok_or(RecordError::Truncated {
        needed: header_len,
        available: record.len(),
    })?;

    let metadata: RecordMetadata = serde_json::from_slice(metadata_bytes)?;
    let (layout, vertex_count) = metadata.validate()?;

    let expected = vertex_count
        .checked_mul(layout.stride())
        .ok_or_else(|| RecordError::Layout(format!("vertexCount = {}", vertex_count)))?;
    let actual = record.len() - header_len;
    if expected != actual {
        return Err(RecordError::SizeMismatch { expected, actual });
    }

    Ok(RecordHeader {
        layout,
        vertex_count,
        header_len,
    })
}

fn decimal_field(record: &[u8], start: usize, len: usize) -> Result<usize, RecordError> {
    let field = record.get(start..start + len).ok_or(RecordError::Truncated {
        needed: start + len,
        available: record.len(),
    })?;
    if !field.iter().all(u8::is_ascii_digit) {
        return Err(RecordError::BadLength(format!(
            "non-decimal field {:?}",
            String::from_utf8_lossy(field)
        )));
    }
    // All digits, so the only failure left is overflow.
    std::str::from_utf8(field)
        .ok()
        .and_then(|digits| digits.parse::<usize>().ok())
        .ok_or_else(|| RecordError::BadLength("length overflows".to_string()))
}
