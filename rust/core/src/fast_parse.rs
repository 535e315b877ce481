// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast Direct Parsing Module
//!
//! Line splitting, statement classification and token parsing for OBJ text.
//! Everything here works on raw bytes and never allocates per token; the
//! parser calls into it twice per line (sizing and fill).

use nom::{
    character::complete::{char, digit1},
    combinator::{map, opt},
    sequence::{preceded, tuple},
    IResult,
};
use smallvec::SmallVec;

/// Statement kinds the parser cares about. Everything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `v x y z [w]`
    Position,
    /// `vn x y z`
    Normal,
    /// `vt u [v [w]]`
    Texture,
    /// `f a b c ...`
    Face,
}

/// One face token, e.g. `3/1/2`. Absent fields are `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexGroup {
    pub position: u32,
    pub texture: u32,
    pub normal: u32,
}

/// Iterator over `(byte_offset, line)` pairs.
///
/// Lines exclude their terminator; a trailing `\r` is stripped so CRLF files
/// classify the same way as LF files.
pub struct LineSpans<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> LineSpans<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }
}

impl<'a> Iterator for LineSpans<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.bytes.len() {
            return None;
        }
        let start = self.position;
        let rest = &self.bytes[start..];
        let (line, consumed) = match memchr::memchr(b'\n', rest) {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.position += consumed;
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some((start, line))
    }
}

/// Split a line on ASCII whitespace, skipping empty tokens
#[inline]
pub fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
}

/// Classify a line by its leading keyword.
///
/// Returns the kind and the remainder of the line after the keyword.
#[inline]
pub fn classify(line: &[u8]) -> Option<(LineKind, &[u8])> {
    let start = line.iter().position(|b| !b.is_ascii_whitespace())?;
    let line = &line[start..];
    let end = line
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(line.len());

    let kind = match &line[..end] {
        b"v" => LineKind::Position,
        b"vn" => LineKind::Normal,
        b"vt" => LineKind::Texture,
        b"f" => LineKind::Face,
        _ => return None,
    };
    Some((kind, &line[end..]))
}

/// Parse a single float token. Malformed tokens yield `None`.
#[inline]
pub fn parse_float(token: &[u8]) -> Option<f32> {
    fast_float::parse::<f32, _>(token).ok()
}

/// Count numeric tokens in an attribute line, stopping at `limit`.
///
/// Returns the count and the value of the last counted token (0.0 when none).
pub fn measure_numbers(rest: &[u8], limit: usize) -> (usize, f32) {
    tokens(rest)
        .filter_map(parse_float)
        .take(limit)
        .fold((0, 0.0), |(count, _), value| (count + 1, value))
}

/// Parse up to `out.len()` numeric tokens into `out`.
///
/// Non-numeric tokens are skipped; slots without a matching token keep their
/// current value.
pub fn parse_numbers_into(rest: &[u8], out: &mut [f32]) {
    for (slot, value) in out.iter_mut().zip(tokens(rest).filter_map(parse_float)) {
        *slot = value;
    }
}

/// Parse an optional decimal index. Missing or unparsable digits give `0`.
fn index_field(input: &[u8]) -> IResult<&[u8], u32> {
    map(opt(digit1), |digits: Option<&[u8]>| {
        digits
            .and_then(|d| lexical_core::parse::<u32>(d).ok())
            .unwrap_or(0)
    })(input)
}

fn vertex_group(input: &[u8]) -> IResult<&[u8], VertexGroup> {
    map(
        tuple((
            index_field,
            opt(preceded(char('/'), index_field)),
            opt(preceded(char('/'), index_field)),
        )),
        |(position, texture, normal)| VertexGroup {
            position,
            texture: texture.unwrap_or(0),
            normal: normal.unwrap_or(0),
        },
    )(input)
}

/// Parse a face token in `position/texture/normal` order.
///
/// Anything after the third field is ignored. A token the grammar cannot
/// start on (e.g. a negative index) yields an all-zero group.
#[inline]
pub fn parse_vertex_group(token: &[u8]) -> VertexGroup {
    vertex_group(token)
        .map(|(_, group)| group)
        .unwrap_or_default()
}

/// Number of vertex-groups on a face line
#[inline]
pub fn count_vertex_groups(rest: &[u8]) -> usize {
    tokens(rest).count()
}

/// Parse every vertex-group on a face line
pub fn parse_face(rest: &[u8]) -> SmallVec<[VertexGroup; 4]> {
    tokens(rest).map(parse_vertex_group).collect()
}
