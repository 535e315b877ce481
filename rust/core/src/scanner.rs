// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object boundary scanner
//!
//! Finds `o <name>` directives and yields the byte range each object owns.
//! The scan is sequential by nature: an object's end is only known once the
//! next directive has been found.

use std::ops::Range;

use crate::fast_parse::LineSpans;

const OBJECT_DIRECTIVE: &[u8] = b"o ";

/// A named (or root) object and the byte range of its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectBoundary {
    /// `None` only for the root object of a text with no directives; a
    /// blank `o ` line gives `Some("")`
    pub name: Option<String>,
    /// Starts after the directive's line terminator, ends at the next
    /// directive or end of text
    pub range: Range<usize>,
}

#[derive(Debug, Clone)]
struct Directive {
    /// Offset of the `o` line
    line_start: usize,
    /// Offset just past the line terminator
    body_start: usize,
    name: String,
}

#[derive(Debug, Clone)]
enum State {
    Start,
    Open(Directive),
    Done,
}

/// Fast object scanner - O(n) over the text, no parsing of geometry
pub struct ObjectScanner<'a> {
    content: &'a str,
    state: State,
}

impl<'a> ObjectScanner<'a> {
    /// Create a new scanner
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            state: State::Start,
        }
    }

    /// Scan for the next object boundary
    pub fn next_object(&mut self) -> Option<ObjectBoundary> {
        let len = self.content.len();
        match std::mem::replace(&mut self.state, State::Done) {
            State::Done => None,
            State::Start => match self.find_directive(0) {
                Some(first) => {
                    self.state = State::Open(first);
                    self.next_object()
                }
                None => Some(ObjectBoundary {
                    name: None,
                    range: 0..len,
                }),
            },
            State::Open(current) => {
                let end = match self.find_directive(current.body_start) {
                    Some(next) => {
                        let end = next.line_start;
                        self.state = State::Open(next);
                        end
                    }
                    None => len,
                };
                Some(ObjectBoundary {
                    name: Some(current.name),
                    range: current.body_start..end,
                })
            }
        }
    }

    /// Collect every remaining boundary in order
    pub fn boundaries(&mut self) -> Vec<ObjectBoundary> {
        std::iter::from_fn(|| self.next_object()).collect()
    }

    /// Reset scanner to beginning
    pub fn reset(&mut self) {
        self.state = State::Start;
    }

    fn find_directive(&self, from: usize) -> Option<Directive> {
        let bytes = self.content.as_bytes();
        LineSpans::new(&bytes[from..]).find_map(|(offset, line)| {
            if !line.starts_with(OBJECT_DIRECTIVE) {
                return None;
            }
            let line_start = from + offset;
            let body_start = memchr::memchr(b'\n', &bytes[line_start..])
                .map_or(bytes.len(), |newline| line_start + newline + 1);
            // Bounded by ASCII bytes of a &str, so always valid UTF-8.
            let name = String::from_utf8_lossy(&line[OBJECT_DIRECTIVE.len()..])
                .trim()
                .to_string();
            Some(Directive {
                line_start,
                body_start,
                name,
            })
        })
    }
}

impl Iterator for ObjectScanner<'_> {
    type Item = ObjectBoundary;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_directive_is_single_root_object() {
        let content = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let boundaries = ObjectScanner::new(content).boundaries();

        assert_eq!(
            boundaries,
            vec![ObjectBoundary {
                name: None,
                range: 0..content.len()
            }]
        );
    }

    #[test]
    fn test_empty_text_is_single_root_object() {
        let boundaries = ObjectScanner::new("").boundaries();
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].range, 0..0);
    }

    #[test]
    fn test_named_objects() {
        let content = "# header\no Cube\nv 0 0 0\no  Plane \r\nv 1 1 1\nf 1 1 1\n";
        let mut scanner = ObjectScanner::new(content);

        let cube = scanner.next_object().unwrap();
        assert_eq!(cube.name.as_deref(), Some("Cube"));
        assert_eq!(&content[cube.range.clone()], "v 0 0 0\n");

        let plane = scanner.next_object().unwrap();
        assert_eq!(plane.name.as_deref(), Some("Plane"));
        assert_eq!(&content[plane.range.clone()], "v 1 1 1\nf 1 1 1\n");
        assert_eq!(plane.range.end, content.len());

        assert!(scanner.next_object().is_none());
        assert!(scanner.next_object().is_none());

        scanner.reset();
        assert_eq!(scanner.count(), 2);
    }

    #[test]
    fn test_directive_on_last_line() {
        let content = "o First\nv 1 2 3\no Last";
        let boundaries = ObjectScanner::new(content).boundaries();

        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].range, 8..16);
        assert_eq!(boundaries[1].name.as_deref(), Some("Last"));
        assert_eq!(boundaries[1].range, content.len()..content.len());
    }

    #[test]
    fn test_only_line_start_directives_count() {
        let content = "v 1 2 3 # o not-an-object\n o indented\nobject\n";
        let boundaries = ObjectScanner::new(content).boundaries();
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].name, None);
    }

    #[test]
    fn test_blank_directive_is_not_the_root_object() {
        let content = "o \nv 0 0 0\no Named\nv 1 1 1\n";
        let boundaries = ObjectScanner::new(content).boundaries();

        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].name.as_deref(), Some(""));
        assert_eq!(&content[boundaries[0].range.clone()], "v 0 0 0\n");
        assert_eq!(boundaries[1].name.as_deref(), Some("Named"));
    }

    #[test]
    fn test_unicode_names() {
        let content = "o Würfel\nv 0 0 0\n";
        let boundaries = ObjectScanner::new(content).boundaries();
        assert_eq!(boundaries[0].name.as_deref(), Some("Würfel"));
    }
}
