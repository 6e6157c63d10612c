//! Flattened chapter content addressed line by line.
//!
//! Pagination does not care what a line says, only which element owns it and
//! how many lines each element contributes. A chapter is a flat element
//! sequence; a cursor addresses one logical line inside it.

use serde::{Deserialize, Serialize};

use crate::linebreak::StyledLine;

/// Horizontal placement of a special block's lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlignment {
    #[default]
    Left,
    Centered,
    Right,
}

/// Which kind of special block produced the lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialKind {
    Code,
    Letter,
    Sign,
}

/// Chapter heading element. Always the first element of a chapter stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionElement {
    pub chapter_number: usize,
    /// Heading lines; the first is the chapter number line.
    pub lines: Vec<StyledLine>,
}

/// Body paragraph broken into justified lines.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParagraphElement {
    pub lines: Vec<StyledLine>,
    pub width_mm: f32,
    pub indent_mm: f32,
}

/// Code block, letter or sign: pre-broken ragged lines with their own
/// indent and alignment.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecialElement {
    pub kind: SpecialKind,
    pub lines: Vec<StyledLine>,
    pub extra_indent_mm: f32,
    pub alignment: TextAlignment,
}

/// Vertical spacer of one or more empty lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyLineElement {
    pub count: usize,
}

/// One element of a chapter's flattened content stream.
#[derive(Clone, Debug, PartialEq)]
pub enum TextElement {
    Section(SectionElement),
    Paragraph(ParagraphElement),
    Special(SpecialElement),
    Empty(EmptyLineElement),
}

impl TextElement {
    /// Logical lines this element contributes to a page.
    pub fn line_count(&self) -> usize {
        match self {
            TextElement::Section(s) => s.lines.len(),
            TextElement::Paragraph(p) => p.lines.len(),
            TextElement::Special(s) => s.lines.len(),
            TextElement::Empty(e) => e.count,
        }
    }

    pub fn is_empty_line(&self) -> bool {
        matches!(self, TextElement::Empty(_))
    }
}

/// Position of one logical line inside an element stream.
///
/// `element == elements.len()` with `line == 0` is the end-of-stream
/// sentinel.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ElementCursor {
    pub element: usize,
    pub line: usize,
}

impl ElementCursor {
    /// Cursor at the first line of the stream.
    pub fn start() -> Self {
        Self::default()
    }

    /// The end-of-stream sentinel for `elements`.
    pub fn end_of(elements: &[TextElement]) -> Self {
        Self {
            element: elements.len(),
            line: 0,
        }
    }

    pub fn is_end_of(self, elements: &[TextElement]) -> bool {
        self.element >= elements.len()
    }

    /// The next logical line position.
    pub fn next(self, elements: &[TextElement]) -> Self {
        if self.element >= elements.len() {
            return self;
        }
        let lines = elements[self.element].line_count();
        if self.line + 1 >= lines {
            Self {
                element: self.element + 1,
                line: 0,
            }
        } else {
            Self {
                element: self.element,
                line: self.line + 1,
            }
        }
    }

    /// First line of the next element.
    pub fn next_element(self) -> Self {
        Self {
            element: self.element + 1,
            line: 0,
        }
    }
}

/// Half-open cursor range over an element stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorRange {
    pub start: ElementCursor,
    pub end: ElementCursor,
}

impl CursorRange {
    /// Iterate the line positions in the range.
    pub fn lines<'a>(&self, elements: &'a [TextElement]) -> RangeLines<'a> {
        RangeLines {
            elements,
            at: self.start,
            end: self.end,
        }
    }
}

/// Iterator over the cursor positions of a range.
pub struct RangeLines<'a> {
    elements: &'a [TextElement],
    at: ElementCursor,
    end: ElementCursor,
}

impl Iterator for RangeLines<'_> {
    type Item = ElementCursor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.at == self.end || self.at.is_end_of(self.elements) {
            return None;
        }
        let current = self.at;
        self.at = self.at.next(self.elements);
        Some(current)
    }
}
