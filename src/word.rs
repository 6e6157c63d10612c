use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What happens at a hyphenation opportunity if the line breaks there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HyphenKind {
    /// Insert a visible hyphen glyph at the end of the line.
    Regular,
    /// Break bare, the word already carries a dash at this position.
    NoHyphen,
}

/// A legal in-word break position.
///
/// `offset` is a byte offset into the word's UTF-8 text: the line-ending
/// fragment is `text[..offset]`, the continuation is `text[offset..]`.
/// Offsets are strictly inside the word (`0 < offset < text.len()`) and lie
/// on character boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HyphenPoint {
    pub offset: usize,
    pub kind: HyphenKind,
}

/// Inline style toggled at a byte offset within a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InlineStyle {
    Italic,
    Bold,
    Code,
    SmallCaps,
    Superscript,
}

impl InlineStyle {
    const ALL: [InlineStyle; 5] = [
        InlineStyle::Italic,
        InlineStyle::Bold,
        InlineStyle::Code,
        InlineStyle::SmallCaps,
        InlineStyle::Superscript,
    ];

    fn bit(self) -> u8 {
        match self {
            InlineStyle::Italic => 1 << 0,
            InlineStyle::Bold => 1 << 1,
            InlineStyle::Code => 1 << 2,
            InlineStyle::SmallCaps => 1 << 3,
            InlineStyle::Superscript => 1 << 4,
        }
    }
}

/// Set of inline styles active at some point in the text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSet(u8);

impl StyleSet {
    /// The empty style set.
    pub fn new() -> Self {
        Self(0)
    }

    pub fn contains(self, style: InlineStyle) -> bool {
        self.0 & style.bit() != 0
    }

    /// Flip one style on or off.
    pub fn toggle(&mut self, style: InlineStyle) {
        self.0 ^= style.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the active styles in declaration order.
    pub fn iter(self) -> impl Iterator<Item = InlineStyle> {
        InlineStyle::ALL
            .into_iter()
            .filter(move |s| self.contains(*s))
    }
}

/// A style toggle embedded in a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyleChange {
    /// Byte offset the toggle applies before.
    pub offset: usize,
    pub style: InlineStyle,
}

/// One whitespace-delimited token of input text, annotated with its
/// hyphenation opportunities and inline style toggles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Word {
    pub text: String,
    /// Ascending by offset.
    pub hyphens: SmallVec<[HyphenPoint; 4]>,
    /// Ascending by offset.
    pub styles: SmallVec<[StyleChange; 2]>,
    /// Styles already open when the word begins.
    pub start_style: StyleSet,
}

impl Word {
    /// A plain word with no hyphenation or styling.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Style state in effect at `byte_offset`, derived from the word's
    /// start style and the toggles before that offset.
    pub fn style_at(&self, byte_offset: usize) -> StyleSet {
        let mut style = self.start_style;
        for change in &self.styles {
            if change.offset >= byte_offset {
                break;
            }
            style.toggle(change.style);
        }
        style
    }

    /// Panic with a diagnostic if an annotation violates the word invariants.
    pub fn validate(&self) {
        let mut previous = 0;
        for hp in &self.hyphens {
            assert!(
                hp.offset > 0 && hp.offset < self.text.len(),
                "hyphen offset {} outside word {:?}",
                hp.offset,
                self.text
            );
            assert!(
                self.text.is_char_boundary(hp.offset),
                "hyphen offset {} splits a character in {:?}",
                hp.offset,
                self.text
            );
            assert!(
                hp.offset >= previous,
                "hyphen offsets out of order in {:?}",
                self.text
            );
            previous = hp.offset;
        }
    }
}

/// A run of identically styled text inside one line.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StyledRun {
    pub text: String,
    pub style: StyleSet,
}

/// Split raw text into whitespace-delimited tokens.
pub fn split_to_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_set_toggles_and_iterates() {
        let mut style = StyleSet::new();
        assert!(style.is_empty());
        style.toggle(InlineStyle::Italic);
        style.toggle(InlineStyle::SmallCaps);
        assert!(style.contains(InlineStyle::Italic));
        assert!(!style.contains(InlineStyle::Bold));
        let active: Vec<_> = style.iter().collect();
        assert_eq!(active, vec![InlineStyle::Italic, InlineStyle::SmallCaps]);
        style.toggle(InlineStyle::Italic);
        assert!(!style.contains(InlineStyle::Italic));
    }

    #[test]
    fn style_at_applies_toggles_before_offset() {
        let mut word = Word::plain("kursiv");
        word.styles.push(StyleChange {
            offset: 3,
            style: InlineStyle::Italic,
        });
        assert!(!word.style_at(0).contains(InlineStyle::Italic));
        assert!(!word.style_at(3).contains(InlineStyle::Italic));
        assert!(word.style_at(4).contains(InlineStyle::Italic));
    }

    #[test]
    fn validate_accepts_interior_char_boundaries() {
        let mut word = Word::plain("työpäivä");
        let offset = word.text.char_indices().nth(3).unwrap().0;
        word.hyphens.push(HyphenPoint {
            offset,
            kind: HyphenKind::Regular,
        });
        word.validate();
    }

    #[test]
    #[should_panic(expected = "outside word")]
    fn validate_rejects_end_offset() {
        let mut word = Word::plain("abc");
        word.hyphens.push(HyphenPoint {
            offset: 3,
            kind: HyphenKind::Regular,
        });
        word.validate();
    }

    #[test]
    fn split_to_words_collapses_whitespace() {
        assert_eq!(
            split_to_words("  one\ttwo \n three "),
            vec!["one", "two", "three"]
        );
    }
}
