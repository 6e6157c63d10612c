//! Split-point bookkeeping for one paragraph.
//!
//! Every legal line break is numbered once, in text order: one break before
//! each word, one break per hyphenation opportunity, and a final end-of-text
//! sentinel. Lines are then half-open index ranges over this sequence, and
//! rebuilding the text between two breaks is a pure function of the two
//! indices.

use crate::word::{HyphenKind, StyledRun, Word};

/// A legal place to end one line and begin the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitPoint {
    /// Break in the gap before `word_index`. The index may point
    /// one-past-the-last word, which is the end-of-text sentinel.
    BetweenWords { word_index: usize },
    /// Break inside `word_index` at one of its hyphenation opportunities.
    /// `hyphen_index` must be a valid index into that word's hyphen points.
    WithinWord {
        word_index: usize,
        hyphen_index: usize,
    },
}

/// A split point resolved to a position in the word text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextLocation {
    pub word_index: usize,
    /// Byte offset into the word where the continuation begins.
    pub byte_offset: usize,
}

/// Immutable split-point index over one paragraph's words.
pub struct SplitPointIndex<'a> {
    words: &'a [Word],
    points: Vec<SplitPoint>,
    locations: Vec<TextLocation>,
}

impl<'a> SplitPointIndex<'a> {
    pub fn new(words: &'a [Word]) -> Self {
        for word in words {
            word.validate();
        }
        let mut points = Vec::with_capacity(words.len() * 3 + 1);
        for (word_index, word) in words.iter().enumerate() {
            points.push(SplitPoint::BetweenWords { word_index });
            for hyphen_index in 0..word.hyphens.len() {
                points.push(SplitPoint::WithinWord {
                    word_index,
                    hyphen_index,
                });
            }
        }
        // The end sentinel.
        points.push(SplitPoint::BetweenWords {
            word_index: words.len(),
        });

        let locations = points
            .iter()
            .map(|p| Self::point_to_location(words, *p))
            .collect();

        Self {
            words,
            points,
            locations,
        }
    }

    fn point_to_location(words: &[Word], point: SplitPoint) -> TextLocation {
        match point {
            SplitPoint::BetweenWords { word_index } => TextLocation {
                word_index,
                byte_offset: 0,
            },
            SplitPoint::WithinWord {
                word_index,
                hyphen_index,
            } => TextLocation {
                word_index,
                byte_offset: words[word_index].hyphens[hyphen_index].offset,
            },
        }
    }

    /// Total number of split points, sentinel included.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Index of the end-of-text sentinel.
    pub fn end_split(&self) -> usize {
        self.points.len() - 1
    }

    pub fn words(&self) -> &[Word] {
        self.words
    }

    pub fn point(&self, split: usize) -> SplitPoint {
        self.points[split]
    }

    pub fn location(&self, split: usize) -> TextLocation {
        self.locations[split]
    }

    /// Whether the split sits in the gap between two words.
    pub fn is_word_boundary(&self, split: usize) -> bool {
        matches!(self.points[split], SplitPoint::BetweenWords { .. })
    }

    /// Whether ending a line at `split` inserts a visible hyphen.
    pub fn inserts_hyphen(&self, split: usize) -> bool {
        match self.points[split] {
            SplitPoint::BetweenWords { .. } => false,
            SplitPoint::WithinWord {
                word_index,
                hyphen_index,
            } => self.words[word_index].hyphens[hyphen_index].kind == HyphenKind::Regular,
        }
    }

    /// Plain text of the line between two splits.
    pub fn build_text(&self, from_split: usize, to_split: usize) -> String {
        self.build_runs(from_split, to_split)
            .iter()
            .map(|run| run.text.as_str())
            .collect()
    }

    /// Styled run list of the line between two splits.
    ///
    /// Appends a hyphen glyph when the terminating split is an in-word break
    /// of the `Regular` kind. Equal indices yield an empty line.
    pub fn build_runs(&self, from_split: usize, to_split: usize) -> Vec<StyledRun> {
        assert!(
            to_split >= from_split && to_split < self.points.len(),
            "invalid split range {}..{} of {}",
            from_split,
            to_split,
            self.points.len()
        );
        let mut builder = RunBuilder::default();
        if to_split == from_split {
            return builder.runs;
        }

        let from = self.locations[from_split];
        let to = self.locations[to_split];
        let add_hyphen = self.inserts_hyphen(to_split);
        let from_inside = !self.is_word_boundary(from_split);
        let to_inside = !self.is_word_boundary(to_split);

        // A single word wider than the line: both ends inside the same word.
        if from_inside && to_inside && from.word_index == to.word_index {
            let word = &self.words[from.word_index];
            builder.push_fragment(word, from.byte_offset, to.byte_offset, add_hyphen, false);
            return builder.runs;
        }

        let mut full_begin = from.word_index;
        if from_inside {
            let word = &self.words[from.word_index];
            let trailing = full_begin + 1 < to.word_index || to_inside;
            builder.push_fragment(word, from.byte_offset, word.text.len(), false, trailing);
            full_begin += 1;
        }
        for word_index in full_begin..to.word_index {
            let word = &self.words[word_index];
            let add_space = word_index + 1 != to.word_index || to_inside;
            builder.push_fragment(word, 0, word.text.len(), false, add_space);
        }
        if to_inside {
            let word = &self.words[to.word_index];
            builder.push_fragment(word, 0, to.byte_offset, add_hyphen, false);
        }
        builder.runs
    }
}

/// Accumulates styled runs, merging adjacent identically styled text.
#[derive(Default)]
struct RunBuilder {
    runs: Vec<StyledRun>,
}

impl RunBuilder {
    fn push_fragment(
        &mut self,
        word: &Word,
        from_byte: usize,
        to_byte: usize,
        add_hyphen: bool,
        add_space: bool,
    ) {
        let mut style = word.style_at(from_byte);
        // Toggles sitting exactly on the fragment start belong to it.
        for change in &word.styles {
            if change.offset == from_byte {
                style.toggle(change.style);
            }
        }
        let mut cursor = from_byte;
        for change in &word.styles {
            if change.offset <= from_byte {
                continue;
            }
            if change.offset >= to_byte {
                break;
            }
            self.append(&word.text[cursor..change.offset], style);
            style.toggle(change.style);
            cursor = change.offset;
        }
        self.append(&word.text[cursor..to_byte], style);
        if add_hyphen {
            self.append("-", style);
        }
        if add_space {
            // The space belongs inside the styled run so measured widths
            // include the correct inter-word advance.
            self.append(" ", style);
        }
    }

    fn append(&mut self, text: &str, style: crate::word::StyleSet) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.style == style {
                last.text.push_str(text);
                return;
            }
        }
        self.runs.push(StyledRun {
            text: text.to_owned(),
            style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::{HyphenPoint, InlineStyle, StyleChange};
    use smallvec::smallvec;

    fn hyphenated(text: &str, offsets: &[usize]) -> Word {
        let mut word = Word::plain(text);
        for &offset in offsets {
            word.hyphens.push(HyphenPoint {
                offset,
                kind: HyphenKind::Regular,
            });
        }
        word
    }

    #[test]
    fn numbering_has_sentinel_and_hyphen_points() {
        let words = vec![hyphenated("foobar", &[3]), Word::plain("baz")];
        let index = SplitPointIndex::new(&words);
        // word 0, hyphen in word 0, word 1, sentinel.
        assert_eq!(index.len(), 4);
        assert_eq!(index.point(0), SplitPoint::BetweenWords { word_index: 0 });
        assert_eq!(
            index.point(1),
            SplitPoint::WithinWord {
                word_index: 0,
                hyphen_index: 0
            }
        );
        assert_eq!(index.end_split(), 3);
        assert_eq!(
            index.point(3),
            SplitPoint::BetweenWords { word_index: 2 }
        );
    }

    #[test]
    fn whole_paragraph_roundtrips() {
        let words = vec![
            Word::plain("one"),
            Word::plain("two"),
            Word::plain("three"),
        ];
        let index = SplitPointIndex::new(&words);
        assert_eq!(index.build_text(0, index.end_split()), "one two three");
    }

    #[test]
    fn hyphenated_break_inserts_dash() {
        let words = vec![hyphenated("foobar", &[3]), Word::plain("baz")];
        let index = SplitPointIndex::new(&words);
        assert_eq!(index.build_text(0, 1), "foo-");
        assert_eq!(index.build_text(1, index.end_split()), "bar baz");
    }

    #[test]
    fn no_hyphen_break_stays_bare() {
        let mut word = Word::plain("itse-ironia");
        word.hyphens = smallvec![HyphenPoint {
            offset: 5,
            kind: HyphenKind::NoHyphen,
        }];
        let words = vec![word];
        let index = SplitPointIndex::new(&words);
        assert!(!index.inserts_hyphen(1));
        assert_eq!(index.build_text(0, 1), "itse-");
        assert_eq!(index.build_text(1, index.end_split()), "ironia");
    }

    #[test]
    fn same_word_range_yields_interior_fragment() {
        let words = vec![hyphenated("untranslatable", &[2, 7, 10])];
        let index = SplitPointIndex::new(&words);
        // Both splits inside the one word.
        assert_eq!(index.build_text(1, 2), "trans-");
        assert_eq!(index.build_text(1, 3), "translat-");
        assert_eq!(index.build_text(3, index.end_split()), "able");
    }

    #[test]
    fn equal_splits_yield_empty_line() {
        let words = vec![Word::plain("word")];
        let index = SplitPointIndex::new(&words);
        assert_eq!(index.build_text(1, 1), "");
    }

    #[test]
    fn styles_toggle_inside_words_and_merge_across() {
        let mut first = Word::plain("ab");
        first.styles.push(StyleChange {
            offset: 1,
            style: InlineStyle::Italic,
        });
        // Style span stays open into the next word.
        let mut second = Word::plain("cd");
        second.start_style.toggle(InlineStyle::Italic);
        second.styles.push(StyleChange {
            offset: 1,
            style: InlineStyle::Italic,
        });
        let words = vec![first, second];
        let index = SplitPointIndex::new(&words);
        let runs = index.build_runs(0, index.end_split());
        let texts: Vec<&str> = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b c", "d"]);
        assert!(!runs[0].style.contains(InlineStyle::Italic));
        assert!(runs[1].style.contains(InlineStyle::Italic));
        assert!(!runs[2].style.contains(InlineStyle::Italic));
    }

    #[test]
    #[should_panic(expected = "invalid split range")]
    fn reversed_range_panics() {
        let words = vec![Word::plain("word")];
        let index = SplitPointIndex::new(&words);
        index.build_text(1, 0);
    }
}
