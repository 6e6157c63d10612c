use smallvec::SmallVec;

use crate::word::{HyphenKind, HyphenPoint};

/// Minimum characters that must remain on each side of an in-word break.
const MIN_FRAGMENT_CHARS: usize = 2;

/// Hyphenation language resolved from a document language tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Language {
    /// Hyphenation disabled, only existing dashes break.
    #[default]
    Unknown,
    English,
    Finnish,
}

impl Language {
    /// Resolve a BCP-47-ish tag such as `"en"`, `"en-US"` or `"fi"`.
    pub fn from_tag(tag: &str) -> Self {
        let lower = tag.to_ascii_lowercase();
        if lower.starts_with("en") {
            Self::English
        } else if lower.starts_with("fi") {
            Self::Finnish
        } else {
            Self::Unknown
        }
    }

    fn pattern_lang(self) -> Option<hypher::Lang> {
        match self {
            Self::Unknown => None,
            Self::English => hypher::Lang::from_iso(*b"en"),
            Self::Finnish => hypher::Lang::from_iso(*b"fi"),
        }
    }
}

/// Source of in-word break opportunities.
///
/// Implementations must return offsets that are valid character boundaries in
/// the original word, strictly inside it, in ascending order.
pub trait Hyphenator: Send + Sync {
    fn hyphenate(&self, word: &str, language: Language) -> SmallVec<[HyphenPoint; 4]>;
}

/// Pattern-based hyphenator with embedded English and Finnish rules.
///
/// Existing dashes inside a word always yield a bare break opportunity right
/// after the dash, regardless of language.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternHyphenator;

impl PatternHyphenator {
    pub fn new() -> Self {
        Self
    }
}

impl Hyphenator for PatternHyphenator {
    fn hyphenate(&self, word: &str, language: Language) -> SmallVec<[HyphenPoint; 4]> {
        let mut points: SmallVec<[HyphenPoint; 4]> = SmallVec::new();

        if let Some(lang) = language.pattern_lang() {
            let total_chars = word.chars().count();
            let mut offset = 0;
            let mut chars = 0;
            for syllable in hypher::hyphenate(word, lang) {
                offset += syllable.len();
                chars += syllable.chars().count();
                if offset >= word.len() {
                    continue;
                }
                // Tiny fragments produce ugly breaks and confuse readers.
                if chars < MIN_FRAGMENT_CHARS || total_chars - chars < MIN_FRAGMENT_CHARS {
                    continue;
                }
                points.push(HyphenPoint {
                    offset,
                    kind: HyphenKind::Regular,
                });
            }
        }

        for (idx, ch) in word.char_indices() {
            if ch != '-' {
                continue;
            }
            let after = idx + ch.len_utf8();
            if idx == 0 || after >= word.len() {
                continue;
            }
            points.push(HyphenPoint {
                offset: after,
                kind: HyphenKind::NoHyphen,
            });
        }

        points.sort_by_key(|p| p.offset);
        points.dedup_by_key(|p| p.offset);
        points
    }
}

/// Hyphenator that never offers break opportunities.
///
/// Used for headings and other text where in-word breaks are prohibited.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHyphenation;

impl Hyphenator for NoHyphenation {
    fn hyphenate(&self, _word: &str, _language: Language) -> SmallVec<[HyphenPoint; 4]> {
        SmallVec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tag_resolution() {
        assert_eq!(Language::from_tag("en"), Language::English);
        assert_eq!(Language::from_tag("en-GB"), Language::English);
        assert_eq!(Language::from_tag("FI"), Language::Finnish);
        assert_eq!(Language::from_tag("sv"), Language::Unknown);
    }

    #[test]
    fn english_word_gets_interior_breaks() {
        let points = PatternHyphenator.hyphenate("paragraph", Language::English);
        assert!(!points.is_empty());
        for p in &points {
            assert!(p.offset > 0 && p.offset < "paragraph".len());
            assert_eq!(p.kind, HyphenKind::Regular);
        }
    }

    #[test]
    fn unknown_language_only_breaks_at_dashes() {
        let points = PatternHyphenator.hyphenate("suurpiirteinen", Language::Unknown);
        assert!(points.is_empty());

        let points = PatternHyphenator.hyphenate("itse-ironia", Language::Unknown);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].kind, HyphenKind::NoHyphen);
        assert_eq!(points[0].offset, "itse-".len());
    }

    #[test]
    fn offsets_are_char_boundaries_in_finnish() {
        let word = "höyrylaiva";
        let points = PatternHyphenator.hyphenate(word, Language::Finnish);
        for p in &points {
            assert!(word.is_char_boundary(p.offset), "offset {}", p.offset);
        }
    }

    #[test]
    fn leading_and_trailing_dashes_do_not_break() {
        let points = PatternHyphenator.hyphenate("-dash-", Language::Unknown);
        assert!(points.is_empty());
    }

    #[test]
    fn no_hyphenation_returns_nothing() {
        assert!(NoHyphenation
            .hyphenate("paragraph", Language::English)
            .is_empty());
    }
}
