use galley::{FixedAdvanceMeasurer, FontSpec, Word};

/// 2mm per character at 10pt: widths become exact character counts times two.
pub fn measurer() -> FixedAdvanceMeasurer {
    FixedAdvanceMeasurer::new(2.0)
}

pub fn body_font() -> FontSpec {
    FontSpec::new("serif", 10.0)
}

pub fn plain_words(texts: &[&str]) -> Vec<Word> {
    texts.iter().copied().map(Word::plain).collect()
}

const FILLER: &[&str] = &[
    "the", "narrow", "street", "wound", "between", "stone", "houses", "toward", "the",
    "harbour", "where", "gulls", "argued", "over", "scraps", "and", "fishermen", "mended",
    "their", "nets", "in", "patient", "silence",
];

/// Deterministic filler paragraph of `word_count` words.
pub fn filler_paragraph(word_count: usize) -> String {
    let mut out = String::new();
    for i in 0..word_count {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(FILLER[i % FILLER.len()]);
    }
    out
}
