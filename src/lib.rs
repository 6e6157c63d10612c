//! Optimal paragraph and page breaking for book typesetting.
//!
//! The engine answers two questions: where each paragraph breaks into lines,
//! and where each chapter breaks into pages. Both are bounded recursive
//! searches over split choices, scored by an additive penalty model (ragged
//! widths, hyphen ladders, stranded words, widows, orphans, uneven facing
//! pages) and pruned through small per-depth caches of the best partial
//! solutions seen so far.
//!
//! Text measurement and hyphenation are injected through the
//! [`TextMeasurer`] and [`Hyphenator`] traits; the engine itself is free of
//! shaping and language logic. Parsing and rendering live outside this
//! crate: input is typed [`Block`]s, output is cursor ranges over line
//! streams that a renderer turns into draw commands.
//!
//! ```
//! use galley::{Block, LayoutConfig, LayoutEngine};
//!
//! let engine = LayoutEngine::new(LayoutConfig::default());
//! let blocks = vec![
//!     Block::Section { number: 1, title: "First".into() },
//!     Block::Paragraph { text: "Some text to set.".into() },
//! ];
//! let book = engine.layout_book(&blocks).unwrap();
//! assert_eq!(book.chapters.len(), 1);
//! ```

pub mod element;
pub mod engine;
pub mod hyphenate;
pub mod linebreak;
pub mod measure;
pub mod pagebreak;
pub mod penalty;
pub mod split;
pub mod word;

pub use element::{
    CursorRange, ElementCursor, EmptyLineElement, ParagraphElement, SectionElement,
    SpecialElement, SpecialKind, TextAlignment, TextElement,
};
pub use engine::{
    Block, BookLayout, ConfigError, LaidOutChapter, LayoutConfig, LayoutEngine, Margins,
    PageGeometry,
};
pub use hyphenate::{Hyphenator, Language, NoHyphenation, PatternHyphenator};
pub use linebreak::{LineBreaker, LineStats, ParagraphLayout, StyledLine};
pub use measure::{CachedMeasurer, FixedAdvanceMeasurer, FontSpec, FontStyle, TextMeasurer};
pub use pagebreak::{
    ChapterLayout, ChapterPaginator, HeightMismatch, Page, PageStatistics,
    CHAPTER_HEADING_TOP_WHITESPACE,
};
pub use penalty::{
    consecutive_hyphen_penalty, hyphen_run_penalty, line_width_penalty, paragraph_report,
    ExtraPenalty, ExtraPenaltyKind, LineWidthReport, ParagraphReport, PenaltyWeights, RenderMode,
};
pub use split::{SplitPoint, SplitPointIndex, TextLocation};
pub use word::{
    split_to_words, HyphenKind, HyphenPoint, InlineStyle, StyleChange, StyleSet, StyledRun, Word,
};
