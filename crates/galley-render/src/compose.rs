//! Page composition: optimized page descriptors to absolute coordinates.
//!
//! The composer walks a [`BookLayout`] and emits one [`RenderPage`] per book
//! page: mirrored inner/outer margins by page parity, chapter-opening
//! whitespace and heading placement, justified interior paragraph lines,
//! ragged last lines and special blocks, the folio, and blank versos in
//! front of chapter openings.

use galley::{
    BookLayout, ElementCursor, FontSpec, LaidOutChapter, LayoutConfig, Page, SpecialElement,
    SpecialKind, StyledLine, TextAlignment, TextElement, CHAPTER_HEADING_TOP_WHITESPACE,
};
use log::debug;

use crate::render_ir::{
    DrawCommand, JustifiedTextCommand, PageMetrics, RenderPage, TextCommand,
};

/// Converts laid-out chapters into absolute draw commands.
#[derive(Clone, Debug)]
pub struct PageComposer {
    cfg: LayoutConfig,
}

impl PageComposer {
    pub fn new(cfg: LayoutConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.cfg
    }

    /// Compose every page of the book, blank versos included.
    pub fn compose_book(&self, book: &BookLayout) -> Vec<RenderPage> {
        let mut pages = Vec::with_capacity(book.total_pages);
        let mut next_page = 1usize;
        for chapter in &book.chapters {
            while next_page < chapter.first_page {
                pages.push(RenderPage::blank(next_page));
                next_page += 1;
            }
            for (index, page) in chapter.pages.iter().enumerate() {
                pages.push(self.compose_page(chapter, page, next_page, index));
                next_page += 1;
            }
        }
        debug!("composed {} pages", pages.len());
        pages
    }

    fn compose_page(
        &self,
        chapter: &LaidOutChapter,
        page: &Page,
        book_page_number: usize,
        chapter_page_index: usize,
    ) -> RenderPage {
        let mut out = RenderPage::new(book_page_number);
        out.metrics = PageMetrics {
            chapter_number: chapter.number,
            chapter_page_index,
            chapter_page_count: chapter.pages.len(),
            is_blank: false,
        };

        let left = self.left_margin_mm(book_page_number);
        let line_height = self.cfg.line_height_mm();
        let range = page.range();

        let (mut y, body_start, mut emitted) = match page {
            Page::Section { .. } => {
                let mut y = self.cfg.margins.top_mm
                    + CHAPTER_HEADING_TOP_WHITESPACE as f32 * line_height;
                if let Some(TextElement::Section(section)) =
                    chapter.elements.get(range.start.element)
                {
                    for line in &section.lines {
                        out.commands.push(DrawCommand::Text(TextCommand {
                            x_mm: left + self.cfg.textblock_width_mm() / 2.0,
                            baseline_y_mm: y,
                            runs: line.runs.clone(),
                            font: self.cfg.heading_font.clone(),
                            alignment: TextAlignment::Centered,
                        }));
                        y += line_height;
                    }
                } else {
                    panic!(
                        "section page of chapter {} does not start at a heading",
                        chapter.number
                    );
                }
                (y, range.start.next_element(), 1usize)
            }
            Page::Regular { .. } => (
                self.cfg.margins.top_mm + line_height,
                range.start,
                0usize,
            ),
        };

        let mut at = body_start;
        while at != range.end && !at.is_end_of(&chapter.elements) {
            match &chapter.elements[at.element] {
                TextElement::Section(_) => {
                    panic!(
                        "chapter {} has a heading away from its opening page",
                        chapter.number
                    );
                }
                TextElement::Paragraph(paragraph) => {
                    out.commands.push(self.paragraph_line_command(
                        paragraph.width_mm,
                        paragraph.indent_mm,
                        &paragraph.lines,
                        at,
                        left,
                        y,
                    ));
                    y += line_height;
                    emitted += 1;
                }
                TextElement::Special(special) => {
                    out.commands
                        .push(self.special_line_command(special, at, left, y));
                    y += line_height;
                    emitted += 1;
                }
                TextElement::Empty(_) => {
                    // Empty lines at the top of a page take no space.
                    if emitted > 0 {
                        y += line_height;
                    }
                }
            }
            at = at.next(&chapter.elements);
        }

        out.commands.push(self.folio_command(book_page_number));
        out
    }

    /// Interior paragraph lines justify to the measure; the last line and
    /// single-line paragraphs stay ragged left.
    fn paragraph_line_command(
        &self,
        width_mm: f32,
        indent_mm: f32,
        lines: &[StyledLine],
        at: ElementCursor,
        left: f32,
        baseline_y: f32,
    ) -> DrawCommand {
        let line = &lines[at.line];
        let indent = if at.line == 0 { indent_mm } else { 0.0 };
        let is_last = at.line + 1 == lines.len();
        if is_last {
            DrawCommand::Text(TextCommand {
                x_mm: left + indent,
                baseline_y_mm: baseline_y,
                runs: line.runs.clone(),
                font: self.cfg.font.clone(),
                alignment: TextAlignment::Left,
            })
        } else {
            DrawCommand::JustifiedText(JustifiedTextCommand {
                x_mm: left + indent,
                baseline_y_mm: baseline_y,
                width_mm: width_mm - indent,
                word_runs: split_into_word_runs(line),
                font: self.cfg.font.clone(),
            })
        }
    }

    fn special_line_command(
        &self,
        special: &SpecialElement,
        at: ElementCursor,
        left: f32,
        baseline_y: f32,
    ) -> DrawCommand {
        let line = &special.lines[at.line];
        let font = self.special_font(special.kind);
        let x = match special.alignment {
            TextAlignment::Left => left + special.extra_indent_mm,
            TextAlignment::Centered => left + self.cfg.textblock_width_mm() / 2.0,
            TextAlignment::Right => left + self.cfg.textblock_width_mm(),
        };
        DrawCommand::Text(TextCommand {
            x_mm: x,
            baseline_y_mm: baseline_y,
            runs: line.runs.clone(),
            font: font.clone(),
            alignment: special.alignment,
        })
    }

    fn special_font(&self, kind: SpecialKind) -> &FontSpec {
        match kind {
            SpecialKind::Code => &self.cfg.code_font,
            SpecialKind::Letter => &self.cfg.letter_font,
            SpecialKind::Sign => &self.cfg.font,
        }
    }

    /// Page number near the outer edge: right-aligned on recto pages,
    /// left-aligned on verso pages.
    fn folio_command(&self, book_page_number: usize) -> DrawCommand {
        let recto = book_page_number % 2 == 1;
        let x = if recto {
            self.cfg.page.width_mm - self.cfg.margins.outer_mm
        } else {
            self.cfg.margins.outer_mm
        };
        DrawCommand::Text(TextCommand {
            x_mm: x,
            baseline_y_mm: 2.0 * self.cfg.line_height_mm(),
            runs: vec![galley::StyledRun {
                text: book_page_number.to_string(),
                style: Default::default(),
            }],
            font: self.cfg.font.clone(),
            alignment: if recto {
                TextAlignment::Right
            } else {
                TextAlignment::Left
            },
        })
    }

    /// Spine-side margin mirrors with page parity.
    fn left_margin_mm(&self, book_page_number: usize) -> f32 {
        if book_page_number % 2 == 1 {
            self.cfg.margins.inner_mm
        } else {
            self.cfg.margins.outer_mm
        }
    }
}

/// Split a styled line into per-word run groups, dropping the inter-word
/// spaces. Hyphen continuations stay glued to their word.
fn split_into_word_runs(line: &StyledLine) -> Vec<Vec<galley::StyledRun>> {
    let mut words: Vec<Vec<galley::StyledRun>> = Vec::new();
    let mut current: Vec<galley::StyledRun> = Vec::new();
    for run in &line.runs {
        for (i, piece) in run.text.split(' ').enumerate() {
            if i > 0 && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            if piece.is_empty() {
                continue;
            }
            current.push(galley::StyledRun {
                text: piece.to_owned(),
                style: run.style,
            });
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
