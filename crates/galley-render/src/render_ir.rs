//! Backend-agnostic draw commands.
//!
//! A composed page is a flat command list in absolute page coordinates.
//! Renderers walk the commands and draw; nothing here knows about PDF, EPUB
//! or screens.

use galley::{FontSpec, StyledRun, TextAlignment};
use serde::{Deserialize, Serialize};

/// A single line drawn as-is at its position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextCommand {
    /// Anchor x from the left page edge.
    pub x_mm: f32,
    /// Baseline y from the top page edge.
    pub baseline_y_mm: f32,
    pub runs: Vec<StyledRun>,
    pub font: FontSpec,
    /// How the anchor relates to the text: left edge or center.
    pub alignment: TextAlignment,
}

/// An interior paragraph line stretched to its measure.
///
/// The renderer distributes the slack across the inter-word gaps; the words
/// arrive pre-split so it never re-tokenizes styled text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JustifiedTextCommand {
    pub x_mm: f32,
    pub baseline_y_mm: f32,
    /// Target measure the line must fill exactly.
    pub width_mm: f32,
    /// Runs of each word, spaces excluded.
    pub word_runs: Vec<Vec<StyledRun>>,
    pub font: FontSpec,
}

/// One drawing operation on a page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Text(TextCommand),
    JustifiedText(JustifiedTextCommand),
}

impl DrawCommand {
    /// Baseline of the command, for ordering checks.
    pub fn baseline_y_mm(&self) -> f32 {
        match self {
            DrawCommand::Text(t) => t.baseline_y_mm,
            DrawCommand::JustifiedText(j) => j.baseline_y_mm,
        }
    }

    /// Plain text of the command.
    pub fn text(&self) -> String {
        match self {
            DrawCommand::Text(t) => t.runs.iter().map(|r| r.text.as_str()).collect(),
            DrawCommand::JustifiedText(j) => {
                let words: Vec<String> = j
                    .word_runs
                    .iter()
                    .map(|runs| runs.iter().map(|r| r.text.as_str()).collect())
                    .collect();
                words.join(" ")
            }
        }
    }
}

/// Per-page metrics for navigation and progress consumers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetrics {
    pub chapter_number: usize,
    /// 0-based page offset within the chapter.
    pub chapter_page_index: usize,
    pub chapter_page_count: usize,
    /// Inserted blank verso before a chapter opening.
    pub is_blank: bool,
}

/// Page represented as absolute draw commands.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderPage {
    /// 1-based book page number.
    pub page_number: usize,
    pub commands: Vec<DrawCommand>,
    pub metrics: PageMetrics,
}

impl RenderPage {
    pub fn new(page_number: usize) -> Self {
        Self {
            page_number,
            commands: Vec::new(),
            metrics: PageMetrics::default(),
        }
    }

    /// A blank filler page.
    pub fn blank(page_number: usize) -> Self {
        Self {
            page_number,
            commands: Vec::new(),
            metrics: PageMetrics {
                is_blank: true,
                ..PageMetrics::default()
            },
        }
    }
}
