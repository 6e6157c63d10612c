//! Optimal chapter pagination.
//!
//! The same search shape as the line breaker, one level up: positions are
//! boundaries between consecutive pre-built lines, a page is a cursor range,
//! and complete page sets are scored for widows, orphans and facing-page
//! height mismatches. Candidate boundaries per step are the tightest fill
//! and the one-line-earlier alternative, so a page can give up its last line
//! to avoid stranding a paragraph edge.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::element::{CursorRange, ElementCursor, TextElement};
use crate::penalty::PenaltyWeights;

/// Empty lines above a chapter heading, in body lines.
pub const CHAPTER_HEADING_TOP_WHITESPACE: usize = 8;

/// Retained best partial penalties per reached position.
const REACH_CAPACITY: usize = 8;

/// One laid-out page of a chapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    /// Chapter-opening page: extra top whitespace and the heading.
    Section {
        chapter_number: usize,
        range: CursorRange,
    },
    /// Interior page.
    Regular { range: CursorRange },
}

impl Page {
    pub fn range(&self) -> CursorRange {
        match self {
            Page::Section { range, .. } | Page::Regular { range } => *range,
        }
    }
}

/// Signed facing-page height difference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightMismatch {
    /// 1-based page number within the chapter.
    pub page: usize,
    /// Left-page height minus right-page height, in lines.
    pub delta: i64,
}

/// Quality report for one chapter's pagination.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageStatistics {
    /// 1-based pages starting on the last line of a multi-line element.
    pub widows: Vec<usize>,
    /// 1-based pages ending one line into a multi-line element.
    pub orphans: Vec<usize>,
    pub mismatches: Vec<HeightMismatch>,
    /// The chapter ends on a page holding a single line. Reported but not
    /// scored; accepting it can still be the cheapest available layout.
    pub single_line_last_page: bool,
    pub total_penalty: u64,
}

/// Finished chapter: ordered pages plus their statistics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChapterLayout {
    pub pages: Vec<Page>,
    pub stats: PageStatistics,
}

struct PageSearch {
    best_penalty: u64,
    best: Vec<Page>,
    found: bool,
    partial: Vec<Page>,
    reaches: HashMap<ElementCursor, Vec<u64>>,
    completed: usize,
}

impl PageSearch {
    /// Abandon branches that reach a position more expensively than the
    /// retained best attempts, or at a cost some earlier branch already
    /// reached it with. Page penalties are small integers and most partials
    /// on clean text cost zero, so without the duplicate rule equal-cost
    /// revisits would multiply into an exponential walk. Heuristic, same
    /// tradeoff as the line beam; first-found still wins ties.
    fn abandon(&mut self, at: ElementCursor, penalty: u64) -> bool {
        let slot = self.reaches.entry(at).or_default();
        if slot.len() >= REACH_CAPACITY && slot.last().is_some_and(|worst| *worst < penalty) {
            return true;
        }
        if slot.binary_search(&penalty).is_ok() {
            return true;
        }
        let idx = slot.partition_point(|p| *p < penalty);
        slot.insert(idx, penalty);
        slot.truncate(REACH_CAPACITY);
        false
    }
}

/// Optimizing paginator for one chapter's element stream.
pub struct ChapterPaginator<'a> {
    elements: &'a [TextElement],
    target_height: usize,
    weights: PenaltyWeights,
}

impl<'a> ChapterPaginator<'a> {
    pub fn new(elements: &'a [TextElement], target_height: usize, weights: PenaltyWeights) -> Self {
        assert!(target_height > 0, "page target height must be positive");
        Self {
            elements,
            target_height,
            weights,
        }
    }

    /// Find the lowest-penalty page set covering the chapter.
    pub fn optimize_pages(&self) -> ChapterLayout {
        let start = ElementCursor::start();
        let end = ElementCursor::end_of(self.elements);
        if self.elements.is_empty() || self.total_line_count() == 0 {
            return ChapterLayout::default();
        }

        // Everything fits on one page: no break to optimize.
        if self.tight_page_end(start) == end {
            let pages = vec![self.make_page(start, end)];
            let stats = self.statistics_for(&pages);
            return ChapterLayout { pages, stats };
        }

        let mut search = PageSearch {
            best_penalty: u64::MAX,
            best: Vec::new(),
            found: false,
            partial: Vec::new(),
            reaches: HashMap::new(),
            completed: 0,
        };
        self.recurse(&mut search, start);
        assert!(
            search.found,
            "page search found no layout for {} elements",
            self.elements.len()
        );
        let stats = self.statistics_for(&search.best);
        debug!(
            "chapter: {} elements, {} pages, {} complete candidates, penalty {}",
            self.elements.len(),
            search.best.len(),
            search.completed,
            stats.total_penalty
        );
        ChapterLayout {
            pages: search.best,
            stats,
        }
    }

    /// Score an existing page set with the paginator's weights.
    pub fn statistics_for(&self, pages: &[Page]) -> PageStatistics {
        let mut stats = PageStatistics::default();
        let mut odd_height = 0usize;
        let mut even_height = 0usize;
        for (idx, page) in pages.iter().enumerate() {
            let height = self.lines_on_page(page);
            if (idx + 1) % 2 == 1 {
                odd_height = height;
            } else {
                even_height = height;
            }
            let on_first = idx == 0;
            let on_last = idx + 1 == pages.len();
            if !on_first && !on_last && (idx + 1) % 2 == 1 && even_height != odd_height {
                stats.mismatches.push(HeightMismatch {
                    page: idx + 1,
                    delta: even_height as i64 - odd_height as i64,
                });
            }

            let range = page.range();
            if range.end.element >= self.elements.len() {
                // The chapter-final edge is not a break.
                continue;
            }
            let start_lines = self.elements[range.start.element].line_count();
            let end_lines = self.elements[range.end.element].line_count();
            if end_lines > 1 && range.end.line == 1 {
                stats.orphans.push(idx + 1);
            }
            if start_lines > 1 && range.start.line + 1 == start_lines {
                stats.widows.push(idx + 1);
            }
        }
        if pages.len() > 1 {
            if let Some(last) = pages.last() {
                stats.single_line_last_page = self.lines_on_page(last) == 1;
            }
        }
        stats.total_penalty = stats.widows.len() as u64 * self.weights.widow
            + stats.orphans.len() as u64 * self.weights.orphan
            + stats
                .mismatches
                .iter()
                .map(|m| m.delta.unsigned_abs() * self.weights.height_mismatch)
                .sum::<u64>();
        stats
    }

    /// Rendered height of a page, in body lines.
    pub fn lines_on_page(&self, page: &Page) -> usize {
        match page {
            Page::Section { range, .. } => {
                let mut height = CHAPTER_HEADING_TOP_WHITESPACE + 1;
                let body = CursorRange {
                    start: range.start.next_element(),
                    end: range.end,
                };
                height += body.lines(self.elements).count();
                height
            }
            Page::Regular { range } => {
                let mut height = 0usize;
                for at in range.lines(self.elements) {
                    // Empty lines at the top of a page take no space.
                    if height > 0 || !self.elements[at.element].is_empty_line() {
                        height += 1;
                    }
                }
                height
            }
        }
    }

    fn total_line_count(&self) -> usize {
        self.elements.iter().map(TextElement::line_count).sum()
    }

    fn recurse(&self, search: &mut PageSearch, run_start: ElementCursor) {
        let running = self.statistics_for(&search.partial).total_penalty;
        if search.abandon(run_start, running) {
            return;
        }
        if run_start.is_end_of(self.elements) {
            search.completed += 1;
            if running < search.best_penalty {
                search.best_penalty = running;
                search.best.clone_from(&search.partial);
                search.found = true;
            }
            return;
        }

        let tight = self.tight_page_end(run_start);
        let end = ElementCursor::end_of(self.elements);
        let mut boundaries: [Option<ElementCursor>; 2] = [Some(tight), None];
        if tight != end {
            if let Some(shorter) = self.one_line_earlier(run_start, tight) {
                boundaries[1] = Some(shorter);
            }
        }
        for boundary in boundaries.into_iter().flatten() {
            search.partial.push(self.make_page(run_start, boundary));
            self.recurse(search, boundary);
            search.partial.pop();
        }
    }

    fn make_page(&self, start: ElementCursor, end: ElementCursor) -> Page {
        let range = CursorRange { start, end };
        if let Some(TextElement::Section(section)) = self.elements.get(start.element) {
            if start.line == 0 {
                return Page::Section {
                    chapter_number: section.chapter_number,
                    range,
                };
            }
        }
        Page::Regular { range }
    }

    fn is_section_start(&self, at: ElementCursor) -> bool {
        at.line == 0
            && matches!(
                self.elements.get(at.element),
                Some(TextElement::Section(_))
            )
    }

    /// Boundary after the last line that still fits the target height.
    fn tight_page_end(&self, run_start: ElementCursor) -> ElementCursor {
        let section_page = self.is_section_start(run_start);
        let mut height = if section_page {
            CHAPTER_HEADING_TOP_WHITESPACE + 1
        } else {
            0
        };
        let mut taken = usize::from(section_page);
        let mut at = if section_page {
            run_start.next_element()
        } else {
            run_start
        };
        while !at.is_end_of(self.elements) {
            let is_empty = self.elements[at.element].is_empty_line();
            let contributes = usize::from(height > 0 || !is_empty);
            if taken > 0 && height + contributes > self.target_height {
                return at;
            }
            height += contributes;
            taken += 1;
            at = at.next(self.elements);
        }
        ElementCursor::end_of(self.elements)
    }

    /// The boundary one logical line before `tight`, if that still leaves a
    /// non-empty page.
    fn one_line_earlier(
        &self,
        run_start: ElementCursor,
        tight: ElementCursor,
    ) -> Option<ElementCursor> {
        let first_body = if self.is_section_start(run_start) {
            run_start.next_element()
        } else {
            run_start
        };
        let mut previous = None;
        let mut at = first_body;
        while !at.is_end_of(self.elements) && at != tight {
            previous = Some(at);
            at = at.next(self.elements);
        }
        previous.filter(|p| *p > first_body)
    }
}
