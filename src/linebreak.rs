//! Optimal paragraph line breaking.
//!
//! The search walks the split-point sequence left to right. At each position
//! it generates a small set of candidate line ends around the tightest fit,
//! recurses on each, and scores complete solutions with the penalty model.
//! Partial solutions that are clearly worse than previously seen partials of
//! the same depth are abandoned early through a bounded per-depth cache; this
//! trades exactness for tractable runtime and is the accepted accuracy
//! tradeoff of the whole engine.

use std::collections::HashMap;

use log::{debug, trace};
use smallvec::SmallVec;

use crate::measure::{FontSpec, TextMeasurer};
use crate::penalty::{consecutive_hyphen_penalty, line_width_penalty, PenaltyWeights};
use crate::split::{SplitPoint, SplitPointIndex};
use crate::word::{StyledRun, Word};

/// Per-depth retained partial solutions. Raising this widens the search and
/// changes chosen output; fixtures must be regenerated after tuning.
const BEAM_CAPACITY: usize = 12;

/// A chosen line during search: where it ends and what it measured.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStats {
    /// Split index the line ends at.
    pub end_split: usize,
    pub width_mm: f32,
    /// Whether the line ends at an in-word split, visibly ending in a dash.
    pub ends_in_hyphen: bool,
}

/// One materialized output line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyledLine {
    pub runs: Vec<StyledRun>,
    pub width_mm: f32,
    pub ends_in_hyphen: bool,
}

impl StyledLine {
    /// The line's plain text.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

/// Finished paragraph: ordered lines plus the penalty they scored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParagraphLayout {
    pub lines: Vec<StyledLine>,
    pub penalty: f64,
}

/// Bounded per-depth cache of the best partial penalties seen so far.
///
/// A partial that is worse than every retained entry at its depth, with the
/// cache full, cannot plausibly beat branches already explored to the same
/// depth at lower cost. Partial penalty is a proxy for the eventual total,
/// so this is a heuristic bound, not an exact one.
struct BeamCache {
    capacity: usize,
    slots: Vec<Vec<f64>>,
}

impl BeamCache {
    fn new(depths: usize) -> Self {
        Self {
            capacity: BEAM_CAPACITY,
            slots: vec![Vec::new(); depths],
        }
    }

    fn abandon(&mut self, depth: usize, penalty: f64) -> bool {
        let slot = &mut self.slots[depth];
        if slot.len() >= self.capacity
            && slot.last().is_some_and(|worst| *worst < penalty)
        {
            return true;
        }
        let at = slot.partition_point(|p| *p < penalty);
        slot.insert(at, penalty);
        slot.truncate(self.capacity);
        false
    }
}

struct Search {
    best_penalty: f64,
    best: Vec<LineStats>,
    partial: Vec<LineStats>,
    beam: BeamCache,
    tightest: HashMap<usize, LineStats>,
    completed: usize,
}

/// Optimizing line breaker for one paragraph.
pub struct LineBreaker<'a> {
    index: SplitPointIndex<'a>,
    measurer: &'a dyn TextMeasurer,
    font: &'a FontSpec,
    paragraph_width_mm: f32,
    indent_mm: f32,
    weights: PenaltyWeights,
}

impl<'a> LineBreaker<'a> {
    pub fn new(
        words: &'a [Word],
        paragraph_width_mm: f32,
        indent_mm: f32,
        font: &'a FontSpec,
        measurer: &'a dyn TextMeasurer,
        weights: PenaltyWeights,
    ) -> Self {
        assert!(
            paragraph_width_mm - indent_mm > 0.0,
            "indent {indent_mm}mm leaves no room in paragraph width {paragraph_width_mm}mm"
        );
        Self {
            index: SplitPointIndex::new(words),
            measurer,
            font,
            paragraph_width_mm,
            indent_mm,
            weights,
        }
    }

    /// The split-point index built for this paragraph.
    pub fn split_index(&self) -> &SplitPointIndex<'a> {
        &self.index
    }

    /// Find the lowest-penalty line set for the paragraph.
    pub fn solve(&self) -> ParagraphLayout {
        if let Some(trivial) = self.trivial_layout() {
            return trivial;
        }

        let mut search = Search {
            best_penalty: f64::INFINITY,
            best: Vec::new(),
            partial: Vec::new(),
            beam: BeamCache::new(self.index.len()),
            tightest: HashMap::new(),
            completed: 0,
        };
        self.recurse(&mut search, 0);
        assert!(
            !search.best.is_empty(),
            "line search found no solution for a {}-word paragraph",
            self.index.words().len()
        );
        debug!(
            "paragraph: {} words, {} split points, {} complete candidates, best penalty {:.2}",
            self.index.words().len(),
            self.index.len(),
            search.completed,
            search.best_penalty
        );
        ParagraphLayout {
            lines: self.materialize(&search.best),
            penalty: search.best_penalty,
        }
    }

    /// First-fit splitting without the optimizing search. Draft quality.
    pub fn solve_greedy(&self) -> ParagraphLayout {
        if let Some(trivial) = self.trivial_layout() {
            return trivial;
        }
        let mut tightest = HashMap::new();
        let mut stats = Vec::new();
        let mut current = 0;
        while current != self.index.end_split() {
            let line = self.tightest_line_end(&mut tightest, current);
            current = line.end_split;
            stats.push(line);
        }
        let penalty = self.total_penalty(&stats, true);
        ParagraphLayout {
            lines: self.materialize(&stats),
            penalty,
        }
    }

    /// Empty and one-word paragraphs skip the search entirely.
    fn trivial_layout(&self) -> Option<ParagraphLayout> {
        if self.index.is_empty() {
            return Some(ParagraphLayout::default());
        }
        if self.index.words().len() == 1 {
            let stats = self.line_stats_for(0, self.index.end_split());
            let penalty = self.total_penalty(&[stats], true);
            return Some(ParagraphLayout {
                lines: self.materialize(&[stats]),
                penalty,
            });
        }
        None
    }

    fn recurse(&self, search: &mut Search, current_split: usize) {
        let running = self.total_penalty(&search.partial, false);
        if search.beam.abandon(search.partial.len(), running) {
            return;
        }
        let choices = self.line_end_choices(&mut search.tightest, current_split);
        for choice in choices {
            search.partial.push(choice);
            if choice.end_split == self.index.end_split() {
                search.completed += 1;
                let penalty = self.total_penalty(&search.partial, true);
                if penalty < search.best_penalty {
                    trace!(
                        "new best: {} lines, penalty {:.2}",
                        search.partial.len(),
                        penalty
                    );
                    search.best_penalty = penalty;
                    search.best.clone_from(&search.partial);
                }
            } else {
                self.recurse(search, choice.end_split);
            }
            search.partial.pop();
        }
    }

    /// Candidate line ends at `start_split`, best guess first.
    ///
    /// The order is tightest fit, one earlier, one later, two earlier, then a
    /// bare word-boundary fallback. This order breaks penalty ties and must
    /// not change without regenerating golden output.
    fn line_end_choices(
        &self,
        tightest_cache: &mut HashMap<usize, LineStats>,
        start_split: usize,
    ) -> SmallVec<[LineStats; 5]> {
        let mut choices = SmallVec::new();
        let tightest = self.tightest_line_end(tightest_cache, start_split);
        choices.push(tightest);

        if tightest.end_split > start_split + 2 {
            choices.push(self.line_stats_for(start_split, tightest.end_split - 1));
        }
        if tightest.end_split + 1 < self.index.len() {
            choices.push(self.line_stats_for(start_split, tightest.end_split + 1));
        }
        if tightest.end_split > start_split + 3 {
            choices.push(self.line_stats_for(start_split, tightest.end_split - 2));
        }

        // Guarantee at least one hyphen-free option without widening the
        // neighborhood in general.
        if choices
            .iter()
            .all(|c: &LineStats| !self.index.is_word_boundary(c.end_split))
        {
            let mut probe = tightest.end_split;
            while probe > start_split + 1 {
                probe -= 1;
                if self.index.is_word_boundary(probe) {
                    choices.push(self.line_stats_for(start_split, probe));
                    break;
                }
            }
        }
        choices
    }

    fn tightest_line_end(
        &self,
        cache: &mut HashMap<usize, LineStats>,
        start_split: usize,
    ) -> LineStats {
        if let Some(found) = cache.get(&start_split) {
            return *found;
        }
        let computed = self.compute_tightest_line_end(start_split);
        cache.insert(start_split, computed);
        computed
    }

    /// Last split whose line from `start_split` still fits the target width.
    ///
    /// Widths are measured fresh per candidate; only the final choice per
    /// start is cached, because measured width is not assumed monotonic
    /// beyond the partition search itself.
    fn compute_tightest_line_end(&self, start_split: usize) -> LineStats {
        assert!(
            start_split < self.index.end_split(),
            "tightest line end requested at the end sentinel"
        );
        let target = self.line_target_width(start_split);
        let lo = start_split + 2;
        let hi = self.index.len();
        let mut first_over = hi;
        if lo < hi {
            let mut low = lo;
            let mut high = hi;
            while low < high {
                let mid = low + (high - low) / 2;
                if self.measure_range(start_split, mid) <= target {
                    low = mid + 1;
                } else {
                    high = mid;
                }
            }
            first_over = low;
        }
        let chosen = if first_over == self.index.len() {
            self.index.end_split()
        } else {
            // The last split that satisfies the width, not the first that
            // does not.
            first_over - 1
        };
        self.line_stats_for(start_split, chosen)
    }

    fn line_stats_for(&self, start_split: usize, end_split: usize) -> LineStats {
        LineStats {
            end_split,
            width_mm: self.measure_range(start_split, end_split),
            ends_in_hyphen: !self.index.is_word_boundary(end_split),
        }
    }

    fn measure_range(&self, from_split: usize, to_split: usize) -> f32 {
        let runs = self.index.build_runs(from_split, to_split);
        self.measurer.runs_width_mm(&runs, self.font)
    }

    /// Target width for the line starting at `start_split`. Only the first
    /// line of the paragraph is shortened by the indent.
    fn line_target_width(&self, start_split: usize) -> f32 {
        if start_split == 0 {
            self.paragraph_width_mm - self.indent_mm
        } else {
            self.paragraph_width_mm
        }
    }

    /// Penalty of a (partial or complete) line set.
    ///
    /// The most recent line's width term is excluded while searching; a
    /// complete paragraph keeps the exemption unless it has exactly one line.
    fn total_penalty(&self, lines: &[LineStats], is_complete: bool) -> f64 {
        let mut total = 0.0;
        let mut last = 0.0;
        let mut target = self.paragraph_width_mm - self.indent_mm;
        for line in lines {
            last = line_width_penalty(line.width_mm, target, &self.weights);
            target = self.paragraph_width_mm;
            total += last;
        }
        let width_part = if is_complete && lines.len() == 1 {
            total
        } else {
            total - last
        };
        let hyphen_part =
            consecutive_hyphen_penalty(lines.iter().map(|l| l.ends_in_hyphen), &self.weights);
        let end_part = if is_complete {
            self.paragraph_end_penalty(lines)
        } else {
            0.0
        };
        width_part + hyphen_part + end_part
    }

    /// Extra cost of ending the paragraph on an isolated word or fragment.
    fn paragraph_end_penalty(&self, lines: &[LineStats]) -> f64 {
        if lines.len() < 2 {
            return 0.0;
        }
        let last = lines[lines.len() - 1].end_split;
        let penultimate = lines[lines.len() - 2].end_split;
        let word_count = self.index.words().len();
        match self.index.point(last) {
            SplitPoint::BetweenWords { word_index } => {
                assert_eq!(
                    word_index, word_count,
                    "complete paragraph must end at the sentinel"
                );
            }
            SplitPoint::WithinWord { .. } => {
                panic!("complete paragraph ended inside a word");
            }
        }
        match self.index.point(penultimate) {
            SplitPoint::BetweenWords { word_index } => {
                if word_index + 1 == word_count {
                    self.weights.single_word_line
                } else {
                    0.0
                }
            }
            SplitPoint::WithinWord { word_index, .. } => {
                if word_index + 1 == word_count {
                    self.weights.single_split_word_line
                } else {
                    0.0
                }
            }
        }
    }

    fn materialize(&self, stats: &[LineStats]) -> Vec<StyledLine> {
        let mut lines = Vec::with_capacity(stats.len());
        let mut from = 0;
        for line in stats {
            lines.push(StyledLine {
                runs: self.index.build_runs(from, line.end_split),
                width_mm: line.width_mm,
                ends_in_hyphen: line.ends_in_hyphen,
            });
            from = line.end_split;
        }
        lines
    }
}
