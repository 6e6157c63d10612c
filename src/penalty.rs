//! Numeric scoring shared by the line and page optimizers.
//!
//! All penalties are additive and nonnegative; lower is better. Ties between
//! equal-penalty candidates are resolved by search order, so the functions
//! here must stay pure and deterministic.

use serde::{Deserialize, Serialize};

use crate::linebreak::StyledLine;

/// Layout quality profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    /// Fast preview layout: symmetric width scoring, stricter hyphen-run
    /// reporting, greedy line fitting.
    Draft,
    /// Print-quality layout with the full optimizing search.
    #[default]
    Final,
}

/// Tunable penalty amounts.
///
/// Changing any of these changes chosen output; regenerate fixtures when
/// tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    /// Width-deviation multiplier applied when a line overflows its target.
    /// Underflow always weighs 1.
    pub overflow_multiplier: f64,
    /// Base amount for a run of consecutive hyphen-ended lines.
    pub hyphen_run_base: f64,
    /// Run length at which consecutive hyphen endings start to cost.
    pub hyphen_run_threshold: usize,
    /// A last line holding a single word.
    pub single_word_line: f64,
    /// A last line holding the continuation fragment of a split word.
    pub single_split_word_line: f64,
    /// A page whose last line is the opening stub of a paragraph.
    pub orphan: u64,
    /// A page starting with the final line of a paragraph.
    pub widow: u64,
    /// Per line of height difference between facing pages.
    pub height_mismatch: u64,
}

impl PenaltyWeights {
    /// Weights for a render mode.
    pub fn for_mode(mode: RenderMode) -> Self {
        match mode {
            RenderMode::Draft => Self {
                overflow_multiplier: 1.0,
                hyphen_run_threshold: 2,
                ..Self::default()
            },
            RenderMode::Final => Self::default(),
        }
    }
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            overflow_multiplier: 5.0,
            hyphen_run_base: 10.0,
            hyphen_run_threshold: 3,
            single_word_line: 10.0,
            single_split_word_line: 50.0,
            orphan: 10,
            widow: 10,
            height_mismatch: 7,
        }
    }
}

/// Squared width deviation of one line from its target.
pub fn line_width_penalty(actual_mm: f32, target_mm: f32, weights: &PenaltyWeights) -> f64 {
    assert!(
        target_mm > 0.0,
        "line target width must be positive, got {target_mm}"
    );
    let multiplier = if actual_mm > target_mm {
        weights.overflow_multiplier
    } else {
        1.0
    };
    let delta = f64::from((actual_mm - target_mm).abs());
    multiplier * delta * delta
}

/// Penalty of one maximal run of hyphen-ended lines.
///
/// Grows by a factor of five per extra line so long ladders price
/// themselves out quickly.
pub fn hyphen_run_penalty(run_len: usize, weights: &PenaltyWeights) -> f64 {
    if run_len < weights.hyphen_run_threshold {
        return 0.0;
    }
    weights.hyphen_run_base * 5f64.powi(run_len as i32 - 1)
}

/// Sum of run penalties over a sequence of ends-in-hyphen flags.
pub fn consecutive_hyphen_penalty<I>(flags: I, weights: &PenaltyWeights) -> f64
where
    I: IntoIterator<Item = bool>,
{
    let mut total = 0.0;
    let mut run = 0usize;
    for ends_in_hyphen in flags {
        if ends_in_hyphen {
            run += 1;
        } else {
            total += hyphen_run_penalty(run, weights);
            run = 0;
        }
    }
    total + hyphen_run_penalty(run, weights)
}

/// Classified extra penalty for statistics output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtraPenaltyKind {
    ConsecutiveHyphens,
    SingleWordLastLine,
    SplitWordLastLine,
}

/// One extra penalty with the line it was charged to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtraPenalty {
    pub kind: ExtraPenaltyKind,
    /// First line of the offending run, or the offending line itself.
    pub line: usize,
    pub penalty: f64,
}

/// Per-line width deviation report.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineWidthReport {
    pub delta_mm: f32,
    pub penalty: f64,
}

/// Penalty breakdown of a finished paragraph, for statistics output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphReport {
    pub lines: Vec<LineWidthReport>,
    pub extras: Vec<ExtraPenalty>,
}

impl ParagraphReport {
    pub fn total(&self) -> f64 {
        self.lines.iter().map(|l| l.penalty).sum::<f64>()
            + self.extras.iter().map(|e| e.penalty).sum::<f64>()
    }
}

/// Score a materialized paragraph the way the optimizer did.
///
/// `target_mm` is the paragraph width; the first line target is shortened by
/// `indent_mm`. The last line is exempt from the width term unless it is the
/// only line.
pub fn paragraph_report(
    lines: &[StyledLine],
    target_mm: f32,
    indent_mm: f32,
    weights: &PenaltyWeights,
) -> ParagraphReport {
    let mut report = ParagraphReport::default();
    let mut target = target_mm - indent_mm;
    for line in lines {
        report.lines.push(LineWidthReport {
            delta_mm: line.width_mm - target,
            penalty: line_width_penalty(line.width_mm, target, weights),
        });
        target = target_mm;
    }
    if report.lines.len() > 1 {
        if let Some(last) = report.lines.last_mut() {
            *last = LineWidthReport {
                delta_mm: 0.0,
                penalty: 0.0,
            };
        }
    }

    let mut run = 0usize;
    for (idx, line) in lines.iter().enumerate() {
        if line.ends_in_hyphen {
            run += 1;
            continue;
        }
        if run >= weights.hyphen_run_threshold {
            report.extras.push(ExtraPenalty {
                kind: ExtraPenaltyKind::ConsecutiveHyphens,
                line: idx - run,
                penalty: hyphen_run_penalty(run, weights),
            });
        }
        run = 0;
    }
    if run >= weights.hyphen_run_threshold {
        report.extras.push(ExtraPenalty {
            kind: ExtraPenaltyKind::ConsecutiveHyphens,
            line: lines.len() - run,
            penalty: hyphen_run_penalty(run, weights),
        });
    }

    if lines.len() >= 2 {
        let last = &lines[lines.len() - 1];
        let single_word = !last.text().contains(' ');
        if single_word {
            let penultimate = &lines[lines.len() - 2];
            if penultimate.ends_in_hyphen {
                report.extras.push(ExtraPenalty {
                    kind: ExtraPenaltyKind::SplitWordLastLine,
                    line: lines.len() - 2,
                    penalty: weights.single_split_word_line,
                });
            } else {
                report.extras.push(ExtraPenalty {
                    kind: ExtraPenaltyKind::SingleWordLastLine,
                    line: lines.len() - 1,
                    penalty: weights.single_word_line,
                });
            }
        }
    }
    report
}
