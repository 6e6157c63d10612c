use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::word::{InlineStyle, StyleSet, StyledRun};

/// Font weight/slant variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Regular,
    Italic,
    Bold,
    BoldItalic,
}

/// Parameters identifying a concrete font for measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    /// Family name as understood by the shaping backend.
    pub family: String,
    pub size_pt: f32,
    pub style: FontStyle,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size_pt: f32) -> Self {
        Self {
            family: family.into(),
            size_pt,
            style: FontStyle::Regular,
        }
    }

    /// The same font adjusted for the bold/italic components of an inline
    /// style set. Other inline styles do not change the measured face here;
    /// shaping backends that distinguish them override run measurement.
    pub fn with_inline(&self, style: StyleSet) -> Self {
        let bold = style.contains(InlineStyle::Bold) || matches!(self.style, FontStyle::Bold | FontStyle::BoldItalic);
        let italic =
            style.contains(InlineStyle::Italic) || matches!(self.style, FontStyle::Italic | FontStyle::BoldItalic);
        let resolved = match (bold, italic) {
            (true, true) => FontStyle::BoldItalic,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (false, false) => FontStyle::Regular,
        };
        Self {
            family: self.family.clone(),
            size_pt: self.size_pt,
            style: resolved,
        }
    }

    /// Hashable identity. Sizes closer than a twentieth of a point measure
    /// identically for caching purposes.
    fn cache_key(&self) -> FontKey {
        FontKey {
            family: self.family.clone(),
            size_dpt: (self.size_pt * 10.0).round() as u32,
            style: self.style,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FontKey {
    family: String,
    size_dpt: u32,
    style: FontStyle,
}

/// Measurement hook for rendered text widths.
///
/// Implementations must be pure functions of their inputs: the line-break
/// search measures the same candidate text repeatedly and caches results.
pub trait TextMeasurer: Send + Sync {
    /// Width of `text` rendered with `font`, in millimetres.
    fn text_width_mm(&self, text: &str, font: &FontSpec) -> f32;

    /// Width of a styled run list rendered with the base `font`.
    ///
    /// Default sums per-run widths with bold/italic face substitution.
    fn runs_width_mm(&self, runs: &[StyledRun], font: &FontSpec) -> f32 {
        runs.iter()
            .map(|run| self.text_width_mm(&run.text, &font.with_inline(run.style)))
            .sum()
    }
}

/// Fixed-advance measurer.
///
/// Every character is `advance_mm` wide at 10pt, scaled linearly with the
/// font size. Stands in for a shaping backend in tests and draft layout.
#[derive(Clone, Copy, Debug)]
pub struct FixedAdvanceMeasurer {
    pub advance_mm: f32,
}

impl FixedAdvanceMeasurer {
    pub fn new(advance_mm: f32) -> Self {
        Self { advance_mm }
    }
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        Self { advance_mm: 2.0 }
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn text_width_mm(&self, text: &str, font: &FontSpec) -> f32 {
        text.chars().count() as f32 * self.advance_mm * (font.size_pt / 10.0)
    }
}

/// Caching wrapper around a measurer.
///
/// Keyed by `(text, font)`. Misses mutate the shared map, so the cache is
/// behind a mutex and safe to share across layout workers.
pub struct CachedMeasurer<M> {
    inner: M,
    cache: Mutex<HashMap<(String, FontKey), f32>>,
}

impl<M: TextMeasurer> CachedMeasurer<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct measured texts.
    pub fn len(&self) -> usize {
        self.cache.lock().expect("measure cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M: TextMeasurer> TextMeasurer for CachedMeasurer<M> {
    fn text_width_mm(&self, text: &str, font: &FontSpec) -> f32 {
        let key = (text.to_owned(), font.cache_key());
        let mut cache = self.cache.lock().expect("measure cache poisoned");
        if let Some(width) = cache.get(&key) {
            return *width;
        }
        let width = self.inner.text_width_mm(text, font);
        cache.insert(key, width);
        width
    }

    fn runs_width_mm(&self, runs: &[StyledRun], font: &FontSpec) -> f32 {
        runs.iter()
            .map(|run| self.text_width_mm(&run.text, &font.with_inline(run.style)))
            .sum()
    }
}
