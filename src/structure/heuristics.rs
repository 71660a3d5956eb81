//! Layout heuristics for heading detection
//!
//! Document-wide measurements (body font size, median line gap) are computed
//! once per call into a [`LayoutProfile`] and passed around explicitly.

use super::layout::PageGeometry;
use crate::config::StructureConfig;
use crate::types::{Fragment, HeadingLevel};
use std::collections::{BTreeMap, HashMap};

const SIZE_WEIGHT: f64 = 0.4;
const BOLD_WEIGHT: f64 = 0.2;
const HORIZONTAL_WEIGHT: f64 = 0.2;
const VERTICAL_WEIGHT: f64 = 0.2;

/// Font sizes are compared in half-point steps
fn size_key(size: f64) -> i64 {
    (size * 2.0).round() as i64
}

/// Per-document layout measurements over the eligible fragments
#[derive(Debug, Clone, Default)]
pub struct LayoutProfile {
    /// Character-weighted modal font size
    pub body_font_size: Option<f64>,
    /// Median vertical gap between consecutive fragments on a page
    pub median_gap: Option<f64>,
    gap_above: HashMap<usize, f64>,
    gap_below: HashMap<usize, f64>,
    line_siblings: Vec<bool>,
}

impl LayoutProfile {
    /// Measure the fragments for which `eligible` is true
    pub fn measure(fragments: &[Fragment], eligible: &[bool]) -> Self {
        let mut weights: BTreeMap<i64, usize> = BTreeMap::new();
        for (i, fragment) in fragments.iter().enumerate() {
            if !eligible[i] {
                continue;
            }
            if let Some(size) = fragment.font_size {
                *weights.entry(size_key(size)).or_default() += fragment.char_count();
            }
        }
        // Ties go to the smaller size: body text is rarely the largest font
        let body_font_size = weights
            .iter()
            .fold(None::<(i64, usize)>, |best, (key, weight)| match best {
                Some((_, best_weight)) if best_weight >= *weight => best,
                _ => Some((*key, *weight)),
            })
            .map(|(key, _)| key as f64 / 2.0);

        let mut by_page: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, fragment) in fragments.iter().enumerate() {
            if eligible[i] {
                by_page.entry(fragment.page).or_default().push(i);
            }
        }

        let mut gap_above = HashMap::new();
        let mut gap_below = HashMap::new();
        let mut line_siblings = vec![false; fragments.len()];
        let mut gaps = Vec::new();

        for indices in by_page.values_mut() {
            indices.sort_by(|a, b| {
                let (fa, fb) = (&fragments[*a].bbox, &fragments[*b].bbox);
                fa.y0.total_cmp(&fb.y0).then(fa.x0.total_cmp(&fb.x0))
            });

            for pair in indices.windows(2) {
                let gap = fragments[pair[1]].bbox.y0 - fragments[pair[0]].bbox.y1;
                gap_below.insert(pair[0], gap);
                gap_above.insert(pair[1], gap);
                if gap > 0.0 {
                    gaps.push(gap);
                }
            }

            for (pos, &a) in indices.iter().enumerate() {
                for &b in &indices[pos + 1..] {
                    if fragments[a].bbox.shares_line_with(&fragments[b].bbox) {
                        line_siblings[a] = true;
                        line_siblings[b] = true;
                    }
                }
            }
        }

        gaps.sort_by(|a, b| a.total_cmp(b));
        let median_gap = match gaps.len() {
            0 => None,
            n if n % 2 == 1 => Some(gaps[n / 2]),
            n => Some((gaps[n / 2 - 1] + gaps[n / 2]) / 2.0),
        };

        Self {
            body_font_size,
            median_gap,
            gap_above,
            gap_below,
            line_siblings,
        }
    }

    fn is_vertically_isolated(&self, index: usize) -> bool {
        let isolated = |gap: Option<&f64>| match (gap, self.median_gap) {
            (None, _) => true,
            (Some(g), Some(median)) => *g > median,
            (Some(g), None) => *g > 0.0,
        };
        isolated(self.gap_above.get(&index)) && isolated(self.gap_below.get(&index))
    }

    fn has_line_sibling(&self, index: usize) -> bool {
        self.line_siblings.get(index).copied().unwrap_or(false)
    }
}

/// Composite heading score in `0.0..=1.0`
pub fn heading_score(
    index: usize,
    fragment: &Fragment,
    profile: &LayoutProfile,
    geometry: &PageGeometry,
    config: &StructureConfig,
) -> f64 {
    let mut score = 0.0;

    // Text at the body size is never "large", whatever the absolute threshold
    if let Some(size) = fragment.font_size {
        let above_body = profile.body_font_size.is_none_or(|body| size > body);
        let relative = profile
            .body_font_size
            .is_some_and(|body| body > 0.0 && size / body >= config.heading_size_ratio);
        if above_body && (size >= config.font_size_threshold || relative) {
            score += SIZE_WEIGHT;
        }
    }

    if fragment.bold {
        score += BOLD_WEIGHT;
    }

    let (page_width, _) = geometry.size(fragment.page);
    if page_width > 0.0
        && fragment.bbox.width() / page_width < config.heading_isolation_threshold
        && !profile.has_line_sibling(index)
    {
        score += HORIZONTAL_WEIGHT;
    }

    if profile.is_vertically_isolated(index) {
        score += VERTICAL_WEIGHT;
    }

    score
}

/// A fragment that scored above the heading threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingCandidate {
    pub index: usize,
    pub font_size: Option<f64>,
    pub bold: bool,
}

/// Font sizes at which both bold and regular candidates were seen
#[derive(Debug, Clone, PartialEq)]
pub struct LevelAssignment {
    pub levels: Vec<(usize, HeadingLevel)>,
    pub ties: Vec<f64>,
}

/// Rank candidates by (size, bold): larger first, bold over regular at equal
/// size. Candidates sharing a key share a level.
pub fn assign_levels(candidates: &[HeadingCandidate]) -> LevelAssignment {
    // Candidates without a size rank below every sized key
    let key = |c: &HeadingCandidate| (c.font_size.map(size_key).unwrap_or(i64::MIN), c.bold);

    let mut keys: Vec<(i64, bool)> = candidates.iter().map(key).collect();
    keys.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    keys.dedup();

    let ranks: HashMap<(i64, bool), HeadingLevel> = keys
        .iter()
        .enumerate()
        .map(|(rank, k)| (*k, level_for_rank(rank, keys.len())))
        .collect();

    let ties = keys
        .windows(2)
        .filter(|pair| pair[0].0 == pair[1].0 && pair[0].0 != i64::MIN)
        .map(|pair| pair[0].0 as f64 / 2.0)
        .collect();

    let levels = candidates
        .iter()
        .map(|c| (c.index, ranks[&key(c)]))
        .collect();

    LevelAssignment { levels, ties }
}

fn level_for_rank(rank: usize, distinct: usize) -> HeadingLevel {
    let ladder: &[HeadingLevel] = match distinct {
        0 | 1 => &[HeadingLevel::Chapter],
        2 => &[HeadingLevel::Chapter, HeadingLevel::Section],
        _ => &[HeadingLevel::Part, HeadingLevel::Chapter, HeadingLevel::Section],
    };
    ladder[rank.min(ladder.len() - 1)]
}
