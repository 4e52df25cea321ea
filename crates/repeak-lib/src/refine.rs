use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::signal::{Events, TimeSeries};

/// How to choose the governing maximum when a segment holds several
/// qualifying interior maxima.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaximumRule {
    /// Tallest maximum wins; the earlier one on amplitude ties
    Amplitude,
    /// Maximum nearest either bounding peak wins; the taller one on
    /// distance ties
    Proximity,
}

/// Tuning for segment refinement and finalization. Every fraction must lie
/// strictly between 0 and 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Where the per-segment amplitude threshold sits between the segment
    /// minimum and maximum
    pub threshold_fraction: f64,
    /// How close to equidistant from both bounding peaks a maximum must be,
    /// as a fraction of the segment length, to count as midway. Midway maxima
    /// never relocate a bounding peak; at best they become candidates.
    pub midway_fraction: f64,
    /// Smallest amplitude difference from both bounding peaks a candidate
    /// must show, as a fraction of the segment range
    pub candidate_margin: f64,
    /// Candidate separation window as a fraction of the mean inter-peak
    /// interval, used when `min_separation` is unset
    pub separation_fraction: f64,
    /// Explicit candidate separation window in samples
    pub min_separation: Option<usize>,
    /// Which qualifying maximum governs a segment's decision
    pub maximum_rule: MaximumRule,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            threshold_fraction: 0.4,
            midway_fraction: 0.25,
            candidate_margin: 0.05,
            separation_fraction: 0.1,
            min_separation: None,
            maximum_rule: MaximumRule::Amplitude,
        }
    }
}

impl RefineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !fraction_ok(self.threshold_fraction) {
            return Err(ConfigError::ThresholdFraction(self.threshold_fraction));
        }
        if !fraction_ok(self.midway_fraction) {
            return Err(ConfigError::MidwayFraction(self.midway_fraction));
        }
        if !fraction_ok(self.candidate_margin) {
            return Err(ConfigError::CandidateMargin(self.candidate_margin));
        }
        if !fraction_ok(self.separation_fraction) {
            return Err(ConfigError::SeparationFraction(self.separation_fraction));
        }
        Ok(())
    }
}

fn fraction_ok(f: f64) -> bool {
    f.is_finite() && f > 0.0 && f < 1.0
}

/// Raw output of the per-segment pass, before sorting and deduplication.
#[derive(Debug, Clone)]
pub struct RefinedLists {
    /// One entry per initial peak: its original index or its relocation
    pub adjusted: Vec<usize>,
    /// Candidate extra-beat indices, at most one per segment
    pub candidates: Vec<usize>,
}

/// Final peak sets: both strictly increasing, candidates disjoint from peaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineOutcome {
    pub peaks: Events,
    pub candidates: Events,
}

/// Walk every segment between consecutive initial peaks and decide, per
/// segment, whether its best interior maximum relocates a bounding peak or
/// becomes a candidate. `initial` must be strictly increasing and in range
/// for `clean`; [`RPeakModifier`](crate::modifier::RPeakModifier) checks this
/// before calling.
///
/// Segments are cut from the original peak list only, so a relocation in one
/// segment never changes the bounds of the next; when both neighbors of a
/// peak relocate it, the later segment wins.
pub fn refine_segments(clean: &TimeSeries, initial: &Events, cfg: &RefineConfig) -> RefinedLists {
    let peaks = &initial.indices;
    let mut adjusted = peaks.clone();
    let mut candidates = Vec::new();
    if peaks.len() < 2 {
        return RefinedLists {
            adjusted,
            candidates,
        };
    }

    for i in 0..peaks.len() - 1 {
        let left = peaks[i];
        let right = peaks[i + 1];
        let segment = &clean.data[left..=right];
        if segment.len() < 3 {
            // no interior samples to look at
            continue;
        }

        let (lo, hi) = segment_range(segment);
        let threshold = lo + cfg.threshold_fraction * (hi - lo);
        let maxima = interior_maxima(segment, threshold);
        let Some(pick) = select_maximum(segment, &maxima, cfg.maximum_rule) else {
            continue;
        };

        let apex = left + pick;
        let a_mid = segment[pick];
        let a_left = clean.data[left];
        let a_right = clean.data[right];
        let span = right - left;
        let d_left = pick;
        let d_right = span - pick;

        let midway =
            (d_left as f64 - d_right as f64).abs() <= cfg.midway_fraction * span as f64;

        if midway {
            push_candidate(&mut candidates, apex, a_mid, a_left, a_right, hi - lo, cfg);
        } else if a_mid >= a_left && a_mid >= a_right {
            // taller than both bounding peaks: pull the nearer one onto it
            if d_left > d_right {
                adjusted[i + 1] = apex;
            } else {
                adjusted[i] = apex;
            }
        } else if (a_mid - a_left) * (a_mid - a_right) <= 0.0 {
            // between the two bounding amplitudes: replace the lower peak
            if a_left < a_right {
                adjusted[i] = apex;
            } else {
                adjusted[i + 1] = apex;
            }
        } else {
            // below both bounding peaks
            push_candidate(&mut candidates, apex, a_mid, a_left, a_right, hi - lo, cfg);
        }
    }

    let moved = adjusted
        .iter()
        .zip(peaks.iter())
        .filter(|(a, p)| a != p)
        .count();
    debug!(
        "refined {} segments: {} peaks relocated, {} raw candidates",
        peaks.len() - 1,
        moved,
        candidates.len()
    );
    RefinedLists {
        adjusted,
        candidates,
    }
}

/// Sort and deduplicate both lists, then drop every candidate that sits
/// within the separation window of a kept peak.
pub fn finalize_peaks(lists: RefinedLists, cfg: &RefineConfig) -> RefineOutcome {
    let mut peaks = lists.adjusted;
    peaks.sort_unstable();
    peaks.dedup();

    let mut candidates = lists.candidates;
    candidates.sort_unstable();
    candidates.dedup();

    let window = separation_window(&peaks, cfg);
    candidates.retain(|&c| peaks.iter().all(|&p| c.abs_diff(p) >= window));

    RefineOutcome {
        peaks: Events::from_indices(peaks),
        candidates: Events::from_indices(candidates),
    }
}

fn segment_range(segment: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &s in segment {
        lo = lo.min(s);
        hi = hi.max(s);
    }
    (lo, hi)
}

/// Offsets of interior local maxima strictly above `threshold`. Boundary
/// samples never count; they belong to the bounding peaks themselves.
fn interior_maxima(segment: &[f64], threshold: f64) -> Vec<usize> {
    let mut out = Vec::new();
    for j in 1..segment.len() - 1 {
        if segment[j] > segment[j - 1] && segment[j] > segment[j + 1] && segment[j] > threshold {
            out.push(j);
        }
    }
    out
}

/// The one maximum that governs the segment's decision, per the configured
/// rule. Full ties keep the earliest offset.
fn select_maximum(segment: &[f64], maxima: &[usize], rule: MaximumRule) -> Option<usize> {
    let last = segment.len() - 1;
    maxima.iter().copied().reduce(|best, j| match rule {
        MaximumRule::Amplitude => {
            if segment[j] > segment[best] {
                j
            } else {
                best
            }
        }
        MaximumRule::Proximity => {
            let d_best = best.min(last - best);
            let d_j = j.min(last - j);
            if d_j < d_best || (d_j == d_best && segment[j] > segment[best]) {
                j
            } else {
                best
            }
        }
    })
}

/// Record a candidate when the maximum clears the amplitude margin against
/// both bounding peaks; noise-level maxima are dropped silently.
fn push_candidate(
    candidates: &mut Vec<usize>,
    apex: usize,
    a_mid: f64,
    a_left: f64,
    a_right: f64,
    range: f64,
    cfg: &RefineConfig,
) {
    let margin = cfg.candidate_margin * range;
    if (a_mid - a_left).abs() > margin && (a_mid - a_right).abs() > margin {
        candidates.push(apex);
    }
}

/// Minimum index distance a candidate must keep from every final peak.
/// Defaults to a fraction of the mean inter-peak interval, never below one
/// sample, so exact duplicates are always removed.
fn separation_window(peaks: &[usize], cfg: &RefineConfig) -> usize {
    if let Some(w) = cfg.min_separation {
        return w.max(1);
    }
    if peaks.len() < 2 {
        return 1;
    }
    let mean_gap = (peaks[peaks.len() - 1] - peaks[0]) as f64 / (peaks.len() - 1) as f64;
    ((cfg.separation_fraction * mean_gap).round() as usize).max(1)
}
