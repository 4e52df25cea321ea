use serde::{Deserialize, Serialize};

use crate::clean::bandpass;
use crate::error::DetectError;
use crate::signal::{Events, TimeSeries};

/// Initial R-peak detection stage. Implementations must return strictly
/// increasing in-range sample indices; an empty result is a valid outcome,
/// not an error.
pub trait RPeakDetector {
    fn detect(&self, ts: &TimeSeries) -> Result<Events, DetectError>;
}

/// Tuning for the built-in QRS detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QrsConfig {
    /// Lower edge of the QRS-accentuation band in Hz
    pub lowcut_hz: f64,
    /// Upper edge of the QRS-accentuation band in Hz
    pub highcut_hz: f64,
    /// Moving-window integration length in seconds
    pub integration_window_s: f64,
    /// Refractory period between accepted beats in seconds
    pub min_rr_s: f64,
    /// Position of the adaptive threshold between the noise and signal levels
    pub threshold_scale: f64,
    /// How far behind an envelope crossing to look for the waveform apex, in seconds
    pub search_back_s: f64,
}

impl Default for QrsConfig {
    fn default() -> Self {
        Self {
            lowcut_hz: 5.0,
            highcut_hz: 15.0,
            integration_window_s: 0.150,
            min_rr_s: 0.300,
            threshold_scale: 0.6,
            search_back_s: 0.150,
        }
    }
}

/// Pan-Tompkins style detector: band-pass, differentiate, square, integrate
/// over a moving window, then walk the envelope with an adaptive two-level
/// threshold and place each beat at the filtered-signal apex just behind the
/// crossing.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrsDetector {
    pub cfg: QrsConfig,
}

impl QrsDetector {
    pub fn new(cfg: QrsConfig) -> Self {
        Self { cfg }
    }

    /// Shortest signal the detector accepts: one integration window plus the
    /// two samples differencing eats.
    fn min_samples(&self, fs: f64) -> usize {
        ((self.cfg.integration_window_s * fs).round() as usize).max(1) + 2
    }
}

impl RPeakDetector for QrsDetector {
    fn detect(&self, ts: &TimeSeries) -> Result<Events, DetectError> {
        let fs = ts.fs.max(1.0);
        let min = self.min_samples(fs);
        if ts.len() < min {
            return Err(DetectError::TooShort { len: ts.len(), min });
        }
        let lo = ts.data.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = ts.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if hi - lo <= 0.0 {
            // flat segment, nothing to find
            return Ok(Events::from_indices(Vec::new()));
        }

        let (filtered, envelope) = qrs_envelope(&ts.data, fs, &self.cfg);
        let mut peaks = pick_envelope_peaks(&filtered, &envelope, fs, &self.cfg);
        if peaks.len() < 2 {
            // adaptive pass found too little to trust; fall back to plain
            // baseline-corrected local maxima
            peaks = fallback_local_maxima(&ts.data, fs, &self.cfg);
        }
        Ok(Events::from_indices(peaks))
    }
}

/// Band-passed signal plus its squared-derivative moving-window envelope.
fn qrs_envelope(data: &[f64], fs: f64, cfg: &QrsConfig) -> (Vec<f64>, Vec<f64>) {
    let filtered = bandpass(data, fs, cfg.lowcut_hz, cfg.highcut_hz);
    let mut squared = vec![0.0; filtered.len()];
    for i in 1..filtered.len() {
        let d = filtered[i] - filtered[i - 1];
        squared[i] = d * d;
    }
    let window = ((cfg.integration_window_s * fs).round() as usize).max(1);
    let envelope = moving_average(&squared, window);
    (filtered, envelope)
}

fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if data.is_empty() || window <= 1 {
        return data.to_vec();
    }
    let mut out = vec![0.0; data.len()];
    let mut acc = 0.0;
    for (i, &x) in data.iter().enumerate() {
        acc += x;
        if i >= window {
            acc -= data[i - window];
        }
        out[i] = acc / window as f64;
    }
    out
}

fn pick_envelope_peaks(filtered: &[f64], envelope: &[f64], fs: f64, cfg: &QrsConfig) -> Vec<usize> {
    if envelope.is_empty() {
        return Vec::new();
    }
    let refractory = ((cfg.min_rr_s * fs).round() as usize).max(1);
    let search = ((cfg.search_back_s * fs).round() as usize).max(1);

    // seed both running levels from the first second of envelope
    let warmup = envelope.len().min((fs as usize).max(1));
    let seed = envelope[..warmup].iter().sum::<f64>() / warmup as f64;
    let mut signal_level = seed;
    let mut noise_level = seed * 0.5;
    let mut threshold =
        noise_level + cfg.threshold_scale * (signal_level - noise_level).max(0.0);

    let mut peaks: Vec<usize> = Vec::new();
    let mut last_trigger = 0usize;
    for (i, &e) in envelope.iter().enumerate() {
        let clear_of_refractory = peaks.is_empty() || i - last_trigger >= refractory;
        if e >= threshold && clear_of_refractory {
            let start = i.saturating_sub(search);
            let mut apex = start;
            for j in start..=i {
                if filtered[j] > filtered[apex] {
                    apex = j;
                }
            }
            peaks.push(apex);
            last_trigger = i;
            signal_level = 0.125 * e + 0.875 * signal_level;
        } else {
            noise_level = 0.125 * e + 0.875 * noise_level;
        }
        threshold = noise_level + cfg.threshold_scale * (signal_level - noise_level).max(0.0);
    }
    peaks.sort_unstable();
    peaks.dedup();
    peaks
}

/// Local maxima of the baseline-corrected signal, spaced at least one
/// refractory period apart.
fn fallback_local_maxima(data: &[f64], fs: f64, cfg: &QrsConfig) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    let window = ((cfg.integration_window_s * fs).round() as usize).max(1);
    let min_gap = ((cfg.min_rr_s * fs).round() as usize).max(1);
    let baseline = moving_average(data, window);
    let mut peaks: Vec<usize> = Vec::new();
    let mut last = 0usize;
    for i in 1..data.len() - 1 {
        let y = data[i] - baseline[i];
        let is_max = y > 0.0
            && y > data[i - 1] - baseline[i - 1]
            && y > data[i + 1] - baseline[i + 1];
        if is_max && (peaks.is_empty() || i - last >= min_gap) {
            peaks.push(i);
            last = i;
        }
    }
    peaks
}
