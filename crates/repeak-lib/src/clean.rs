use crate::error::SignalError;
use crate::signal::TimeSeries;

/// Signal-cleaning stage run before detection and refinement. Implementations
/// must return exactly one output sample per input sample.
pub trait SignalCleaner {
    fn clean(&self, ts: &TimeSeries) -> Result<TimeSeries, SignalError>;
}

/// Default cleaner: a single-pole high-pass to strip baseline wander followed
/// by a single-pole low-pass against muscle and mains noise.
#[derive(Debug, Clone, Copy)]
pub struct BandpassCleaner {
    /// High-pass cutoff in Hz
    pub lowcut_hz: f64,
    /// Low-pass cutoff in Hz
    pub highcut_hz: f64,
}

impl Default for BandpassCleaner {
    fn default() -> Self {
        Self {
            lowcut_hz: 0.5,
            highcut_hz: 40.0,
        }
    }
}

impl SignalCleaner for BandpassCleaner {
    fn clean(&self, ts: &TimeSeries) -> Result<TimeSeries, SignalError> {
        validate_samples(&ts.data)?;
        let fs = ts.fs.max(1.0);
        let data = bandpass(&ts.data, fs, self.lowcut_hz, self.highcut_hz);
        Ok(TimeSeries::new(ts.fs, data))
    }
}

/// Cleaner for signals filtered upstream; hands the samples through untouched
/// after validating them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCleaner;

impl SignalCleaner for PassthroughCleaner {
    fn clean(&self, ts: &TimeSeries) -> Result<TimeSeries, SignalError> {
        validate_samples(&ts.data)?;
        Ok(ts.clone())
    }
}

/// Reject empty signals and signals with NaN or infinite samples.
pub(crate) fn validate_samples(data: &[f64]) -> Result<(), SignalError> {
    if data.is_empty() {
        return Err(SignalError::Empty);
    }
    if let Some(index) = data.iter().position(|x| !x.is_finite()) {
        return Err(SignalError::NonFinite { index });
    }
    Ok(())
}

/// High-pass then low-pass. A non-positive `low` skips the high-pass; a
/// non-positive `high`, or one at or above Nyquist, skips the low-pass.
pub(crate) fn bandpass(data: &[f64], fs: f64, low: f64, high: f64) -> Vec<f64> {
    let highpassed = if low > 0.0 {
        single_pole_highpass(data, fs, low)
    } else {
        data.to_vec()
    };
    if high > 0.0 && high < fs * 0.5 {
        single_pole_lowpass(&highpassed, fs, high)
    } else {
        highpassed
    }
}

fn single_pole_highpass(data: &[f64], fs: f64, cutoff_hz: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_hz.max(0.01));
    let dt = 1.0 / fs;
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev_in = data[0];
    let mut prev_out = data[0];
    for &x in data {
        let y = alpha * (prev_out + x - prev_in);
        out.push(y);
        prev_in = x;
        prev_out = y;
    }
    out
}

fn single_pole_lowpass(data: &[f64], fs: f64, cutoff_hz: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_hz.max(0.01));
    let dt = 1.0 / fs;
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev = data[0];
    for &x in data {
        let y = prev + alpha * (x - prev);
        out.push(y);
        prev = y;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_input_unchanged() {
        let ts = TimeSeries::new(250.0, vec![1.0, -2.0, 3.5]);
        let out = PassthroughCleaner.clean(&ts).unwrap();
        assert_eq!(out.data, ts.data);
        assert_eq!(out.fs, ts.fs);
    }

    #[test]
    fn bandpass_preserves_length() {
        let ts = TimeSeries::new(250.0, vec![0.3; 777]);
        let out = BandpassCleaner::default().clean(&ts).unwrap();
        assert_eq!(out.len(), ts.len());
    }

    #[test]
    fn highpass_removes_constant_offset() {
        let ts = TimeSeries::new(250.0, vec![5.0; 2000]);
        let out = BandpassCleaner::default().clean(&ts).unwrap();
        let tail = out.data[out.len() - 1];
        assert!(tail.abs() < 1e-6, "offset survived cleaning: {tail}");
    }

    #[test]
    fn passband_sine_keeps_most_of_its_amplitude() {
        let fs = 250.0;
        let data: Vec<f64> = (0..2000)
            .map(|i| (2.0 * std::f64::consts::PI * 10.0 * i as f64 / fs).sin())
            .collect();
        let out = BandpassCleaner::default()
            .clean(&TimeSeries::new(fs, data))
            .unwrap();
        let peak = out.data[1000..]
            .iter()
            .fold(0.0f64, |acc, &x| acc.max(x.abs()));
        assert!(peak > 0.8 && peak < 1.05, "unexpected passband gain: {peak}");
    }

    #[test]
    fn empty_signal_is_rejected() {
        let ts = TimeSeries::new(250.0, Vec::new());
        let err = PassthroughCleaner.clean(&ts).unwrap_err();
        assert!(matches!(err, SignalError::Empty));
    }

    #[test]
    fn non_finite_sample_is_rejected_with_its_index() {
        let ts = TimeSeries::new(250.0, vec![0.0, 1.0, f64::NAN, 2.0]);
        let err = BandpassCleaner::default().clean(&ts).unwrap_err();
        assert!(matches!(err, SignalError::NonFinite { index: 2 }));
    }
}
