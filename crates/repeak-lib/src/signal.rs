use serde::{Deserialize, Serialize};

/// Uniformly sampled signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_s(&self) -> f64 {
        if self.fs > 0.0 {
            self.data.len() as f64 / self.fs
        } else {
            0.0
        }
    }
}

/// Point events on a signal, stored as sample indices (here: R-peaks).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// True when indices are strictly increasing, which also rules out
    /// duplicates.
    pub fn is_strictly_increasing(&self) -> bool {
        self.indices.windows(2).all(|w| w[0] < w[1])
    }

    /// True when every index addresses a sample of a `len`-sample signal.
    pub fn in_range(&self, len: usize) -> bool {
        self.indices.iter().all(|&i| i < len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_follows_sampling_rate() {
        let ts = TimeSeries::new(250.0, vec![0.0; 500]);
        assert!((ts.duration_s() - 2.0).abs() < 1e-12);
        assert_eq!(ts.len(), 500);
    }

    #[test]
    fn strictly_increasing_rejects_dups_and_disorder() {
        assert!(Events::from_indices(vec![]).is_strictly_increasing());
        assert!(Events::from_indices(vec![7]).is_strictly_increasing());
        assert!(Events::from_indices(vec![1, 5, 9]).is_strictly_increasing());
        assert!(!Events::from_indices(vec![1, 5, 5]).is_strictly_increasing());
        assert!(!Events::from_indices(vec![5, 1]).is_strictly_increasing());
    }

    #[test]
    fn in_range_checks_every_index() {
        let ev = Events::from_indices(vec![0, 99]);
        assert!(ev.in_range(100));
        assert!(!ev.in_range(99));
    }
}
