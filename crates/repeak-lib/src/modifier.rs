use log::debug;
use serde::{Deserialize, Serialize};

use crate::clean::{validate_samples, BandpassCleaner, SignalCleaner};
use crate::detect::{QrsDetector, RPeakDetector};
use crate::error::{ConfigError, DetectError, RefineError, SignalError};
use crate::refine::{finalize_peaks, refine_segments, RefineConfig};
use crate::signal::{Events, TimeSeries};

/// What one refinement run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineSummary {
    /// Sampling rate of the signal in Hz
    pub fs: f64,
    /// Number of samples examined
    pub sample_count: usize,
    /// Peaks the run started from
    pub initial: Events,
    /// Refined peaks
    pub peaks: Events,
    /// Possible extra beats, kept apart for review
    pub candidates: Events,
    /// How many initial peaks ended at a new index
    pub relocated: usize,
}

/// Owns a signal and the cleaning and detection collaborators, runs the
/// refinement pipeline over them, and caches the intermediate products so
/// repeated calls never repeat work.
pub struct RPeakModifier {
    ts: TimeSeries,
    cfg: RefineConfig,
    cleaner: Box<dyn SignalCleaner>,
    detector: Box<dyn RPeakDetector>,
    cleaned: Option<TimeSeries>,
    initial: Option<Events>,
}

impl RPeakModifier {
    /// Validate the signal and configuration and set up the default
    /// collaborators (band-pass cleaner, QRS detector).
    pub fn new(ts: TimeSeries, cfg: RefineConfig) -> Result<Self, RefineError> {
        if !(ts.fs.is_finite() && ts.fs > 0.0) {
            return Err(ConfigError::SamplingRate(ts.fs).into());
        }
        cfg.validate()?;
        validate_samples(&ts.data)?;
        Ok(Self {
            ts,
            cfg,
            cleaner: Box::new(BandpassCleaner::default()),
            detector: Box::new(QrsDetector::default()),
            cleaned: None,
            initial: None,
        })
    }

    /// Swap the cleaning stage. Drops anything computed with the old one.
    pub fn with_cleaner(mut self, cleaner: Box<dyn SignalCleaner>) -> Self {
        self.cleaner = cleaner;
        self.cleaned = None;
        self.initial = None;
        self
    }

    /// Swap the detection stage. Drops the cached detector output.
    pub fn with_detector(mut self, detector: Box<dyn RPeakDetector>) -> Self {
        self.detector = detector;
        self.initial = None;
        self
    }

    /// Cleaned signal, computed on first use.
    pub fn cleaned_signal(&mut self) -> Result<&TimeSeries, RefineError> {
        self.ensure_cleaned()?;
        Ok(self.cleaned.as_ref().expect("cleaned after ensure_cleaned"))
    }

    /// Initial detector output, computed on first use.
    pub fn initial_peaks(&mut self) -> Result<&Events, RefineError> {
        self.ensure_initial()?;
        Ok(self.initial.as_ref().expect("initial after ensure_initial"))
    }

    /// Full pipeline: clean, detect, refine every inter-peak segment, then
    /// sort and deduplicate. Running it again returns the same summary.
    pub fn adjust_peaks(&mut self) -> Result<RefineSummary, RefineError> {
        self.ensure_initial()?;
        let initial = self.initial.clone().expect("initial after ensure_initial");
        Ok(self.refine(initial))
    }

    /// Like [`adjust_peaks`](Self::adjust_peaks) but starting from
    /// caller-supplied peaks (annotated recordings); the detector is never
    /// consulted.
    pub fn adjust_provided(&mut self, initial: Events) -> Result<RefineSummary, RefineError> {
        check_peak_list(&initial, self.ts.len())?;
        self.ensure_cleaned()?;
        Ok(self.refine(initial))
    }

    fn ensure_cleaned(&mut self) -> Result<(), RefineError> {
        if self.cleaned.is_some() {
            return Ok(());
        }
        let out = self.cleaner.clean(&self.ts)?;
        if out.len() != self.ts.len() {
            return Err(SignalError::LengthMismatch {
                expected: self.ts.len(),
                got: out.len(),
            }
            .into());
        }
        self.cleaned = Some(out);
        Ok(())
    }

    fn ensure_initial(&mut self) -> Result<(), RefineError> {
        if self.initial.is_some() {
            return Ok(());
        }
        self.ensure_cleaned()?;
        let clean = self.cleaned.as_ref().expect("cleaned after ensure_cleaned");
        let events = self.detector.detect(clean)?;
        check_peak_list(&events, clean.len())?;
        debug!("initial detection found {} peaks", events.len());
        self.initial = Some(events);
        Ok(())
    }

    fn refine(&self, initial: Events) -> RefineSummary {
        let clean = self.cleaned.as_ref().expect("cleaned before refine");
        let lists = refine_segments(clean, &initial, &self.cfg);
        let relocated = lists
            .adjusted
            .iter()
            .zip(initial.indices.iter())
            .filter(|(a, b)| a != b)
            .count();
        let outcome = finalize_peaks(lists, &self.cfg);
        debug!(
            "adjusted {} initial peaks: {} kept, {} relocated, {} candidates",
            initial.len(),
            outcome.peaks.len(),
            relocated,
            outcome.candidates.len()
        );
        RefineSummary {
            fs: self.ts.fs,
            sample_count: self.ts.len(),
            initial,
            peaks: outcome.peaks,
            candidates: outcome.candidates,
            relocated,
        }
    }
}

/// Peak lists entering refinement must be strictly increasing and in range,
/// whether they come from a detector or from the caller.
fn check_peak_list(events: &Events, len: usize) -> Result<(), DetectError> {
    if !events.is_strictly_increasing() {
        return Err(DetectError::UnorderedOutput);
    }
    if let Some(&index) = events.indices.iter().find(|&&i| i >= len) {
        return Err(DetectError::OutOfRange { index, len });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::PassthroughCleaner;

    struct FixedDetector(Vec<usize>);

    impl RPeakDetector for FixedDetector {
        fn detect(&self, _ts: &TimeSeries) -> Result<Events, DetectError> {
            Ok(Events::from_indices(self.0.clone()))
        }
    }

    struct FailingDetector;

    impl RPeakDetector for FailingDetector {
        fn detect(&self, _ts: &TimeSeries) -> Result<Events, DetectError> {
            Err(DetectError::Failed("must not be consulted".into()))
        }
    }

    struct TruncatingCleaner;

    impl SignalCleaner for TruncatingCleaner {
        fn clean(&self, ts: &TimeSeries) -> Result<TimeSeries, SignalError> {
            let mut data = ts.data.clone();
            data.pop();
            Ok(TimeSeries::new(ts.fs, data))
        }
    }

    /// Baseline with a mislocated first peak (true apex at 13), a clean
    /// middle and last peak, and a lone midway bump at 70.
    fn fixture() -> TimeSeries {
        let mut data = vec![0.0; 100];
        for (i, a) in [(10, 9.0), (13, 12.0), (50, 10.0), (70, 6.0), (90, 10.0)] {
            data[i] = a;
        }
        TimeSeries::new(250.0, data)
    }

    fn fixture_modifier() -> RPeakModifier {
        RPeakModifier::new(fixture(), RefineConfig::default())
            .unwrap()
            .with_cleaner(Box::new(PassthroughCleaner))
            .with_detector(Box::new(FixedDetector(vec![10, 50, 90])))
    }

    #[test]
    fn create_rejects_bad_signals_and_config() {
        let err = RPeakModifier::new(TimeSeries::new(250.0, vec![]), RefineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, RefineError::Signal(SignalError::Empty)));

        let err = RPeakModifier::new(
            TimeSeries::new(250.0, vec![0.0, f64::INFINITY]),
            RefineConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            RefineError::Signal(SignalError::NonFinite { index: 1 })
        ));

        let err = RPeakModifier::new(TimeSeries::new(0.0, vec![1.0]), RefineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RefineError::Config(ConfigError::SamplingRate(_))
        ));

        let cfg = RefineConfig {
            midway_fraction: -0.2,
            ..RefineConfig::default()
        };
        let err = RPeakModifier::new(fixture(), cfg).err().unwrap();
        assert!(matches!(
            err,
            RefineError::Config(ConfigError::MidwayFraction(_))
        ));
    }

    #[test]
    fn substituted_collaborators_drive_the_pipeline() {
        let summary = fixture_modifier().adjust_peaks().unwrap();
        assert_eq!(summary.initial.indices, vec![10, 50, 90]);
        assert_eq!(summary.peaks.indices, vec![13, 50, 90]);
        assert_eq!(summary.candidates.indices, vec![70]);
        assert_eq!(summary.relocated, 1);
        assert_eq!(summary.sample_count, 100);

        assert!(summary.peaks.is_strictly_increasing());
        assert!(summary.candidates.is_strictly_increasing());
        for c in &summary.candidates.indices {
            assert!(!summary.peaks.indices.contains(c));
        }
    }

    #[test]
    fn provided_peaks_never_consult_the_detector() {
        let mut modifier = RPeakModifier::new(fixture(), RefineConfig::default())
            .unwrap()
            .with_cleaner(Box::new(PassthroughCleaner))
            .with_detector(Box::new(FailingDetector));
        let summary = modifier
            .adjust_provided(Events::from_indices(vec![10, 50, 90]))
            .unwrap();
        assert_eq!(summary.peaks.indices, vec![13, 50, 90]);
        assert_eq!(summary.candidates.indices, vec![70]);
    }

    #[test]
    fn detector_output_is_checked() {
        let err = fixture_modifier()
            .with_detector(Box::new(FixedDetector(vec![50, 10])))
            .adjust_peaks()
            .unwrap_err();
        assert!(matches!(
            err,
            RefineError::Detect(DetectError::UnorderedOutput)
        ));

        let err = fixture_modifier()
            .with_detector(Box::new(FixedDetector(vec![10, 1000])))
            .adjust_peaks()
            .unwrap_err();
        assert!(matches!(
            err,
            RefineError::Detect(DetectError::OutOfRange {
                index: 1000,
                len: 100
            })
        ));
    }

    #[test]
    fn provided_peaks_are_checked_too() {
        let mut modifier = fixture_modifier();
        let err = modifier
            .adjust_provided(Events::from_indices(vec![50, 10]))
            .unwrap_err();
        assert!(matches!(
            err,
            RefineError::Detect(DetectError::UnorderedOutput)
        ));

        let err = modifier
            .adjust_provided(Events::from_indices(vec![10, 500]))
            .unwrap_err();
        assert!(matches!(
            err,
            RefineError::Detect(DetectError::OutOfRange { index: 500, .. })
        ));
    }

    #[test]
    fn cleaner_must_preserve_length() {
        let err = fixture_modifier()
            .with_cleaner(Box::new(TruncatingCleaner))
            .adjust_peaks()
            .unwrap_err();
        assert!(matches!(
            err,
            RefineError::Signal(SignalError::LengthMismatch {
                expected: 100,
                got: 99
            })
        ));
    }

    #[test]
    fn flatline_yields_empty_results_not_an_error() {
        let mut modifier = RPeakModifier::new(
            TimeSeries::new(250.0, vec![2.0; 500]),
            RefineConfig::default(),
        )
        .unwrap()
        .with_cleaner(Box::new(PassthroughCleaner));

        assert_eq!(modifier.cleaned_signal().unwrap().data, vec![2.0; 500]);
        assert!(modifier.initial_peaks().unwrap().is_empty());
        let summary = modifier.adjust_peaks().unwrap();
        assert!(summary.peaks.is_empty());
        assert!(summary.candidates.is_empty());
        assert_eq!(summary.relocated, 0);
    }

    #[test]
    fn rerunning_returns_the_same_summary() {
        let mut modifier = fixture_modifier();
        let first = modifier.adjust_peaks().unwrap();
        let second = modifier.adjust_peaks().unwrap();
        assert_eq!(first.peaks.indices, second.peaks.indices);
        assert_eq!(first.candidates.indices, second.candidates.indices);
        assert_eq!(first.relocated, second.relocated);
    }

    #[test]
    fn summary_round_trips_through_json() {
        let summary = fixture_modifier().adjust_peaks().unwrap();
        let text = serde_json::to_string(&summary).unwrap();
        let back: RefineSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(back.peaks.indices, summary.peaks.indices);
        assert_eq!(back.candidates.indices, summary.candidates.indices);
        assert_eq!(back.relocated, summary.relocated);
        assert_eq!(back.sample_count, summary.sample_count);
    }
}
