use thiserror::Error;

/// Problems with the raw or cleaned signal itself.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signal contains no samples")]
    Empty,

    #[error("signal contains a non-finite sample at index {index}")]
    NonFinite { index: usize },

    #[error("cleaner returned {got} samples for a {expected}-sample signal")]
    LengthMismatch { expected: usize, got: usize },
}

/// Problems reported by (or detected in the output of) the initial
/// R-peak detector.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("signal too short to detect beats: {len} samples, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("detected peak indices are not strictly increasing")]
    UnorderedOutput,

    #[error("detected peak index {index} is out of range for {len} samples")]
    OutOfRange { index: usize, len: usize },

    #[error("detection failed: {0}")]
    Failed(String),
}

/// Out-of-range tuning parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sampling rate must be positive and finite, got {0}")]
    SamplingRate(f64),

    #[error("threshold fraction must lie in (0, 1), got {0}")]
    ThresholdFraction(f64),

    #[error("midway fraction must lie in (0, 1), got {0}")]
    MidwayFraction(f64),

    #[error("candidate margin must lie in (0, 1), got {0}")]
    CandidateMargin(f64),

    #[error("separation fraction must lie in (0, 1), got {0}")]
    SeparationFraction(f64),
}

/// Any failure of the refinement pipeline.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
