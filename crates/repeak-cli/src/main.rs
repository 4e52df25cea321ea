use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use repeak_lib::{
    clean::PassthroughCleaner,
    detect::{QrsConfig, QrsDetector},
    io::{csv as csv_io, text as text_io},
    modifier::RPeakModifier,
    refine::{MaximumRule, RefineConfig},
    signal::{Events, TimeSeries},
};
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "repeak", version, about = "ECG R-peak refinement tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MaxRule {
    #[value(name = "amplitude")]
    Amplitude,
    #[value(name = "proximity")]
    Proximity,
}

impl From<MaxRule> for MaximumRule {
    fn from(rule: MaxRule) -> Self {
        match rule {
            MaxRule::Amplitude => MaximumRule::Amplitude,
            MaxRule::Proximity => MaximumRule::Proximity,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Detect, refine, and deduplicate R-peaks; prints a JSON summary
    AdjustRpeaks {
        #[arg(long, default_value_t = 250.0)]
        fs: f64,
        /// Newline-delimited samples; stdin when neither --input nor --csv is given
        #[arg(long)]
        input: Option<PathBuf>,
        /// Headered CSV file to read samples from
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Column of the CSV file holding the samples
        #[arg(long, default_value = "ecg")]
        column: String,
        /// Newline-delimited initial peak indices; skips the detector
        #[arg(long)]
        peaks: Option<PathBuf>,
        /// Refine the signal as-is instead of band-pass cleaning it first
        #[arg(long, default_value_t = false)]
        no_clean: bool,
        #[arg(long, default_value_t = 0.4)]
        threshold_fraction: f64,
        #[arg(long, default_value_t = 0.25)]
        midway_fraction: f64,
        #[arg(long, default_value_t = 0.05)]
        candidate_margin: f64,
        #[arg(long, default_value_t = 0.1)]
        separation_fraction: f64,
        /// Candidate separation window in samples; overrides --separation-fraction
        #[arg(long)]
        min_separation: Option<usize>,
        /// Which qualifying maximum governs a segment's decision
        #[arg(long, default_value = "amplitude")]
        maximum_rule: MaxRule,
    },
    /// Run only the initial R-peak detector and print its output as JSON
    FindRpeaks {
        #[arg(long, default_value_t = 250.0)]
        fs: f64,
        #[arg(long, default_value_t = 0.3)]
        min_rr_s: f64,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, default_value = "ecg")]
        column: String,
        #[arg(long, default_value_t = false)]
        no_clean: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::AdjustRpeaks {
            fs,
            input,
            csv,
            column,
            peaks,
            no_clean,
            threshold_fraction,
            midway_fraction,
            candidate_margin,
            separation_fraction,
            min_separation,
            maximum_rule,
        } => cmd_adjust_rpeaks(
            fs,
            input.as_deref(),
            csv.as_deref(),
            &column,
            peaks.as_deref(),
            no_clean,
            threshold_fraction,
            midway_fraction,
            candidate_margin,
            separation_fraction,
            min_separation,
            maximum_rule,
        )?,
        Commands::FindRpeaks {
            fs,
            min_rr_s,
            input,
            csv,
            column,
            no_clean,
        } => cmd_find_rpeaks(
            fs,
            min_rr_s,
            input.as_deref(),
            csv.as_deref(),
            &column,
            no_clean,
        )?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_samples(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_samples(&buf)
        }
    }
}

fn load_time_series(
    fs: f64,
    input: Option<&Path>,
    csv: Option<&Path>,
    column: &str,
) -> Result<TimeSeries> {
    if let Some(path) = csv {
        let data = csv_io::read_csv_column(path, column)?;
        Ok(TimeSeries::new(fs, data))
    } else {
        let data = read_samples(input)?;
        Ok(TimeSeries::new(fs, data))
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_adjust_rpeaks(
    fs: f64,
    input: Option<&Path>,
    csv: Option<&Path>,
    column: &str,
    peaks: Option<&Path>,
    no_clean: bool,
    threshold_fraction: f64,
    midway_fraction: f64,
    candidate_margin: f64,
    separation_fraction: f64,
    min_separation: Option<usize>,
    maximum_rule: MaxRule,
) -> Result<()> {
    let ts = load_time_series(fs, input, csv, column)?;
    let cfg = RefineConfig {
        threshold_fraction,
        midway_fraction,
        candidate_margin,
        separation_fraction,
        min_separation,
        maximum_rule: maximum_rule.into(),
    };
    let mut modifier = RPeakModifier::new(ts, cfg)?;
    if no_clean {
        modifier = modifier.with_cleaner(Box::new(PassthroughCleaner));
    }
    let summary = match peaks {
        Some(path) => {
            let indices = text_io::read_peak_indices(path)?;
            modifier.adjust_provided(Events::from_indices(indices))?
        }
        None => modifier.adjust_peaks()?,
    };
    let js = serde_json::to_string(&summary)?;
    println!("{}", js);
    Ok(())
}

fn cmd_find_rpeaks(
    fs: f64,
    min_rr_s: f64,
    input: Option<&Path>,
    csv: Option<&Path>,
    column: &str,
    no_clean: bool,
) -> Result<()> {
    let ts = load_time_series(fs, input, csv, column)?;
    let qrs = QrsConfig {
        min_rr_s,
        ..QrsConfig::default()
    };
    let mut modifier = RPeakModifier::new(ts, RefineConfig::default())?
        .with_detector(Box::new(QrsDetector::new(qrs)));
    if no_clean {
        modifier = modifier.with_cleaner(Box::new(PassthroughCleaner));
    }
    let events = modifier.initial_peaks()?;
    let js = serde_json::to_string(events)?;
    println!("{}", js);
    Ok(())
}
