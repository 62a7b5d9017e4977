// src/config.rs
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::classifier::{Rejection, DEFAULT_HARMONICS};
use crate::types::RunMode;

/// Accepted log levels; anything else in the config is a parse error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// One stimulus: its direction name and flicker frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct StimulusClass {
    pub name: String,
    pub frequency_hz: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StreamNames {
    pub eeg: String,
    pub markers: String,
    pub commands: String,
}

impl Default for StreamNames {
    fn default() -> Self {
        Self {
            eeg: "Micromed".into(),
            markers: "UiOutput".into(),
            commands: "UiInput".into(),
        }
    }
}

/// Validated decoder settings.
#[derive(Clone, Debug, PartialEq)]
pub struct DecoderConfig {
    pub mode: RunMode,
    pub window_size: f64,
    pub step_size: f64,
    /// Class id is the position in this list.
    pub classes: Vec<StimulusClass>,
    pub channels: Vec<String>,
    pub max_sample_length: usize,
    pub harmonics: usize,
    pub rejection: Rejection,
    pub bandpass: bool,
    pub label_file: Option<PathBuf>,
    pub streams: StreamNames,
    pub log_level: LogLevel,
}

// --- YAML 文件结构 ---
#[derive(Deserialize)]
struct RawConfig {
    experiment: RawExperiment,
    classifier: RawClassifier,
    #[serde(default)]
    streams: Option<RawStreams>,
    #[serde(default)]
    logging: Option<RawLogging>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExperiment {
    closed_loop: bool,
    window_size: Option<f64>,
    step_size: Option<f64>,
    stimulus_frequencies: serde_yaml::Mapping,
    channels: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassifier {
    max_sample_length: usize,
    harmonics: Option<usize>,
    reject_threshold: Option<f64>,
    reject_margin: Option<f64>,
    #[serde(default)]
    bandpass: bool,
    label_file: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RawStreams {
    decoder: RawDecoderStreams,
}

#[derive(Deserialize)]
struct RawDecoderStreams {
    inlet_names: RawInletNames,
    outlet_names: Vec<String>,
}

#[derive(Deserialize)]
struct RawInletNames {
    eeg: String,
    markers: String,
}

#[derive(Deserialize)]
struct RawLogging {
    level: LogLevel,
}

impl DecoderConfig {
    pub const DEFAULT_WINDOW_SIZE: f64 = 1.0;
    pub const DEFAULT_STEP_SIZE: f64 = 0.1;

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(text).context("malformed YAML")?;
        let classes = raw
            .experiment
            .stimulus_frequencies
            .iter()
            .map(|(key, value)| {
                let name = key
                    .as_str()
                    .map(str::to_owned)
                    .or_else(|| key.as_i64().map(|k| k.to_string()))
                    .ok_or_else(|| anyhow!("stimulusFrequencies key {key:?} is not a name"))?;
                let frequency_hz = value
                    .as_f64()
                    .ok_or_else(|| anyhow!("stimulusFrequencies.{name} is not a number"))?;
                Ok(StimulusClass { name, frequency_hz })
            })
            .collect::<Result<Vec<_>>>()?;
        let rejection = match (raw.classifier.reject_threshold, raw.classifier.reject_margin) {
            (Some(_), Some(_)) => bail!("rejectThreshold and rejectMargin are mutually exclusive"),
            (_, Some(margin)) => Rejection::Margin(margin),
            (threshold, None) => Rejection::Threshold(threshold.unwrap_or(0.0)),
        };
        let streams = match raw.streams {
            Some(s) => StreamNames {
                eeg: s.decoder.inlet_names.eeg,
                markers: s.decoder.inlet_names.markers,
                commands: s
                    .decoder
                    .outlet_names
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("streams.decoder.outlet_names is empty"))?,
            },
            None => StreamNames::default(),
        };
        let config = Self {
            mode: if raw.experiment.closed_loop {
                RunMode::ClosedLoop
            } else {
                RunMode::OpenLoop
            },
            window_size: raw.experiment.window_size.unwrap_or(Self::DEFAULT_WINDOW_SIZE),
            step_size: raw.experiment.step_size.unwrap_or(Self::DEFAULT_STEP_SIZE),
            classes,
            channels: raw.experiment.channels,
            max_sample_length: raw.classifier.max_sample_length,
            harmonics: raw.classifier.harmonics.unwrap_or(DEFAULT_HARMONICS),
            rejection,
            bandpass: raw.classifier.bandpass,
            label_file: raw.classifier.label_file,
            streams,
            log_level: raw.logging.map(|l| l.level).unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            bail!("experiment.stimulusFrequencies must list at least one class");
        }
        if let Some(bad) = self
            .classes
            .iter()
            .find(|c| !(c.frequency_hz > 0.0) || !c.frequency_hz.is_finite())
        {
            bail!("stimulus `{}` has invalid frequency {} Hz", bad.name, bad.frequency_hz);
        }
        if self.channels.is_empty() {
            bail!("experiment.channels must name at least one channel");
        }
        if !(self.window_size > 0.0) {
            bail!("experiment.windowSize must be positive, got {}", self.window_size);
        }
        if !(self.step_size > 0.0) || self.step_size > self.window_size {
            bail!(
                "experiment.stepSize must be in (0, windowSize], got {}",
                self.step_size
            );
        }
        if self.max_sample_length == 0 {
            bail!("classifier.maxSampleLength must be positive");
        }
        if self.harmonics == 0 {
            bail!("classifier.harmonics must be at least 1");
        }
        Ok(())
    }

    pub fn frequencies(&self) -> Vec<f64> {
        self.classes.iter().map(|c| c.frequency_hz).collect()
    }

    /// Ground-truth labels, if a label file is configured. A configured file
    /// that cannot be read is an error.
    pub fn load_labels(&self) -> Result<Option<Vec<usize>>> {
        match &self.label_file {
            Some(path) => {
                let labels = read_label_file(path)?;
                if let Some(bad) = labels.iter().find(|&&l| l >= self.classes.len()) {
                    bail!(
                        "label {bad} in {} has no matching stimulus class",
                        path.display()
                    );
                }
                Ok(Some(labels))
            }
            None => Ok(None),
        }
    }
}

/// One class id per trial, written as consecutive digits; whitespace is ignored.
pub fn parse_labels(text: &str) -> Result<Vec<usize>> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            c.to_digit(10)
                .map(|d| d as usize)
                .ok_or_else(|| anyhow!("label `{c}` is not a digit"))
        })
        .collect()
}

pub fn read_label_file(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read label file {}", path.display()))?;
    parse_labels(&text).with_context(|| format!("invalid label file {}", path.display()))
}

/// Sets up env_logger at `level`; `RUST_LOG` still overrides it.
pub fn init_logging(level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(level.into())
        .parse_default_env()
        .init();
}
