use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::types::{ClassificationResult, Prediction, RunMode, RunStats};

/// Accumulates classification results and, in open loop, scores them
/// against ground-truth labels.
pub struct ResultRecorder {
    results: Vec<ClassificationResult>,
    labels: Vec<usize>,
    writer: Option<BufWriter<File>>,
}

/// What a finished run reports.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub trials: usize,
    pub accuracy: Option<f64>,
    pub stats: RunStats,
    pub results: Vec<ClassificationResult>,
}

impl ResultRecorder {
    pub fn new(labels: Vec<usize>) -> Self {
        Self {
            results: Vec::new(),
            labels,
            writer: None,
        }
    }

    /// Starts mirroring every recorded result into a CSV file.
    pub fn start_csv(&mut self, path: &Path) -> std::io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "window_start,window_stop,samples,trial,class,confidence")?;
        self.writer = Some(w);
        log::info!("recording predictions to {}", path.display());
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut w) = self.writer.take() {
            if let Err(err) = w.flush() {
                log::warn!("failed to flush prediction log: {err}");
            }
        }
    }

    pub fn record(&mut self, result: ClassificationResult) {
        if let Some(w) = &mut self.writer {
            let trial = result.trial.map(|t| t.to_string()).unwrap_or_default();
            let written = writeln!(
                w,
                "{:.4},{:.4},{},{},{},{:.4}",
                result.window.start,
                result.window.stop,
                result.window.samples,
                trial,
                result.prediction.wire_value(),
                result.confidence
            );
            if let Err(err) = written {
                log::warn!("dropping prediction log after write error: {err}");
                self.writer = None;
            }
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[ClassificationResult] {
        &self.results
    }

    pub fn has_labels(&self) -> bool {
        !self.labels.is_empty()
    }

    pub fn label_for_trial(&self, trial: usize) -> Option<usize> {
        self.labels.get(trial).copied()
    }

    /// Fraction of the first `trials` trials whose prediction matches its label.
    pub fn accuracy(&self, trials: usize) -> Option<f64> {
        accuracy(&self.labels, &self.results, trials)
    }

    pub fn summary(&self, mode: RunMode, trials: usize, stats: RunStats) -> RunSummary {
        RunSummary {
            mode,
            trials,
            accuracy: match mode {
                RunMode::OpenLoop => self.accuracy(trials),
                RunMode::ClosedLoop => None,
            },
            stats,
            results: self.results.clone(),
        }
    }
}

impl Drop for ResultRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Matched predictions over labelled trials. Trials whose window was skipped
/// count as misses. `None` when no trial has a label.
pub fn accuracy(labels: &[usize], results: &[ClassificationResult], trials: usize) -> Option<f64> {
    let scored = trials.min(labels.len());
    if scored == 0 {
        return None;
    }
    let correct = results
        .iter()
        .filter(|r| match r.trial {
            Some(t) if t < scored => r.prediction == Prediction::Class(labels[t]),
            _ => false,
        })
        .count();
    Some(correct as f64 / scored as f64)
}
