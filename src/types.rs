// src/types.rs
use serde::Serialize;

/// Marker tokens sent by the stimulus presentation layer.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    ExperimentStart,
    ExperimentEnd,
    TrialStart,
    TrialEnd,
}

impl MarkerKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "experiment_start" => Some(MarkerKind::ExperimentStart),
            "experiment_end" => Some(MarkerKind::ExperimentEnd),
            "trial_start" => Some(MarkerKind::TrialStart),
            "trial_end" => Some(MarkerKind::TrialEnd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::ExperimentStart => "experiment_start",
            MarkerKind::ExperimentEnd => "experiment_end",
            MarkerKind::TrialStart => "trial_start",
            MarkerKind::TrialEnd => "trial_end",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub timestamp: f64,
}

// 实验模式
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One window per trial, bounded by trial_start / trial_end.
    OpenLoop,
    /// Sliding window from experiment_start until experiment_end.
    ClosedLoop,
}

/// Class decision for a single window.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Class(usize),
    /// Best score did not pass the rejection policy.
    Rejected,
}

impl Prediction {
    /// Value pushed on the command outlet for a rejected window.
    pub const NONE_WIRE: i32 = -1;

    pub fn wire_value(&self) -> i32 {
        match self {
            Prediction::Class(id) => *id as i32,
            Prediction::Rejected => Self::NONE_WIRE,
        }
    }

    pub fn class_id(&self) -> Option<usize> {
        match self {
            Prediction::Class(id) => Some(*id),
            Prediction::Rejected => None,
        }
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prediction::Class(id) => write!(f, "{id}"),
            Prediction::Rejected => write!(f, "none"),
        }
    }
}

/// Requested time bounds of a window and the number of samples it resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WindowSpan {
    pub start: f64,
    pub stop: f64,
    pub samples: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub prediction: Prediction,
    /// Highest canonical correlation across classes.
    pub confidence: f64,
    /// Zero-based trial index, open-loop only.
    pub trial: Option<usize>,
    pub window: WindowSpan,
}

/// Counters the decoder keeps about its own run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub polls: u64,
    pub samples_received: u64,
    pub windows_classified: u64,
    pub windows_rejected: u64,
    pub windows_skipped: u64,
    pub protocol_violations: u64,
    pub transport_errors: u64,
    /// Closed-loop windows that were already due when the previous one finished.
    pub backlog: u64,
}
