use crate::drivers::DecoderError;
use crate::types::{Marker, MarkerKind};
/// Lifecycle of a run as seen through its markers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Idle,
    /// experiment_start received.
    Armed,
    /// experiment_end received; terminal.
    Finished,
}
/// What a marker means for the decoder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MarkerEvent {
    ExperimentStarted { at: f64 },
    TrialOpened { at: f64 },
    /// A trial closed: `[start, stop)` can be classified.
    WindowReady { start: f64, stop: f64, trial: usize },
    ExperimentEnded { at: f64 },
}
/// Turns the marker stream into window boundaries and run transitions.
///
/// Out-of-order markers come back as [`DecoderError::Protocol`] and leave the
/// state untouched.
#[derive(Debug)]
pub struct MarkerInterpreter {
    phase: Phase,
    open_trial: Option<f64>,
    trial_count: usize,
}
impl Default for MarkerInterpreter {
    fn default() -> Self {
        Self::new()
    }
}
impl MarkerInterpreter {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            open_trial: None,
            trial_count: 0,
        }
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn open_trial(&self) -> Option<f64> {
        self.open_trial
    }
    pub fn trial_count(&self) -> usize {
        self.trial_count
    }
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }
    pub fn handle(&mut self, marker: Marker) -> Result<Option<MarkerEvent>, DecoderError> {
        if self.phase == Phase::Finished {
            return Err(DecoderError::Protocol(format!(
                "{} at {:.3} after experiment_end",
                marker.kind.as_str(),
                marker.timestamp
            )));
        }
        match marker.kind {
            MarkerKind::ExperimentStart => {
                if self.phase == Phase::Armed {
                    log::debug!("repeated experiment_start at {:.3} ignored", marker.timestamp);
                    return Ok(None);
                }
                self.phase = Phase::Armed;
                Ok(Some(MarkerEvent::ExperimentStarted {
                    at: marker.timestamp,
                }))
            }
            MarkerKind::TrialStart => {
                if let Some(open) = self.open_trial {
                    return Err(DecoderError::Protocol(format!(
                        "trial_start at {:.3} while trial from {:.3} is still open",
                        marker.timestamp, open
                    )));
                }
                self.open_trial = Some(marker.timestamp);
                Ok(Some(MarkerEvent::TrialOpened {
                    at: marker.timestamp,
                }))
            }
            MarkerKind::TrialEnd => {
                let Some(start) = self.open_trial else {
                    return Err(DecoderError::Protocol(format!(
                        "trial_end at {:.3} without trial_start",
                        marker.timestamp
                    )));
                };
                if marker.timestamp < start {
                    return Err(DecoderError::Protocol(format!(
                        "trial_end at {:.3} precedes trial_start at {:.3}",
                        marker.timestamp, start
                    )));
                }
                self.open_trial = None;
                self.trial_count += 1;
                Ok(Some(MarkerEvent::WindowReady {
                    start,
                    stop: marker.timestamp,
                    trial: self.trial_count - 1,
                }))
            }
            MarkerKind::ExperimentEnd => {
                self.phase = Phase::Finished;
                Ok(Some(MarkerEvent::ExperimentEnded {
                    at: marker.timestamp,
                }))
            }
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn marker(kind: MarkerKind, timestamp: f64) -> Marker {
        Marker { kind, timestamp }
    }
    #[test]
    fn full_run_walks_through_phases() {
        let mut it = MarkerInterpreter::new();
        assert_eq!(it.phase(), Phase::Idle);
        assert_eq!(
            it.handle(marker(MarkerKind::ExperimentStart, 0.0)).unwrap(),
            Some(MarkerEvent::ExperimentStarted { at: 0.0 })
        );
        assert_eq!(it.phase(), Phase::Armed);
        for trial in 0..3 {
            let t0 = trial as f64 * 3.0 + 1.0;
            it.handle(marker(MarkerKind::TrialStart, t0)).unwrap();
            assert_eq!(
                it.handle(marker(MarkerKind::TrialEnd, t0 + 2.0)).unwrap(),
                Some(MarkerEvent::WindowReady {
                    start: t0,
                    stop: t0 + 2.0,
                    trial
                })
            );
        }
        assert_eq!(it.trial_count(), 3);
        assert_eq!(
            it.handle(marker(MarkerKind::ExperimentEnd, 12.0)).unwrap(),
            Some(MarkerEvent::ExperimentEnded { at: 12.0 })
        );
        assert!(it.is_finished());
        assert!(it.handle(marker(MarkerKind::TrialStart, 13.0)).is_err());
    }
    #[test]
    fn second_trial_start_keeps_first_trial_armed() {
        let mut it = MarkerInterpreter::new();
        it.handle(marker(MarkerKind::TrialStart, 0.0)).unwrap();
        let err = it.handle(marker(MarkerKind::TrialStart, 1.0)).unwrap_err();
        assert!(matches!(err, DecoderError::Protocol(_)));
        assert_eq!(it.open_trial(), Some(0.0));
        assert_eq!(
            it.handle(marker(MarkerKind::TrialEnd, 2.0)).unwrap(),
            Some(MarkerEvent::WindowReady {
                start: 0.0,
                stop: 2.0,
                trial: 0
            })
        );
    }
    #[test]
    fn unmatched_trial_end_is_rejected_without_counting() {
        let mut it = MarkerInterpreter::new();
        assert!(it.handle(marker(MarkerKind::TrialEnd, 1.0)).is_err());
        assert_eq!(it.trial_count(), 0);
        it.handle(marker(MarkerKind::TrialStart, 2.0)).unwrap();
        assert!(it.handle(marker(MarkerKind::TrialEnd, 1.5)).is_err());
        assert_eq!(it.open_trial(), Some(2.0));
    }
    #[test]
    fn repeated_experiment_start_is_a_no_op() {
        let mut it = MarkerInterpreter::new();
        it.handle(marker(MarkerKind::ExperimentStart, 0.0)).unwrap();
        assert_eq!(it.handle(marker(MarkerKind::ExperimentStart, 5.0)).unwrap(), None);
        assert_eq!(it.phase(), Phase::Armed);
    }
    #[test]
    fn experiment_end_finishes_from_idle() {
        let mut it = MarkerInterpreter::new();
        it.handle(marker(MarkerKind::ExperimentEnd, 0.5)).unwrap();
        assert!(it.is_finished());
    }
}
