// src/engine.rs
// Simulated amplifier and stimulus presentation used when no live streams exist.
use std::f64::consts::PI;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::{ManualDataInlet, ManualMarkerInlet, RawMarker, SampleChunk, StreamInfo};
use crate::types::{MarkerKind, RunMode};
pub const DEFAULT_MONTAGE: [&str; 10] = ["Fp1", "Fp2", "C3", "C4", "P3", "Pz", "P4", "O1", "Oz", "O2"];
#[derive(Clone, Debug)]
pub struct SimulationSettings {
    pub stream_name: String,
    pub channel_labels: Vec<String>,
    pub sample_rate_hz: f64,
    /// Samples per pulled chunk.
    pub chunk_size: usize,
    /// Peak amplitude of the uniform background noise; the stimulus response has amplitude 1.
    pub noise: f64,
    pub seed: u64,
    pub trial_length: f64,
    pub rest_length: f64,
    /// Open loop: number of trials. Closed loop: ignored.
    pub trials: usize,
    /// Open loop: attended class per trial. Empty means drawn at random.
    pub targets: Vec<usize>,
    /// Closed loop: session length in seconds.
    pub duration: f64,
    /// Closed loop: how long the subject keeps attending one stimulus.
    pub segment_length: f64,
    /// Idle polls appended before experiment_end so the decoder can catch up.
    pub drain_polls: usize,
}
impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            stream_name: "Micromed".into(),
            channel_labels: DEFAULT_MONTAGE.iter().map(|s| s.to_string()).collect(),
            sample_rate_hz: 256.0,
            chunk_size: 32,
            noise: 1.0,
            seed: 7,
            trial_length: 2.0,
            rest_length: 1.0,
            trials: 12,
            targets: Vec::new(),
            duration: 30.0,
            segment_length: 5.0,
            drain_polls: 50,
        }
    }
}
/// Inlets ready to hand to the decoder plus the ground truth behind them.
pub struct SimulatedSession {
    pub data: ManualDataInlet,
    pub markers: ManualMarkerInlet,
    /// Attended class per trial (open loop) or per segment (closed loop).
    pub targets: Vec<usize>,
}
/// Attended stimulus over time: `(start, stop, class)`.
type Schedule = Vec<(f64, f64, usize)>;
struct SsvepGenerator {
    rng: StdRng,
    noise: f64,
    gains: Vec<f64>,
    phases: Vec<f64>,
}
impl SsvepGenerator {
    fn new(labels: &[String], classes: usize, noise: f64, mut rng: StdRng) -> Self {
        // occipital sites carry the response, parietal weakly, the rest barely
        let gains = labels
            .iter()
            .map(|label| match label.chars().next() {
                Some('O') => 1.0,
                Some('P') => 0.5,
                _ => 0.05,
            })
            .collect();
        let phases = (0..classes).map(|_| rng.gen_range(0.0..2.0 * PI)).collect();
        Self {
            rng,
            noise,
            gains,
            phases,
        }
    }
    fn sample(&mut self, t: f64, attended: Option<(usize, f64)>) -> Vec<f64> {
        let response = attended
            .map(|(class, freq)| {
                let phase = self.phases[class];
                (2.0 * PI * freq * t + phase).sin() + 0.4 * (4.0 * PI * freq * t + phase).sin()
            })
            .unwrap_or(0.0);
        let noise = self.noise;
        let mut out = Vec::with_capacity(self.gains.len());
        for &gain in &self.gains {
            let jitter = if noise > 0.0 {
                self.rng.gen_range(-noise..noise)
            } else {
                0.0
            };
            out.push(gain * response + jitter);
        }
        out
    }
}
/// Builds a labelled open-loop session: rest, then `trials` trials each
/// followed by rest. With `targets` set, they fix both the trial count and
/// the attended classes.
pub fn open_loop_session(frequencies: &[f64], settings: &SimulationSettings) -> SimulatedSession {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut schedule = Schedule::new();
    let mut markers = vec![RawMarker::new(MarkerKind::ExperimentStart.as_str(), 0.0)];
    let mut t = settings.rest_length;
    let trials = if settings.targets.is_empty() {
        settings.trials
    } else {
        settings.targets.len()
    };
    for trial in 0..trials {
        let class = match settings.targets.get(trial) {
            Some(&class) => class,
            None => rng.gen_range(0..frequencies.len().max(1)),
        };
        let stop = t + settings.trial_length;
        schedule.push((t, stop, class));
        markers.push(RawMarker::new(MarkerKind::TrialStart.as_str(), t));
        markers.push(RawMarker::new(MarkerKind::TrialEnd.as_str(), stop));
        t = stop + settings.rest_length;
    }
    markers.push(RawMarker::new(MarkerKind::ExperimentEnd.as_str(), t));
    assemble(frequencies, settings, rng, schedule, markers, t)
}
/// Builds a closed-loop session where the attended stimulus changes every
/// `segment_length` seconds.
pub fn closed_loop_session(frequencies: &[f64], settings: &SimulationSettings) -> SimulatedSession {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut schedule = Schedule::new();
    let segment = settings.segment_length.max(settings.trial_length);
    let mut t = 0.0;
    while t < settings.duration {
        let stop = (t + segment).min(settings.duration);
        schedule.push((t, stop, rng.gen_range(0..frequencies.len().max(1))));
        t = stop;
    }
    let markers = vec![
        RawMarker::new(MarkerKind::ExperimentStart.as_str(), 0.0),
        RawMarker::new(MarkerKind::ExperimentEnd.as_str(), settings.duration),
    ];
    assemble(frequencies, settings, rng, schedule, markers, settings.duration)
}
pub fn session(mode: RunMode, frequencies: &[f64], settings: &SimulationSettings) -> SimulatedSession {
    match mode {
        RunMode::OpenLoop => open_loop_session(frequencies, settings),
        RunMode::ClosedLoop => closed_loop_session(frequencies, settings),
    }
}
fn assemble(
    frequencies: &[f64],
    settings: &SimulationSettings,
    rng: StdRng,
    schedule: Schedule,
    markers: Vec<RawMarker>,
    end: f64,
) -> SimulatedSession {
    let mut generator = SsvepGenerator::new(&settings.channel_labels, frequencies.len(), settings.noise, rng);
    let sr = settings.sample_rate_hz;
    let total = (end * sr).round() as usize + 1;
    let mut chunks = Vec::new();
    let chunk_size = settings.chunk_size.max(1);
    let mut n = 0;
    while n < total {
        let upto = (n + chunk_size).min(total);
        let timestamps: Vec<f64> = (n..upto).map(|i| i as f64 / sr).collect();
        let samples = timestamps
            .iter()
            .map(|&t| {
                let attended = schedule
                    .iter()
                    .find(|(start, stop, _)| t >= *start && t < *stop)
                    .map(|&(_, _, class)| (class, frequencies[class]));
                generator.sample(t, attended)
            })
            .collect();
        chunks.push(SampleChunk::new(timestamps, samples));
        n = upto;
    }
    let script = script_markers(&chunks, markers, settings.drain_polls);
    let info = StreamInfo {
        name: settings.stream_name.clone(),
        sample_rate_hz: sr,
        channel_labels: settings.channel_labels.clone(),
    };
    SimulatedSession {
        data: ManualDataInlet::new(info, chunks),
        markers: ManualMarkerInlet::new(script),
        targets: schedule.into_iter().map(|(_, _, class)| class).collect(),
    }
}
/// Lines markers up with the chunk sequence the way a live marker stream
/// would: a marker is never seen before the data covering its timestamp, and
/// at most one marker arrives per poll. Markers left once the data runs out
/// follow `idle_polls` empty polls.
pub fn script_markers(
    chunks: &[SampleChunk],
    markers: Vec<RawMarker>,
    idle_polls: usize,
) -> Vec<Option<RawMarker>> {
    let mut pending = markers.into_iter().peekable();
    let mut script = Vec::with_capacity(chunks.len() + idle_polls);
    let mut newest = f64::NEG_INFINITY;
    for chunk in chunks {
        if let Some(&last) = chunk.timestamps.last() {
            newest = last;
        }
        let due = pending.peek().is_some_and(|m| m.timestamp <= newest);
        script.push(if due { pending.next() } else { None });
    }
    script.extend(std::iter::repeat(None).take(idle_polls));
    script.extend(pending.map(Some));
    script
}
