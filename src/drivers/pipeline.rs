use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use log::{debug, error, info, warn};
use crate::brain_utils::{nearest_index, select_channels};
use crate::classifier::{Classifier, ReferenceSignalBank};
use crate::config::DecoderConfig;
use crate::drivers::error::DecoderError;
use crate::drivers::fft::SpectralBandpass;
use crate::drivers::markers::{MarkerEvent, MarkerInterpreter};
use crate::drivers::source::{CommandOutlet, DataInlet, MarkerInlet, StreamDirectory};
use crate::drivers::StreamBuffer;
use crate::recorder::{ResultRecorder, RunSummary};
use crate::types::{ClassificationResult, Marker, MarkerKind, RunMode, RunStats, WindowSpan};
/// Inlets are read without waiting.
pub const POLL_TIMEOUT: Duration = Duration::ZERO;
/// Slack when comparing accumulated window cursors with sample timestamps.
const TIMESTAMP_TOLERANCE: f64 = 1e-9;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Running,
    Finished,
}
/// A window whose bounds are known and that can be cut from the buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingWindow {
    start: f64,
    stop: f64,
    /// Closed loop: entries before this timestamp go once the window is done.
    prune_at: Option<f64>,
    trial: Option<usize>,
}
/// Cursors and counters of one run, mutated only by the decoder.
#[derive(Debug, Default)]
struct RunState {
    /// experiment_start timestamp.
    origin: Option<f64>,
    /// Closed-loop windows completed since `origin`.
    steps_taken: u64,
    pending_trial: Option<PendingWindow>,
    running: bool,
    stats: RunStats,
}
/// Polls the inlets, keeps the sample buffer and classifies windows as the
/// markers and the run mode dictate.
pub struct Decoder<D: DataInlet, M: MarkerInlet, O: CommandOutlet> {
    data: D,
    markers: M,
    outlet: O,
    mode: RunMode,
    window_size: f64,
    step_size: f64,
    class_names: Vec<String>,
    channels: Vec<usize>,
    buffer: StreamBuffer,
    interpreter: MarkerInterpreter,
    classifier: Classifier,
    recorder: ResultRecorder,
    state: RunState,
    stop: Arc<AtomicBool>,
}
impl<D: DataInlet, M: MarkerInlet, O: CommandOutlet> Decoder<D, M, O> {
    pub fn new(
        config: &DecoderConfig,
        data: D,
        markers: M,
        outlet: O,
        labels: Vec<usize>,
    ) -> Result<Self, DecoderError> {
        if !(config.window_size > 0.0) {
            return Err(DecoderError::InvalidParameter {
                name: "windowSize",
                reason: format!("{} s is not positive", config.window_size),
            });
        }
        if !(config.step_size > 0.0) || config.step_size > config.window_size {
            return Err(DecoderError::InvalidParameter {
                name: "stepSize",
                reason: format!(
                    "{} s is outside (0, {}]",
                    config.step_size, config.window_size
                ),
            });
        }
        let info = data.info().clone();
        if !(info.sample_rate_hz > 0.0) {
            return Err(DecoderError::InvalidSampleRate);
        }
        let channels = select_channels(&info.channel_labels, &config.channels);
        if channels.is_empty() {
            return Err(DecoderError::NoChannelsSelected(config.channels.clone()));
        }
        let picked: Vec<&str> = channels
            .iter()
            .map(|&c| info.channel_labels[c].as_str())
            .collect();
        info!("{} -> added to channels", picked.join(" "));
        let frequencies = config.frequencies();
        let bank = ReferenceSignalBank::generate(
            &frequencies,
            config.max_sample_length,
            info.sample_rate_hz,
            config.harmonics,
        )?;
        debug!("reference bank (classes, samples, columns) = {:?}", bank.shape());
        let mut classifier = Classifier::new(bank, config.rejection.policy());
        if config.bandpass {
            let bandpass =
                SpectralBandpass::for_frequencies(&frequencies, config.harmonics, info.sample_rate_hz);
            debug!(
                "band-pass {:.1}-{:.1} Hz before classification",
                bandpass.low_hz, bandpass.high_hz
            );
            classifier = classifier.with_preprocessor(Box::new(bandpass));
        }
        Ok(Self {
            data,
            markers,
            outlet,
            mode: config.mode,
            window_size: config.window_size,
            step_size: config.step_size,
            class_names: config.classes.iter().map(|c| c.name.clone()).collect(),
            channels,
            buffer: StreamBuffer::new(info.channel_count()),
            interpreter: MarkerInterpreter::new(),
            classifier,
            recorder: ResultRecorder::new(labels),
            state: RunState {
                running: true,
                ..RunState::default()
            },
            stop: Arc::new(AtomicBool::new(false)),
        })
    }
    pub fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }
    pub fn outlet(&self) -> &O {
        &self.outlet
    }
    pub fn recorder(&self) -> &ResultRecorder {
        &self.recorder
    }
    pub fn recorder_mut(&mut self) -> &mut ResultRecorder {
        &mut self.recorder
    }
    pub fn stats(&self) -> RunStats {
        self.state.stats
    }
    pub fn trial_count(&self) -> usize {
        self.interpreter.trial_count()
    }
    pub fn is_running(&self) -> bool {
        self.state.running
    }
    /// Start of the next closed-loop window, once experiment_start was seen.
    pub fn classification_start(&self) -> Option<f64> {
        self.state
            .origin
            .map(|origin| origin + self.state.steps_taken as f64 * self.step_size)
    }
    /// Flag that ends the loop at the next poll cycle when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
    /// Runs poll cycles until experiment_end or a stop request.
    pub fn run(&mut self) -> RunSummary {
        info!(
            "decoder running: {:?}, window {:.2} s, step {:.2} s, {} classes",
            self.mode,
            self.window_size,
            self.step_size,
            self.class_names.len()
        );
        while self.step() == Step::Running {}
        self.summary()
    }
    pub fn summary(&self) -> RunSummary {
        self.recorder
            .summary(self.mode, self.interpreter.trial_count(), self.state.stats)
    }
    /// One poll cycle: data, one marker, at most one window.
    pub fn step(&mut self) -> Step {
        if !self.is_running() {
            return Step::Finished;
        }
        self.state.stats.polls += 1;
        self.poll_data();
        self.poll_markers();
        if !self.state.running {
            return Step::Finished;
        }
        if self.mode == RunMode::ClosedLoop && self.state.origin.is_none() {
            self.trim_idle_history();
        }
        if let Some(window) = self.next_window() {
            self.process_window(window);
            if self.mode == RunMode::ClosedLoop && self.closed_loop_window().is_some() {
                self.state.stats.backlog += 1;
                debug!(
                    "classification running behind the stream, backlog {}",
                    self.state.stats.backlog
                );
            }
        }
        if self.stop.load(Ordering::Relaxed) {
            info!("stop requested");
            self.shutdown();
            return Step::Finished;
        }
        Step::Running
    }
    fn poll_data(&mut self) {
        match self.data.pull_chunk(POLL_TIMEOUT) {
            Ok(chunk) if chunk.is_empty() => {}
            Ok(chunk) => {
                let before = self.buffer.len();
                if let Err(err) = self.buffer.extend(chunk) {
                    self.state.stats.transport_errors += 1;
                    warn!("dropped rest of data chunk: {err}");
                }
                self.state.stats.samples_received += (self.buffer.len() - before) as u64;
            }
            Err(err) => {
                self.state.stats.transport_errors += 1;
                warn!("data inlet read failed: {err}");
            }
        }
    }
    fn poll_markers(&mut self) {
        let raw = match self.markers.pull_sample(POLL_TIMEOUT) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                self.state.stats.transport_errors += 1;
                warn!("marker inlet read failed: {err}");
                return;
            }
        };
        let Some(kind) = MarkerKind::parse(&raw.token) else {
            self.state.stats.protocol_violations += 1;
            warn!("unknown marker `{}` at {:.3} ignored", raw.token, raw.timestamp);
            return;
        };
        let marker = Marker {
            kind,
            timestamp: raw.timestamp,
        };
        match self.interpreter.handle(marker) {
            Ok(Some(event)) => self.on_marker_event(event),
            Ok(None) => {}
            Err(err) => {
                self.state.stats.protocol_violations += 1;
                warn!("{err}; marker ignored");
            }
        }
    }
    fn on_marker_event(&mut self, event: MarkerEvent) {
        match event {
            MarkerEvent::ExperimentStarted { at } => {
                info!("experiment started at {at:.3}");
                self.state.origin = Some(at);
                self.state.steps_taken = 0;
            }
            MarkerEvent::TrialOpened { at } => debug!("trial opened at {at:.3}"),
            MarkerEvent::WindowReady { start, stop, trial } => match self.mode {
                RunMode::OpenLoop => {
                    self.state.pending_trial = Some(PendingWindow {
                        start,
                        stop,
                        prune_at: None,
                        trial: Some(trial),
                    });
                }
                RunMode::ClosedLoop => {
                    debug!("trial {trial} [{start:.3}, {stop:.3}) closed; sliding window unaffected")
                }
            },
            MarkerEvent::ExperimentEnded { at } => {
                info!("Experiment finished at {at:.3}.");
                self.shutdown();
            }
        }
    }
    /// Closed loop without a cursor yet: keep one window of history only.
    fn trim_idle_history(&mut self) {
        let Some(newest) = self.buffer.newest_timestamp() else {
            return;
        };
        if let Some(keep_from) = nearest_index(self.buffer.timestamps(), newest - self.window_size) {
            self.buffer.truncate_before(keep_from);
        }
    }
    fn next_window(&mut self) -> Option<PendingWindow> {
        match self.mode {
            RunMode::OpenLoop => self.state.pending_trial.take(),
            RunMode::ClosedLoop => self.closed_loop_window(),
        }
    }
    fn closed_loop_window(&self) -> Option<PendingWindow> {
        let start = self.classification_start()?;
        let newest = self.buffer.newest_timestamp()?;
        let stop = start + self.window_size;
        if newest + TIMESTAMP_TOLERANCE < stop {
            return None;
        }
        Some(PendingWindow {
            start,
            stop,
            prune_at: Some(start + self.step_size),
            trial: None,
        })
    }
    fn process_window(&mut self, window: PendingWindow) {
        let timestamps = self.buffer.timestamps();
        let bounds = nearest_index(timestamps, window.start).zip(nearest_index(timestamps, window.stop));
        match bounds {
            Some((start_idx, stop_idx)) => self.classify_slice(&window, start_idx, stop_idx),
            None => {
                self.state.stats.windows_skipped += 1;
                warn!(
                    "window [{:.3}, {:.3}) has no buffered samples, skipped",
                    window.start, window.stop
                );
            }
        }
        self.advance(&window);
    }
    fn classify_slice(&mut self, window: &PendingWindow, start_idx: usize, stop_idx: usize) {
        let span = WindowSpan {
            start: window.start,
            stop: window.stop,
            samples: stop_idx - start_idx,
        };
        let slice = self.buffer.slice(start_idx, stop_idx, &self.channels);
        let output = match self.classifier.classify(slice.view()) {
            Ok(output) => output,
            Err(err) => {
                self.state.stats.windows_skipped += 1;
                if err.is_recoverable() {
                    warn!("window [{:.3}, {:.3}) skipped: {err}", window.start, window.stop);
                } else {
                    error!("window [{:.3}, {:.3}) failed: {err}", window.start, window.stop);
                }
                return;
            }
        };
        let result = ClassificationResult {
            prediction: output.prediction,
            confidence: output.confidence,
            trial: window.trial,
            window: span,
        };
        self.state.stats.windows_classified += 1;
        if result.prediction.class_id().is_none() {
            self.state.stats.windows_rejected += 1;
        }
        match window.trial {
            Some(trial) => {
                let truth = self
                    .recorder
                    .label_for_trial(trial)
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "-".into());
                info!("T|P - {}|{}", truth, result.prediction);
            }
            None => debug!(
                "[{:.2}, {:.2}) -> {} ({}, r = {:.3})",
                span.start,
                span.stop,
                result.prediction,
                result
                    .prediction
                    .class_id()
                    .and_then(|c| self.class_names.get(c))
                    .map(String::as_str)
                    .unwrap_or("none"),
                result.confidence
            ),
        }
        if let Err(err) = self.outlet.push_sample(result.prediction.wire_value()) {
            self.state.stats.transport_errors += 1;
            warn!("command outlet push failed: {err}");
        }
        self.recorder.record(result);
    }
    /// Post-window bookkeeping: open loop starts the next trial from an empty
    /// buffer, closed loop moves the cursor one step and keeps the overlap.
    fn advance(&mut self, window: &PendingWindow) {
        match window.prune_at {
            None => self.buffer.clear(),
            Some(prune_at) => {
                self.state.steps_taken += 1;
                if let Some(keep_from) = nearest_index(self.buffer.timestamps(), prune_at) {
                    self.buffer.truncate_before(keep_from);
                }
            }
        }
    }
    fn shutdown(&mut self) {
        self.state.running = false;
        if !self.interpreter.is_finished() {
            info!("stopped before experiment_end");
        }
        let trials = self.interpreter.trial_count();
        let stats = self.state.stats;
        info!(
            "decoder stopped: {} windows classified, {} skipped, {} protocol violations, backlog {}",
            stats.windows_classified, stats.windows_skipped, stats.protocol_violations, stats.backlog
        );
        if self.mode == RunMode::OpenLoop && self.recorder.has_labels() {
            match self.recorder.accuracy(trials) {
                Some(acc) => info!("Accuracy: {acc:.2}"),
                None => info!("no labelled trial finished, accuracy not scored"),
            }
        }
        self.recorder.stop();
    }
}
/// Polls `directory` until every name in `names` is visible, reporting the
/// missing ones after each round. `max_rounds` of `None` waits forever.
pub fn connect_streams<S: StreamDirectory>(
    directory: &mut S,
    names: &[String],
    wait: Duration,
    max_rounds: Option<usize>,
) -> Result<Vec<String>, DecoderError> {
    info!("Searching for stream inlets...");
    let mut connected: Vec<String> = Vec::new();
    let mut rounds = 0usize;
    loop {
        for name in directory.resolve(wait) {
            if names.contains(&name) && !connected.contains(&name) {
                connected.push(name);
            }
        }
        let missing: Vec<&String> = names.iter().filter(|n| !connected.contains(n)).collect();
        if missing.is_empty() {
            info!("decoder connected to streams {connected:?}");
            return Ok(connected);
        }
        rounds += 1;
        warn!("waiting for stream(s): {missing:?}");
        if max_rounds.is_some_and(|max| rounds >= max) {
            return Err(DecoderError::Transport(format!(
                "stream(s) {missing:?} not found after {rounds} rounds"
            )));
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use crate::classifier::Rejection;
    use crate::config::{LogLevel, StimulusClass, StreamNames};
    use crate::drivers::source::{
        CommandLog, ManualDataInlet, ManualMarkerInlet, RawMarker, SampleChunk, StaticDirectory,
        StreamInfo,
    };
    use crate::engine::script_markers;
    use crate::types::Prediction;
    const SR: f64 = 256.0;
    fn config(mode: RunMode) -> DecoderConfig {
        DecoderConfig {
            mode,
            window_size: 1.0,
            step_size: 0.1,
            classes: [("up", 7.0), ("right", 11.0), ("down", 13.0)]
                .iter()
                .map(|(name, f)| StimulusClass {
                    name: name.to_string(),
                    frequency_hz: *f,
                })
                .collect(),
            channels: vec!["O1".into()],
            max_sample_length: 1024,
            harmonics: 3,
            rejection: Rejection::default(),
            bandpass: false,
            label_file: None,
            streams: StreamNames::default(),
            log_level: LogLevel::Info,
        }
    }
    fn info() -> StreamInfo {
        StreamInfo {
            name: "Micromed".into(),
            sample_rate_hz: SR,
            channel_labels: vec!["Fz".into(), "O1".into()],
        }
    }
    /// Samples `0..=last` at `SR`, O1 carrying `signal(t)`, cut into chunks.
    fn chunks(last: usize, chunk: usize, signal: impl Fn(f64) -> f64) -> Vec<SampleChunk> {
        let all: Vec<usize> = (0..=last).collect();
        all.chunks(chunk)
            .map(|ns| {
                let timestamps: Vec<f64> = ns.iter().map(|&n| n as f64 / SR).collect();
                let samples = timestamps
                    .iter()
                    .map(|&t| vec![(2.0 * PI * 3.0 * t).cos(), signal(t)])
                    .collect();
                SampleChunk::new(timestamps, samples)
            })
            .collect()
    }
    fn sine(freq: f64) -> impl Fn(f64) -> f64 {
        move |t| (2.0 * PI * freq * t).sin()
    }
    fn marker(token: &str, t: f64) -> RawMarker {
        RawMarker::new(token, t)
    }
    fn decoder(
        mode: RunMode,
        chunks: Vec<SampleChunk>,
        script: Vec<Option<RawMarker>>,
        labels: Vec<usize>,
    ) -> Decoder<ManualDataInlet, ManualMarkerInlet, CommandLog> {
        Decoder::new(
            &config(mode),
            ManualDataInlet::new(info(), chunks),
            ManualMarkerInlet::new(script),
            CommandLog::default(),
            labels,
        )
        .unwrap()
    }
    #[test]
    fn closed_loop_slides_91_windows_over_ten_seconds() {
        let data = chunks(2560, 16, sine(11.0));
        let mut script = vec![Some(marker("experiment_start", 0.0))];
        script.extend(std::iter::repeat(None).take(179));
        script.push(Some(marker("experiment_end", 10.5)));
        let mut dec = decoder(RunMode::ClosedLoop, data, script, Vec::new());
        let summary = dec.run();
        assert_eq!(summary.results.len(), 91);
        assert_eq!(summary.stats.windows_skipped, 0);
        assert_eq!(summary.accuracy, None);
        for (k, result) in summary.results.iter().enumerate() {
            let span = result.window;
            assert!((span.start - k as f64 * 0.1).abs() < 1e-9);
            assert!((span.stop - span.start - 1.0).abs() < 1e-9);
            assert!((255..=257).contains(&span.samples), "window {k}: {}", span.samples);
            assert_eq!(result.prediction, Prediction::Class(1));
            assert_eq!(result.trial, None);
        }
        for pair in summary.results.windows(2) {
            let overlap = pair[0].window.stop - pair[1].window.start;
            assert!((overlap - 0.9).abs() < 1e-9);
        }
        assert!((summary.results[90].window.start - 9.0).abs() < 1e-9);
        assert_eq!(dec.outlet().sent(), vec![1; 91].as_slice());
        assert!(!dec.is_running());
    }
    #[test]
    fn closed_loop_pruning_keeps_the_overlap() {
        let data = chunks(512, 512, sine(7.0));
        let script = vec![Some(marker("experiment_start", 0.0))];
        let mut dec = decoder(RunMode::ClosedLoop, data, script, Vec::new());
        assert_eq!(dec.step(), Step::Running);
        assert_eq!(dec.recorder().results().len(), 1);
        assert_eq!(dec.classification_start(), Some(0.1));
        // everything before 0.1 s is gone, the next window's data is intact
        let first = dec.buffer().timestamps()[0];
        assert!((first - 0.1).abs() <= 0.5 / SR);
        assert_eq!(dec.stats().backlog, 1);
    }
    #[test]
    fn slow_classification_shows_up_as_backlog() {
        let data = chunks(768, 1024, sine(13.0));
        let mut script = vec![Some(marker("experiment_start", 0.0))];
        script.extend(std::iter::repeat(None).take(30));
        script.push(Some(marker("experiment_end", 3.0)));
        let mut dec = decoder(RunMode::ClosedLoop, data, script, Vec::new());
        let summary = dec.run();
        assert_eq!(summary.results.len(), 21);
        assert_eq!(summary.stats.backlog, 20);
        assert!(summary
            .results
            .iter()
            .all(|r| r.prediction == Prediction::Class(2)));
    }
    #[test]
    fn closed_loop_waits_for_experiment_start() {
        let data = chunks(512, 64, sine(7.0));
        let mut dec = decoder(RunMode::ClosedLoop, data, Vec::new(), Vec::new());
        for _ in 0..20 {
            dec.step();
        }
        assert_eq!(dec.classification_start(), None);
        assert!(dec.recorder().results().is_empty());
        // only the last window_size of history survives
        assert_eq!(dec.buffer().len(), 257);
        assert_eq!(dec.buffer().timestamps()[0], 1.0);
        assert_eq!(dec.stats().samples_received, 513);
    }
    #[test]
    fn open_loop_window_is_trial_bounded_and_buffer_cleared() {
        let data = chunks(640, 32, sine(11.0));
        let mut script = vec![Some(marker("trial_start", 0.0))];
        script.extend(std::iter::repeat(None).take(19));
        script.push(Some(marker("trial_end", 2.0)));
        let mut dec = decoder(RunMode::OpenLoop, data, script, Vec::new());
        for _ in 0..20 {
            assert_eq!(dec.step(), Step::Running);
            assert!(dec.recorder().results().is_empty());
        }
        dec.step();
        let results = dec.recorder().results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].window.start, 0.0);
        assert_eq!(results[0].window.stop, 2.0);
        assert_eq!(results[0].window.samples, 512);
        assert_eq!(results[0].trial, Some(0));
        assert_eq!(results[0].prediction, Prediction::Class(1));
        assert!(dec.buffer().is_empty());
        assert_eq!(dec.trial_count(), 1);
        assert_eq!(dec.outlet().sent(), &[1]);
    }
    #[test]
    fn open_loop_session_is_scored_against_labels() {
        let trials = [(0.5, 7.0), (3.5, 11.0), (6.5, 11.0)];
        let signal = move |t: f64| {
            trials
                .iter()
                .find(|(start, _)| t >= *start && t < start + 2.0)
                .map(|(_, f)| (2.0 * PI * f * t).sin())
                .unwrap_or(0.0)
        };
        let data = chunks(2304, 32, signal);
        let mut markers = vec![marker("experiment_start", 0.0)];
        for (start, _) in trials {
            markers.push(marker("trial_start", start));
            markers.push(marker("trial_end", start + 2.0));
        }
        markers.push(marker("experiment_end", 9.0));
        let script = script_markers(&data, markers, 0);
        let mut dec = decoder(RunMode::OpenLoop, data, script, vec![0, 1, 2]);
        let summary = dec.run();
        let predicted: Vec<Prediction> = summary.results.iter().map(|r| r.prediction).collect();
        assert_eq!(
            predicted,
            vec![Prediction::Class(0), Prediction::Class(1), Prediction::Class(1)]
        );
        assert_eq!(summary.trials, 3);
        let acc = summary.accuracy.unwrap();
        assert!((acc - 2.0 / 3.0).abs() < 1e-12);
    }
    #[test]
    fn degenerate_window_is_skipped_without_command() {
        let data = chunks(640, 32, |_| 1.0);
        let mut markers = vec![
            marker("experiment_start", 0.0),
            marker("trial_start", 0.25),
            marker("trial_end", 2.25),
        ];
        markers.push(marker("experiment_end", 2.5));
        let script = script_markers(&data, markers, 0);
        let mut dec = decoder(RunMode::OpenLoop, data, script, vec![1]);
        while dec.trial_count() == 0 {
            assert_eq!(dec.step(), Step::Running);
        }
        assert!(dec.buffer().is_empty());
        let summary = dec.run();
        assert!(summary.results.is_empty());
        assert_eq!(summary.stats.windows_skipped, 1);
        assert_eq!(summary.trials, 1);
        assert_eq!(summary.accuracy, Some(0.0));
        assert!(dec.outlet().sent().is_empty());
    }
    #[test]
    fn bad_markers_and_read_errors_do_not_stop_the_loop() {
        let mut inlet = ManualDataInlet::new(info(), Vec::new());
        inlet.push_error("amplifier hiccup");
        for chunk in chunks(640, 64, sine(13.0)) {
            inlet.push_chunk(chunk);
        }
        let script = vec![
            Some(marker("experiment_start", 0.0)),
            Some(marker("stimulus_flash", 0.1)),
            Some(marker("trial_end", 0.2)),
            Some(marker("trial_start", 0.5)),
            Some(marker("trial_start", 0.7)),
            None,
            None,
            None,
            None,
            None,
            Some(marker("trial_end", 2.5)),
            Some(marker("experiment_end", 2.5)),
        ];
        let mut dec = Decoder::new(
            &config(RunMode::OpenLoop),
            inlet,
            ManualMarkerInlet::new(script),
            CommandLog::default(),
            Vec::new(),
        )
        .unwrap();
        let summary = dec.run();
        assert_eq!(summary.stats.transport_errors, 1);
        assert_eq!(summary.stats.protocol_violations, 3);
        assert_eq!(summary.results.len(), 1);
        assert_eq!(summary.results[0].window.start, 0.5);
        assert_eq!(summary.results[0].prediction, Prediction::Class(2));
    }
    #[test]
    fn rejected_windows_emit_the_none_id() {
        let mut cfg = config(RunMode::OpenLoop);
        cfg.rejection = Rejection::Threshold(2.0);
        let data = chunks(640, 32, sine(7.0));
        let script = script_markers(
            &data,
            vec![marker("trial_start", 0.0), marker("trial_end", 2.0)],
            0,
        );
        let mut dec = Decoder::new(
            &cfg,
            ManualDataInlet::new(info(), data),
            ManualMarkerInlet::new(script),
            CommandLog::default(),
            Vec::new(),
        )
        .unwrap();
        for _ in 0..25 {
            dec.step();
        }
        assert_eq!(dec.recorder().results().len(), 1);
        assert_eq!(dec.outlet().sent(), &[Prediction::NONE_WIRE]);
        assert_eq!(dec.stats().windows_rejected, 1);
    }
    #[test]
    fn window_with_nan_sample_is_skipped_not_emitted() {
        let data = chunks(640, 32, |t| {
            if (t - 1.0).abs() < 1e-9 {
                f64::NAN
            } else {
                (2.0 * PI * 11.0 * t).sin()
            }
        });
        let markers = vec![
            marker("trial_start", 0.0),
            marker("trial_end", 2.0),
            marker("experiment_end", 2.5),
        ];
        let script = script_markers(&data, markers, 0);
        let mut dec = decoder(RunMode::OpenLoop, data, script, Vec::new());
        let summary = dec.run();
        assert!(summary.results.is_empty());
        assert_eq!(summary.stats.windows_skipped, 1);
        assert!(dec.outlet().sent().is_empty());
    }
    #[test]
    fn closed_loop_history_is_bounded_before_experiment_start() {
        let data = chunks(2560, 64, sine(13.0));
        let mut script: Vec<Option<RawMarker>> = vec![None; 30];
        script.push(Some(marker("experiment_start", 7.5)));
        let mut dec = decoder(RunMode::ClosedLoop, data, script, Vec::new());
        for _ in 0..30 {
            dec.step();
            let ts = dec.buffer().timestamps();
            assert!(ts[ts.len() - 1] - ts[0] <= 1.0 + 1e-9);
        }
        dec.step();
        assert_eq!(dec.classification_start(), Some(7.5));
        // first window [7.5, 8.5) is complete four chunks later
        for _ in 0..4 {
            dec.step();
        }
        assert_eq!(dec.recorder().results().len(), 1);
        assert!((dec.recorder().results()[0].window.start - 7.5).abs() < 1e-12);
    }
    #[test]
    fn stop_handle_ends_the_loop() {
        let mut dec = decoder(RunMode::ClosedLoop, Vec::new(), Vec::new(), Vec::new());
        assert_eq!(dec.step(), Step::Running);
        dec.stop_handle().store(true, Ordering::Relaxed);
        assert_eq!(dec.step(), Step::Finished);
        assert_eq!(dec.step(), Step::Finished);
    }
    #[test]
    fn unmatched_channel_names_are_a_setup_error() {
        let mut cfg = config(RunMode::OpenLoop);
        cfg.channels = vec!["T7".into()];
        let err = Decoder::new(
            &cfg,
            ManualDataInlet::new(info(), Vec::new()),
            ManualMarkerInlet::default(),
            CommandLog::default(),
            Vec::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, DecoderError::NoChannelsSelected(_)));
    }
    #[test]
    fn stream_discovery_retries_until_all_names_resolve() {
        let names = vec!["Micromed".to_string(), "UiOutput".to_string()];
        let mut dir = StaticDirectory::delayed(vec![
            ("Micromed".to_string(), 0),
            ("Other".to_string(), 0),
            ("UiOutput".to_string(), 2),
        ]);
        let connected = connect_streams(&mut dir, &names, Duration::ZERO, None).unwrap();
        assert_eq!(connected, names);
        let mut dir = StaticDirectory::new(vec!["Micromed".to_string()]);
        assert!(matches!(
            connect_streams(&mut dir, &names, Duration::ZERO, Some(3)),
            Err(DecoderError::Transport(_))
        ));
    }
}
