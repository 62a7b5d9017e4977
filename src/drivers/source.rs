use std::collections::VecDeque;
use std::time::Duration;
use crate::drivers::DecoderError;
/// Channel metadata of the EEG stream.
#[derive(Clone, Debug)]
pub struct StreamInfo {
    pub name: String,
    pub sample_rate_hz: f64,
    pub channel_labels: Vec<String>,
}
impl StreamInfo {
    pub fn channel_count(&self) -> usize {
        self.channel_labels.len()
    }
}
/// One pull from the data inlet: samples x channels plus one timestamp per sample.
#[derive(Clone, Debug, Default)]
pub struct SampleChunk {
    pub timestamps: Vec<f64>,
    pub samples: Vec<Vec<f64>>,
}
impl SampleChunk {
    pub fn new(timestamps: Vec<f64>, samples: Vec<Vec<f64>>) -> Self {
        Self {
            timestamps,
            samples,
        }
    }
    pub fn validate(&self) -> Result<(), DecoderError> {
        if self.timestamps.len() != self.samples.len() {
            return Err(DecoderError::ChunkShape {
                samples: self.samples.len(),
                timestamps: self.timestamps.len(),
            });
        }
        Ok(())
    }
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
/// Raw marker as it comes off the transport, before the token is interpreted.
#[derive(Clone, Debug, PartialEq)]
pub struct RawMarker {
    pub token: String,
    pub timestamp: f64,
}
impl RawMarker {
    pub fn new(token: impl Into<String>, timestamp: f64) -> Self {
        Self {
            token: token.into(),
            timestamp,
        }
    }
}
/// Multichannel EEG stream. An empty chunk means nothing new arrived.
pub trait DataInlet {
    fn info(&self) -> &StreamInfo;
    fn pull_chunk(&mut self, timeout: Duration) -> Result<SampleChunk, DecoderError>;
}
/// Marker stream from the stimulus UI, one marker per pull.
pub trait MarkerInlet {
    fn pull_sample(&mut self, timeout: Duration) -> Result<Option<RawMarker>, DecoderError>;
}
/// Where class decisions go.
pub trait CommandOutlet {
    fn push_sample(&mut self, value: i32) -> Result<(), DecoderError>;
}
/// Stream discovery on the transport.
pub trait StreamDirectory {
    /// Names of the streams currently visible, waiting at most `wait`.
    fn resolve(&mut self, wait: Duration) -> Vec<String>;
}
/// In-memory data inlet useful for tests and deterministic playback.
///
/// Each pull pops one queued entry; an exhausted queue yields empty chunks.
pub struct ManualDataInlet {
    info: StreamInfo,
    queue: VecDeque<Result<SampleChunk, String>>,
}
impl ManualDataInlet {
    pub fn new(info: StreamInfo, chunks: impl IntoIterator<Item = SampleChunk>) -> Self {
        Self {
            info,
            queue: chunks.into_iter().map(Ok).collect(),
        }
    }
    #[cfg(test)]
    pub fn push_chunk(&mut self, chunk: SampleChunk) {
        self.queue.push_back(Ok(chunk));
    }
    #[cfg(test)]
    /// Queue a failed read.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.queue.push_back(Err(message.into()));
    }
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
impl DataInlet for ManualDataInlet {
    fn info(&self) -> &StreamInfo {
        &self.info
    }
    fn pull_chunk(&mut self, _timeout: Duration) -> Result<SampleChunk, DecoderError> {
        match self.queue.pop_front() {
            Some(Ok(chunk)) => Ok(chunk),
            Some(Err(message)) => Err(DecoderError::Transport(message)),
            None => Ok(SampleChunk::default()),
        }
    }
}
/// Scripted marker inlet: entry `i` is what the `i`-th pull returns.
#[derive(Default)]
pub struct ManualMarkerInlet {
    script: VecDeque<Option<RawMarker>>,
}
impl ManualMarkerInlet {
    pub fn new(script: impl IntoIterator<Item = Option<RawMarker>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.script.len()
    }
}
impl MarkerInlet for ManualMarkerInlet {
    fn pull_sample(&mut self, _timeout: Duration) -> Result<Option<RawMarker>, DecoderError> {
        Ok(self.script.pop_front().flatten())
    }
}
/// Outlet that keeps every value pushed to it.
#[derive(Debug, Default)]
pub struct CommandLog {
    sent: Vec<i32>,
}
impl CommandLog {
    pub fn sent(&self) -> &[i32] {
        &self.sent
    }
}
impl CommandOutlet for CommandLog {
    fn push_sample(&mut self, value: i32) -> Result<(), DecoderError> {
        self.sent.push(value);
        Ok(())
    }
}
/// Directory where each stream shows up after a fixed number of resolve rounds.
pub struct StaticDirectory {
    streams: Vec<(String, usize)>,
    rounds: usize,
}
impl StaticDirectory {
    /// All streams visible immediately.
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self::delayed(names.into_iter().map(|name| (name, 0)))
    }
    pub fn delayed(streams: impl IntoIterator<Item = (String, usize)>) -> Self {
        Self {
            streams: streams.into_iter().collect(),
            rounds: 0,
        }
    }
}
impl StreamDirectory for StaticDirectory {
    fn resolve(&mut self, _wait: Duration) -> Vec<String> {
        let round = self.rounds;
        self.rounds += 1;
        self.streams
            .iter()
            .filter(|(_, visible_after)| *visible_after <= round)
            .map(|(name, _)| name.clone())
            .collect()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn manual_inlet_reports_errors_then_empty_chunks() {
        let info = StreamInfo {
            name: "EEG".into(),
            sample_rate_hz: 250.0,
            channel_labels: vec!["O1".into()],
        };
        let mut inlet = ManualDataInlet::new(
            info,
            vec![SampleChunk::new(vec![0.0, 0.004], vec![vec![1.0], vec![2.0]])],
        );
        inlet.push_error("inlet lost");
        assert_eq!(inlet.pull_chunk(Duration::ZERO).unwrap().len(), 2);
        assert!(matches!(
            inlet.pull_chunk(Duration::ZERO),
            Err(DecoderError::Transport(_))
        ));
        assert!(inlet.pull_chunk(Duration::ZERO).unwrap().is_empty());
    }
    #[test]
    fn chunk_shape_is_checked() {
        let chunk = SampleChunk::new(vec![0.0], vec![vec![1.0], vec![2.0]]);
        assert!(matches!(
            chunk.validate(),
            Err(DecoderError::ChunkShape {
                samples: 2,
                timestamps: 1
            })
        ));
    }
    #[test]
    fn delayed_directory_reveals_streams_over_rounds() {
        let mut dir = StaticDirectory::delayed(vec![("EEG".to_string(), 0), ("Markers".to_string(), 2)]);
        assert_eq!(dir.resolve(Duration::ZERO), vec!["EEG".to_string()]);
        assert_eq!(dir.resolve(Duration::ZERO), vec!["EEG".to_string()]);
        assert_eq!(dir.resolve(Duration::ZERO).len(), 2);
    }
}
