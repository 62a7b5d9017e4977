use ndarray::Array2;
use crate::drivers::{DecoderError, SampleChunk};
/// Append-only store of timestamped samples, truncatable from the head.
///
/// Timestamps are kept in their own vector so window bounds can be searched
/// without touching the sample data.
pub struct StreamBuffer {
    timestamps: Vec<f64>,
    samples: Vec<Vec<f64>>, // sample -> channels
    channel_count: usize,
}
impl StreamBuffer {
    pub fn new(channel_count: usize) -> Self {
        Self {
            timestamps: Vec::new(),
            samples: Vec::new(),
            channel_count,
        }
    }
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
    pub fn newest_timestamp(&self) -> Option<f64> {
        self.timestamps.last().copied()
    }
    pub fn append(&mut self, timestamp: f64, sample: Vec<f64>) -> Result<(), DecoderError> {
        if sample.len() != self.channel_count {
            return Err(DecoderError::ChannelMismatch {
                expected: self.channel_count,
                actual: sample.len(),
            });
        }
        if let Some(previous) = self.newest_timestamp() {
            if timestamp < previous {
                return Err(DecoderError::NonMonotonicTimestamp {
                    previous,
                    actual: timestamp,
                });
            }
        }
        self.timestamps.push(timestamp);
        self.samples.push(sample);
        Ok(())
    }
    /// Appends a whole chunk. Stops at the first sample that breaks channel
    /// count or ordering; the samples before it stay buffered.
    pub fn extend(&mut self, chunk: SampleChunk) -> Result<usize, DecoderError> {
        chunk.validate()?;
        let mut appended = 0;
        for (timestamp, sample) in chunk.timestamps.into_iter().zip(chunk.samples) {
            self.append(timestamp, sample)?;
            appended += 1;
        }
        Ok(appended)
    }
    /// Copies rows `start..stop` restricted to `channels` (in the given order).
    ///
    /// Bounds come from the caller's own timestamp search, so bad indices are
    /// a bug and panic.
    pub fn slice(&self, start: usize, stop: usize, channels: &[usize]) -> Array2<f64> {
        assert!(start <= stop, "slice start {start} after stop {stop}");
        assert!(
            stop <= self.len(),
            "slice stop {stop} beyond buffer length {}",
            self.len()
        );
        assert!(
            channels.iter().all(|&c| c < self.channel_count),
            "channel selection {channels:?} out of range for {} channels",
            self.channel_count
        );
        Array2::from_shape_fn((stop - start, channels.len()), |(row, col)| {
            self.samples[start + row][channels[col]]
        })
    }
    /// Drops every entry with index below `index`.
    pub fn truncate_before(&mut self, index: usize) {
        assert!(
            index <= self.len(),
            "truncate index {index} beyond buffer length {}",
            self.len()
        );
        self.timestamps.drain(..index);
        self.samples.drain(..index);
    }
    pub fn clear(&mut self) {
        self.timestamps.clear();
        self.samples.clear();
    }
}
