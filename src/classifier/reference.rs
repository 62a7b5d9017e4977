use std::f64::consts::PI;
use ndarray::{s, Array3, ArrayView2};
use crate::drivers::DecoderError;
pub const DEFAULT_HARMONICS: usize = 3;
/// Harmonic sine/cosine templates, one matrix per stimulus class.
///
/// Column `2(h-1)` holds `sin(2π·f·h·t)` and column `2(h-1)+1` holds
/// `cos(2π·f·h·t)` for harmonic `h` in `1..=harmonics`, with `t = n / fs`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceSignalBank {
    signals: Array3<f64>, // class x sample x column
}
impl ReferenceSignalBank {
    pub fn generate(
        frequencies: &[f64],
        max_length: usize,
        sample_rate_hz: f64,
        harmonics: usize,
    ) -> Result<Self, DecoderError> {
        if frequencies.is_empty() {
            return Err(DecoderError::EmptyFrequencyList);
        }
        if !(sample_rate_hz > 0.0) {
            return Err(DecoderError::InvalidSampleRate);
        }
        if let Some(bad) = frequencies.iter().find(|f| !(**f > 0.0) || !f.is_finite()) {
            return Err(DecoderError::InvalidParameter {
                name: "stimulusFrequencies",
                reason: format!("{bad} Hz is not a positive frequency"),
            });
        }
        if max_length == 0 {
            return Err(DecoderError::InvalidParameter {
                name: "maxSampleLength",
                reason: "must be at least one sample".into(),
            });
        }
        if harmonics == 0 {
            return Err(DecoderError::InvalidParameter {
                name: "harmonics",
                reason: "must be at least one".into(),
            });
        }
        let signals = Array3::from_shape_fn(
            (frequencies.len(), max_length, 2 * harmonics),
            |(class, n, col)| {
                let harmonic = (col / 2 + 1) as f64;
                let phase = 2.0 * PI * frequencies[class] * harmonic * (n as f64 / sample_rate_hz);
                if col % 2 == 0 {
                    phase.sin()
                } else {
                    phase.cos()
                }
            },
        );
        Ok(Self { signals })
    }
    pub fn num_classes(&self) -> usize {
        self.signals.dim().0
    }
    /// `(classes, max_length, 2 * harmonics)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.signals.dim()
    }
    /// Reference matrix of `class`, `max_length x 2·harmonics`.
    pub fn reference(&self, class: usize) -> ArrayView2<'_, f64> {
        self.signals.slice(s![class, .., ..])
    }
}
