use ndarray::{Array2, ArrayView2};
use rustfft::{num_complex::Complex64, FftPlanner};
/// Mains interference band removed from every window.
pub const ARTIFACT_BAND_HZ: (f64, f64) = (48.0, 52.0);
/// Margin kept around the lowest fundamental and the highest harmonic.
const BAND_MARGIN_HZ: f64 = 1.0;
/// Stateless window transform applied before classification.
pub trait Preprocessor {
    fn apply(&self, window: ArrayView2<f64>) -> Array2<f64>;
}
/// Zero-phase band-pass done in the frequency domain, one channel at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralBandpass {
    pub sample_rate_hz: f64,
    pub low_hz: f64,
    pub high_hz: f64,
    pub reject_band: Option<(f64, f64)>,
}
impl SpectralBandpass {
    /// Pass band spanning the stimulus fundamentals up to their highest
    /// harmonic, with the mains band rejected.
    pub fn for_frequencies(frequencies: &[f64], harmonics: usize, sample_rate_hz: f64) -> Self {
        let lowest = frequencies.iter().copied().fold(f64::INFINITY, f64::min);
        let highest = frequencies.iter().copied().fold(0.0, f64::max);
        let nyquist = sample_rate_hz * 0.5;
        let low_hz = if lowest.is_finite() {
            (lowest - BAND_MARGIN_HZ).max(0.0)
        } else {
            0.0
        };
        let high_hz = (highest * harmonics.max(1) as f64 + BAND_MARGIN_HZ).min(nyquist);
        Self {
            sample_rate_hz,
            low_hz,
            high_hz,
            reject_band: Some(ARTIFACT_BAND_HZ),
        }
    }
    fn keeps(&self, freq_hz: f64) -> bool {
        if freq_hz < self.low_hz || freq_hz > self.high_hz {
            return false;
        }
        match self.reject_band {
            Some((lo, hi)) => !(freq_hz >= lo && freq_hz <= hi),
            None => true,
        }
    }
}
impl Preprocessor for SpectralBandpass {
    fn apply(&self, window: ArrayView2<f64>) -> Array2<f64> {
        let (n, channels) = window.dim();
        let mut out = Array2::<f64>::zeros((n, channels));
        if n == 0 {
            return out;
        }
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);
        let bin_hz = self.sample_rate_hz / n as f64;
        let mask: Vec<bool> = (0..n)
            .map(|k| {
                // bins above n/2 mirror the negative frequencies
                let k = k.min(n - k);
                self.keeps(k as f64 * bin_hz)
            })
            .collect();
        for (ch, column) in window.columns().into_iter().enumerate() {
            let mut buffer: Vec<Complex64> =
                column.iter().map(|&v| Complex64::new(v, 0.0)).collect();
            forward.process(&mut buffer);
            for (bin, keep) in buffer.iter_mut().zip(&mask) {
                if !keep {
                    *bin = Complex64::new(0.0, 0.0);
                }
            }
            inverse.process(&mut buffer);
            for (row, value) in buffer.iter().enumerate() {
                out[[row, ch]] = value.re / n as f64;
            }
        }
        out
    }
}
