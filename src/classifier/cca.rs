use ndarray::{s, ArrayView2};
use crate::brain_utils::pearson;
use crate::classifier::linalg::{
    center_columns, cholesky, cross_covariance, leading_eigenpair, to_array,
};
use crate::classifier::ReferenceSignalBank;
use crate::drivers::{DecoderError, Preprocessor};
use crate::types::Prediction;
/// Squared canonical correlations at or below this count as no correlation.
const NEGLIGIBLE_CORRELATION_SQ: f64 = 1e-12;
/// Decides whether the best class is trusted or replaced by "none".
pub trait RejectionPolicy {
    fn rejects(&self, scores: &[f64], best: usize) -> bool;
}
/// Rejects when the best correlation is at or below a fixed value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedThreshold(pub f64);
impl RejectionPolicy for FixedThreshold {
    fn rejects(&self, scores: &[f64], best: usize) -> bool {
        !(scores[best] > self.0)
    }
}
/// Rejects when the best correlation does not beat the runner-up by more than
/// the margin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreMargin(pub f64);
impl RejectionPolicy for ScoreMargin {
    fn rejects(&self, scores: &[f64], best: usize) -> bool {
        let runner_up = scores
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != best)
            .map(|(_, s)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        runner_up.is_finite() && scores[best] - runner_up <= self.0
    }
}
/// Configured rejection strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rejection {
    Threshold(f64),
    Margin(f64),
}
impl Default for Rejection {
    fn default() -> Self {
        Rejection::Threshold(0.0)
    }
}
impl Rejection {
    pub fn policy(&self) -> Box<dyn RejectionPolicy> {
        match *self {
            Rejection::Threshold(value) => Box::new(FixedThreshold(value)),
            Rejection::Margin(value) => Box::new(ScoreMargin(value)),
        }
    }
}
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierOutput {
    pub prediction: Prediction,
    /// Maximum correlation over all classes, also when rejected.
    pub confidence: f64,
    pub scores: Vec<f64>,
}
/// CCA classifier against a fixed bank of reference signals.
///
/// The bank is never edited in place; new stimulus parameters mean a new bank
/// and a new classifier.
pub struct Classifier {
    bank: ReferenceSignalBank,
    rejection: Box<dyn RejectionPolicy>,
    preprocessor: Option<Box<dyn Preprocessor>>,
}
impl Classifier {
    pub fn new(bank: ReferenceSignalBank, rejection: Box<dyn RejectionPolicy>) -> Self {
        Self {
            bank,
            rejection,
            preprocessor: None,
        }
    }
    pub fn with_preprocessor(mut self, preprocessor: Box<dyn Preprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }
    /// Scores `window` (samples x channels) against every class.
    pub fn classify(&self, window: ArrayView2<f64>) -> Result<ClassifierOutput, DecoderError> {
        if window.iter().any(|v| !v.is_finite()) {
            return Err(DecoderError::DegenerateWindow(
                "window contains non-finite samples".into(),
            ));
        }
        let scores = match &self.preprocessor {
            Some(pre) => {
                let filtered = pre.apply(window);
                class_scores(filtered.view(), &self.bank)?
            }
            None => class_scores(window, &self.bank)?,
        };
        let best = argmax(&scores);
        let confidence = scores[best];
        let prediction = if self.rejection.rejects(&scores, best) {
            Prediction::Rejected
        } else {
            Prediction::Class(best)
        };
        Ok(ClassifierOutput {
            prediction,
            confidence,
            scores,
        })
    }
}
/// First canonical correlation of `window` with each class reference.
///
/// Both sides are cut to the shorter of the two lengths; nothing is padded.
pub fn class_scores(
    window: ArrayView2<f64>,
    bank: &ReferenceSignalBank,
) -> Result<Vec<f64>, DecoderError> {
    (0..bank.num_classes())
        .map(|class| {
            let reference = bank.reference(class);
            let len = window.nrows().min(reference.nrows());
            canonical_correlation(
                window.slice(s![..len, ..]),
                reference.slice(s![..len, ..]),
            )
        })
        .collect()
}
/// Rank-1 CCA between `x` (samples x p, the EEG side) and `y` (samples x q).
///
/// Whitens both covariance blocks with their Cholesky factors, takes the
/// leading eigenvector of `K K^T` with `K = Lx^-1 Cxy Ly^-T`, maps it back to
/// projection weights and returns the Pearson correlation of the two
/// canonical variates. Errors only come from the `x` side or from a
/// singular `y`; two sets with no shared direction score 0.
pub fn canonical_correlation(x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<f64, DecoderError> {
    let samples = x.nrows();
    let variables = x.ncols().max(y.ncols());
    if x.ncols() == 0 || y.ncols() == 0 {
        return Err(DecoderError::DegenerateWindow("no channels".into()));
    }
    if samples <= variables {
        return Err(DecoderError::InsufficientSamples { samples, variables });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(DecoderError::DegenerateWindow("non-finite samples".into()));
    }
    let xc = center_columns(x);
    let yc = center_columns(y);
    let lx = cholesky(&cross_covariance(&xc, &xc)).ok_or_else(|| {
        DecoderError::DegenerateWindow("EEG channels are flat or linearly dependent".into())
    })?;
    let ly = cholesky(&cross_covariance(&yc, &yc)).ok_or_else(|| {
        DecoderError::DegenerateWindow("reference columns are linearly dependent".into())
    })?;
    let singular = || DecoderError::DegenerateWindow("singular whitening factor".into());
    let cxy = cross_covariance(&xc, &yc);
    let left = lx.solve_lower_triangular(&cxy).ok_or_else(singular)?; // Lx^-1 Cxy
    let k = ly
        .solve_lower_triangular(&left.transpose())
        .ok_or_else(singular)?
        .transpose(); // Lx^-1 Cxy Ly^-T
    let (rho_sq, w) = leading_eigenpair(&k * k.transpose());
    if !(rho_sq > NEGLIGIBLE_CORRELATION_SQ) {
        return Ok(0.0);
    }
    let a = lx.transpose().solve_upper_triangular(&w).ok_or_else(singular)?;
    let b = ly
        .transpose()
        .solve_upper_triangular(&(k.transpose() * &w))
        .ok_or_else(singular)?;
    let u = xc.dot(&to_array(&a));
    let v = yc.dot(&to_array(&b));
    // x is full rank here, so a collapsed variate can only be the reference side
    Ok(pearson(u.view(), v.view()).unwrap_or(0.0))
}
/// Index of the largest score; the first one wins ties.
fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = i;
        }
    }
    best
}
