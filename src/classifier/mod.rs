// src/classifier/mod.rs
pub mod cca;
pub mod linalg;
pub mod reference;
pub use cca::{
    canonical_correlation, class_scores, Classifier, ClassifierOutput, FixedThreshold, Rejection,
    RejectionPolicy, ScoreMargin,
};
pub use reference::{ReferenceSignalBank, DEFAULT_HARMONICS};
