//! Error taxonomy for the prediction pipeline.
//!
//! Every fallible core operation returns a [`PredictorError`]; nothing panics
//! across the crate boundary. The feature-schema variants
//! ([`MissingFeature`](PredictorError::MissingFeature),
//! [`InconsistentFeatures`](PredictorError::InconsistentFeatures)) are defensive:
//! they cannot occur while the extractor emits a fixed schema, but they catch
//! drift between training and prediction if the feature set ever changes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    /// The uploaded bytes are not a valid GPX document.
    #[error("failed to parse track log: {0}")]
    Parse(#[from] gpx::errors::GpxError),

    /// A training submission has untimestamped points, so no completion time
    /// can be derived from it. The same file can still be used for prediction.
    #[error("track log has no usable timestamps, cannot derive a completion time")]
    MissingLabel,

    /// Prediction was requested before any training example exists.
    #[error("no training examples, model is untrained")]
    NotTrained,

    /// A feature the model was trained on is absent from the prediction input.
    #[error("feature '{0}' missing from prediction input")]
    MissingFeature(String),

    /// A stored example does not carry a feature the current schema requires.
    #[error("training example '{id}' is missing feature '{name}'")]
    InconsistentFeatures { id: String, name: String },

    /// The regressor refused to fit the current training set.
    #[error("regression fit failed: {0}")]
    Fit(String),
}
