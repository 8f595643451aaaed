//! # Regression Model Manager
//!
//! Owns the regressor instance and the feature-name schema it was trained on.
//! The model is rebuilt from the full training set on every store mutation;
//! with the small training sets this system sees, a full refit is cheaper than
//! maintaining any incremental state.
//!
//! ## Regressor choice
//!
//! Ridge regression (coordinate descent via `linfa-elasticnet` with
//! `l1_ratio = 0`). The training set is routinely smaller than the feature
//! count — one or two uploaded hikes against eleven features — and plain
//! least squares is rank-deficient there. The ridge penalty keeps the fit
//! well-posed for any training-set size, down to a single example (which fits
//! to an intercept-only model predicting that example's time).
//!
//! ## Schema invariant
//!
//! `feature_names` is set on a successful fit to the key order of the first
//! example's feature vector. Every later fit or predict projects onto exactly
//! that ordering or fails with a typed error; nothing is silently reordered.

use linfa::prelude::*;
use linfa::Dataset;
use linfa_elasticnet::ElasticNet;
use log::{debug, info};
use ndarray::{Array1, Array2};

use crate::{FeatureVector, PredictorError, TrainingExample};

/// Ridge penalty. Small enough not to drown the signal, large enough to keep
/// the coordinate-descent denominator away from zero on degenerate columns.
const RIDGE_PENALTY: f64 = 0.1;

/// The regressor plus the schema it was trained on.
#[derive(Debug, Default)]
pub struct ModelManager {
    regressor: Option<ElasticNet<f64>>,
    feature_names: Vec<String>,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fit has succeeded and predictions are available.
    pub fn is_trained(&self) -> bool {
        self.regressor.is_some()
    }

    /// Feature ordering the current model was trained on. Empty when untrained.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Drop the fitted model and its schema.
    pub fn reset(&mut self) {
        self.regressor = None;
        self.feature_names.clear();
        debug!("[Model] Reset to untrained");
    }

    /// Rebuild the regressor from the full training set.
    ///
    /// An empty set resets to untrained. Otherwise the input matrix is built
    /// by projecting every example onto the first example's feature order;
    /// an example missing one of those keys fails with
    /// [`PredictorError::InconsistentFeatures`] (defensive — cannot happen
    /// while the extractor emits a fixed schema). State is committed only
    /// after a successful fit, so a failed retrain leaves the previous model
    /// usable.
    pub fn retrain(&mut self, examples: &[TrainingExample]) -> Result<(), PredictorError> {
        if examples.is_empty() {
            self.reset();
            return Ok(());
        }

        let names: Vec<String> = examples[0].features.names().map(str::to_string).collect();

        let mut data = Vec::with_capacity(examples.len() * names.len());
        for example in examples {
            for name in &names {
                let value =
                    example
                        .features
                        .get(name)
                        .ok_or_else(|| PredictorError::InconsistentFeatures {
                            id: example.id.clone(),
                            name: name.clone(),
                        })?;
                data.push(value);
            }
        }

        let records = Array2::from_shape_vec((examples.len(), names.len()), data)
            .map_err(|e| PredictorError::Fit(e.to_string()))?;
        let targets = Array1::from_iter(examples.iter().map(|e| e.completion_time));
        let dataset = Dataset::new(records, targets);

        let fitted = ElasticNet::<f64>::ridge()
            .penalty(RIDGE_PENALTY)
            .fit(&dataset)
            .map_err(|e| PredictorError::Fit(e.to_string()))?;

        self.feature_names = names;
        self.regressor = Some(fitted);
        info!(
            "[Model] Retrained on {} example(s), {} features",
            examples.len(),
            self.feature_names.len()
        );
        Ok(())
    }

    /// Estimate the completion time (minutes) for one feature vector.
    ///
    /// The input is projected onto the trained feature order;
    /// [`PredictorError::MissingFeature`] flags schema drift between training
    /// and prediction. The raw regressor output is returned as-is — estimates
    /// are not clamped, so a negative value is surfaced, not hidden.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, PredictorError> {
        let regressor = self.regressor.as_ref().ok_or(PredictorError::NotTrained)?;

        let row = features.project(&self.feature_names)?;
        let records = Array2::from_shape_vec((1, row.len()), row)
            .map_err(|e| PredictorError::Fit(e.to_string()))?;

        Ok(regressor.predict(&records)[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(id: &str, distance: f64, gain: f64, minutes: f64) -> TrainingExample {
        let mut features = FeatureVector::new();
        features.insert("total_distance", distance);
        features.insert("total_elevation_gain", gain);
        TrainingExample {
            id: id.to_string(),
            name: format!("{id}.gpx"),
            features,
            completion_time: minutes,
        }
    }

    #[test]
    fn test_untrained_predict_fails() {
        let model = ModelManager::new();
        let err = model.predict(&FeatureVector::new()).unwrap_err();
        assert!(matches!(err, PredictorError::NotTrained));
    }

    #[test]
    fn test_retrain_on_empty_set_resets() {
        let mut model = ModelManager::new();
        model.retrain(&[example("a", 5000.0, 300.0, 90.0)]).unwrap();
        assert!(model.is_trained());

        model.retrain(&[]).unwrap();
        assert!(!model.is_trained());
        assert!(model.feature_names().is_empty());
    }

    #[test]
    fn test_single_example_predicts_its_own_label() {
        let mut model = ModelManager::new();
        let ex = example("a", 5000.0, 300.0, 90.0);
        model.retrain(std::slice::from_ref(&ex)).unwrap();

        let estimate = model.predict(&ex.features).unwrap();
        assert!((estimate - 90.0).abs() < 1e-6, "got {estimate}");
    }

    #[test]
    fn test_feature_names_follow_first_example() {
        let mut model = ModelManager::new();
        model
            .retrain(&[
                example("a", 5000.0, 300.0, 90.0),
                example("b", 12000.0, 800.0, 240.0),
            ])
            .unwrap();

        assert_eq!(
            model.feature_names(),
            &["total_distance".to_string(), "total_elevation_gain".to_string()]
        );
    }

    #[test]
    fn test_prediction_between_examples_is_finite() {
        let mut model = ModelManager::new();
        model
            .retrain(&[
                example("a", 5000.0, 300.0, 90.0),
                example("b", 12000.0, 800.0, 240.0),
                example("c", 8000.0, 500.0, 150.0),
            ])
            .unwrap();

        let mut query = FeatureVector::new();
        query.insert("total_distance", 9000.0);
        query.insert("total_elevation_gain", 550.0);

        let estimate = model.predict(&query).unwrap();
        assert!(estimate.is_finite());
    }

    #[test]
    fn test_inconsistent_training_schema_is_flagged() {
        let mut model = ModelManager::new();

        let mut sparse = FeatureVector::new();
        sparse.insert("total_distance", 4000.0);
        let broken = TrainingExample {
            id: "broken".to_string(),
            name: "broken.gpx".to_string(),
            features: sparse,
            completion_time: 60.0,
        };

        let err = model
            .retrain(&[example("a", 5000.0, 300.0, 90.0), broken])
            .unwrap_err();
        assert!(matches!(
            err,
            PredictorError::InconsistentFeatures { ref id, ref name }
                if id == "broken" && name == "total_elevation_gain"
        ));
        // Failed fit must not have committed any state.
        assert!(!model.is_trained());
    }

    #[test]
    fn test_failed_retrain_keeps_previous_model() {
        let mut model = ModelManager::new();
        model.retrain(&[example("a", 5000.0, 300.0, 90.0)]).unwrap();

        let mut sparse = FeatureVector::new();
        sparse.insert("total_distance", 4000.0);
        let broken = TrainingExample {
            id: "broken".to_string(),
            name: "broken.gpx".to_string(),
            features: sparse,
            completion_time: 60.0,
        };

        assert!(model
            .retrain(&[example("a", 5000.0, 300.0, 90.0), broken])
            .is_err());

        // Old model still answers.
        assert!(model.is_trained());
        let estimate = model.predict(&example("a", 5000.0, 300.0, 90.0).features);
        assert!(estimate.is_ok());
    }

    #[test]
    fn test_predict_flags_schema_drift() {
        let mut model = ModelManager::new();
        model.retrain(&[example("a", 5000.0, 300.0, 90.0)]).unwrap();

        let mut drifted = FeatureVector::new();
        drifted.insert("total_distance", 5000.0);

        let err = model.predict(&drifted).unwrap_err();
        assert!(matches!(
            err,
            PredictorError::MissingFeature(name) if name == "total_elevation_gain"
        ));
    }
}
