//! # Hike Predictor
//!
//! Hiking completion-time estimation from GPX track logs.
//!
//! This library provides:
//! - GPX track-log parsing into a flat, ordered point sequence
//! - Statistical feature extraction from the route's elevation/distance profile
//! - An in-memory training store of labeled routes
//! - A ridge regressor retrained on every store mutation
//!
//! ## Pipeline
//!
//! Parser → Feature Extractor → Training Store (label known) or prediction
//! (label unknown) → Regression Model Manager. All of it is owned by one
//! [`HikePredictor`] value — there is no process-wide state.
//!
//! ## Quick Start
//!
//! ```rust
//! use hike_predictor::HikePredictor;
//!
//! let labeled = br#"<?xml version="1.0" encoding="UTF-8"?>
//! <gpx version="1.1" creator="docs" xmlns="http://www.topografix.com/GPX/1/1">
//!   <trk><trkseg>
//!     <trkpt lat="0.0" lon="0.0"><ele>100.0</ele><time>2024-06-01T08:00:00Z</time></trkpt>
//!     <trkpt lat="0.0" lon="0.00045"><ele>150.0</ele><time>2024-06-01T08:01:00Z</time></trkpt>
//!     <trkpt lat="0.0" lon="0.00090"><ele>120.0</ele><time>2024-06-01T08:02:00Z</time></trkpt>
//!   </trkseg></trk>
//! </gpx>"#;
//!
//! let mut predictor = HikePredictor::new();
//! let example = predictor.add_training_example("morning-hike.gpx", labeled).unwrap();
//! assert!((example.completion_time - 2.0).abs() < 1e-9);
//!
//! // The same file without timestamps still works as a prediction input.
//! let prediction = predictor.predict(labeled).unwrap();
//! assert!(prediction.estimated_time.is_finite());
//! ```
//!
//! ## Concurrency
//!
//! [`HikePredictor`] is not internally synchronized. Mutating operations take
//! `&mut self`, so exclusive access is a compile-time property; a service
//! layer handling concurrent requests must serialize access itself (e.g. a
//! `Mutex<HikePredictor>`). Two interleaved retrains would otherwise race on
//! the trained feature ordering.

use log::{debug, info};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

pub mod error;
pub mod features;
pub mod model;
pub mod store;
pub mod track_log;

pub use error::PredictorError;
pub use features::{
    completion_time_minutes, extract_features, moving_average, segment_profile, FeatureVector,
    SegmentProfile, FEATURE_NAMES, SMOOTHING_WINDOW,
};
pub use model::ModelManager;
pub use store::{TrainingExample, TrainingStore};
pub use track_log::parse_track_log;

// ============================================================================
// Core Types
// ============================================================================

/// A single point of a recorded track, in source order.
///
/// Immutable once produced by the parser. Elevation and timestamp are optional
/// in GPX; how their absence is handled is decided downstream (differencing
/// treats missing elevation as 0.0, a missing timestamp disqualifies the track
/// as a training label).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters, if the recording device provided one.
    pub elevation: Option<f64>,
    /// Recording timestamp, if present.
    pub time: Option<OffsetDateTime>,
}

impl TrackPoint {
    /// Create a point without elevation or timestamp.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            time: None,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Estimated completion time for an unlabeled track, in minutes.
///
/// The estimate is the raw regressor output. It is not clamped: a model
/// trained on few or odd examples can produce a negative estimate, and the
/// caller gets to see that rather than a silently adjusted value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub estimated_time: f64,
}

// ============================================================================
// Facade
// ============================================================================

/// The whole pipeline behind one handle: training store plus model manager.
///
/// Instantiated once by the caller and passed by reference into each
/// operation. A failed operation never leaves partial state behind: a failed
/// add rolls the store back, a failed retrain keeps the previous model.
#[derive(Debug, Default)]
pub struct HikePredictor {
    store: TrainingStore,
    model: ModelManager,
}

impl HikePredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a labeled track: parse, extract features, derive the completion
    /// time from its timestamps, store it and retrain.
    ///
    /// Fails with [`PredictorError::Parse`] on malformed GPX and
    /// [`PredictorError::MissingLabel`] when not every point is timestamped.
    /// On failure the store and the model are left exactly as they were.
    pub fn add_training_example(
        &mut self,
        name: &str,
        raw: &[u8],
    ) -> Result<TrainingExample, PredictorError> {
        let points = track_log::parse_track_log(raw)?;
        let features = features::extract_features(&points);
        let completion_time =
            features::completion_time_minutes(&points).ok_or(PredictorError::MissingLabel)?;

        let example = TrainingExample {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            features,
            completion_time,
        };

        self.store.push(example.clone());
        if let Err(err) = self.model.retrain(self.store.examples()) {
            // Failed add must not mutate the store.
            self.store.pop();
            return Err(err);
        }

        info!(
            "[Predictor] Added '{}' ({:.1} min observed), {} example(s) total",
            name,
            completion_time,
            self.store.len()
        );
        Ok(example)
    }

    /// Remove a training example by id. Idempotent: removing an unknown id is
    /// a no-op. When the last example goes, the model resets to untrained;
    /// otherwise it is retrained on the remainder.
    pub fn remove_training_example(&mut self, id: &str) -> Result<(), PredictorError> {
        if !self.store.remove(id) {
            debug!("[Predictor] Remove of unknown id '{}' ignored", id);
            return Ok(());
        }

        if self.store.is_empty() {
            self.model.reset();
        } else {
            self.model.retrain(self.store.examples())?;
        }

        info!(
            "[Predictor] Removed '{}', {} example(s) remain",
            id,
            self.store.len()
        );
        Ok(())
    }

    /// All training examples in insertion order, read-only.
    pub fn training_examples(&self) -> &[TrainingExample] {
        self.store.examples()
    }

    /// Whether the model has been fit and can answer predictions.
    pub fn is_trained(&self) -> bool {
        self.model.is_trained()
    }

    /// Estimate the completion time for an unlabeled track.
    ///
    /// Fails with [`PredictorError::NotTrained`] before any example exists
    /// (checked before parsing — an empty model can't answer regardless of
    /// input), [`PredictorError::Parse`] on malformed GPX, and
    /// [`PredictorError::MissingFeature`] on extractor schema drift.
    pub fn predict(&self, raw: &[u8]) -> Result<Prediction, PredictorError> {
        if !self.model.is_trained() {
            return Err(PredictorError::NotTrained);
        }

        let points = track_log::parse_track_log(raw)?;
        let features = features::extract_features(&points);
        let estimated_time = self.model.predict(&features)?;

        debug!(
            "[Predictor] Estimated {:.1} min for a {}-point track",
            estimated_time,
            points.len()
        );
        Ok(Prediction { estimated_time })
    }
}

// ============================================================================
// Tests
// ============================================================================
