//! # Training Store
//!
//! Ordered, in-memory collection of labeled examples. The store is
//! deliberately dumb: parsing, feature extraction and retraining are
//! orchestrated by [`HikePredictor`](crate::HikePredictor), which keeps the
//! store and the model consistent. Nothing here survives a process restart.

use serde::Serialize;

use crate::FeatureVector;

/// A labeled route: features plus the observed completion time.
///
/// Created on a successful training submission, removed on explicit deletion,
/// never mutated otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingExample {
    /// Unique identifier (uuid v4), generated at submission time.
    pub id: String,
    /// Display name, typically the uploaded filename.
    pub name: String,
    /// Extracted feature vector, keys in extraction order.
    pub features: FeatureVector,
    /// Observed completion time in minutes.
    pub completion_time: f64,
}

/// Insertion-ordered collection of [`TrainingExample`]s.
#[derive(Debug, Default)]
pub struct TrainingStore {
    examples: Vec<TrainingExample>,
}

impl TrainingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an example. Order is insertion order, never re-sorted.
    pub fn push(&mut self, example: TrainingExample) {
        self.examples.push(example);
    }

    /// Remove the example with the given id.
    ///
    /// Returns `true` if something was removed. Removing an unknown id is a
    /// no-op, so the operation is idempotent.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.examples.len();
        self.examples.retain(|e| e.id != id);
        self.examples.len() != before
    }

    /// Remove and return the most recently appended example.
    /// Used to roll back a failed add.
    pub fn pop(&mut self) -> Option<TrainingExample> {
        self.examples.pop()
    }

    /// All examples in insertion order. Read-only view.
    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}
