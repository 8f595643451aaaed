//! # Segment Feature Extraction
//!
//! Turns a flattened point sequence into the fixed-size numeric feature vector
//! the regressor consumes, plus the observed completion time when the track is
//! fully timestamped.
//!
//! ## Pipeline
//! 1. Per consecutive point pair, compute the 3D step distance (haversine
//!    horizontal component combined with the elevation delta). The first point
//!    gets a leading 0.0 so all per-step series have one entry per point.
//! 2. Per-step elevation change, with missing elevation treated as 0.0 before
//!    differencing (explicit policy, never a crash).
//! 3. Gradient = elevation change / step distance, 0.0 where the step distance
//!    is zero.
//! 4. Trailing moving average (window 5) over elevation and gradient. Partial
//!    windows at the head use however many points are available — no NaN
//!    padding. The smoothed series are kept on [`SegmentProfile`] for
//!    diagnostics; the exported features aggregate the raw series.
//! 5. Aggregate into a [`FeatureVector`] with a fixed key order (see
//!    [`FEATURE_NAMES`]).
//!
//! Fewer than 2 points is not an error: a single-point track yields zero
//! distance and all-zero gradient statistics (the leading 0.0 keeps every
//! series non-empty, so no NaN appears), with `num_points = 1`.
//!
//! Elevation extrema are taken over points that actually carry an elevation;
//! the treat-missing-as-zero policy applies to differencing only.

use geo::{Distance, Haversine, Point};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{PredictorError, TrackPoint};

/// Trailing moving-average window applied to the elevation and gradient series.
pub const SMOOTHING_WINDOW: usize = 5;

/// Exported feature names, in the exact order they appear in every extracted
/// [`FeatureVector`]. This order fixes the column order of the model's input
/// matrix and must be identical between training and prediction.
pub const FEATURE_NAMES: [&str; 11] = [
    "total_distance",
    "total_elevation_gain",
    "total_elevation_loss",
    "avg_gradient",
    "max_gradient",
    "min_gradient",
    "std_gradient",
    "max_elevation",
    "min_elevation",
    "elevation_range",
    "num_points",
];

// ============================================================================
// Feature Vector
// ============================================================================

/// An insertion-ordered mapping of feature name to value.
///
/// The key order is significant: it defines the column order of the regressor's
/// input matrix. [`project`](FeatureVector::project) turns the mapping into a
/// plain row in a caller-supplied order, failing on schema drift instead of
/// silently reordering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature, appending it to the key order. Re-inserting an
    /// existing name overwrites the value in place and keeps its position.
    pub fn insert(&mut self, name: &str, value: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name.to_string(), value));
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Feature names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a row of values in exactly the given name order.
    ///
    /// Returns [`PredictorError::MissingFeature`] for the first name that is
    /// absent from this vector.
    pub fn project(&self, names: &[String]) -> Result<Vec<f64>, PredictorError> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| PredictorError::MissingFeature(name.clone()))
            })
            .collect()
    }
}

// Serializes as a JSON object with keys in insertion order, so the boundary
// layer can emit features without learning about the internal representation.
impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Segment Profile
// ============================================================================

/// Per-step series derived from a point sequence.
///
/// All series have exactly one entry per input point (leading zeros for the
/// diff-based ones), so indexes line up across them.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentProfile {
    /// 3D step distance in meters, `[0]` is always 0.0.
    pub distance_diff: Vec<f64>,
    /// Per-step elevation change in meters, `[0]` is always 0.0.
    pub elevation_diff: Vec<f64>,
    /// Elevation change per meter of 3D step distance, 0.0 on zero-length steps.
    pub gradient: Vec<f64>,
    /// Elevation smoothed with the trailing moving average.
    pub smoothed_elevation: Vec<f64>,
    /// Gradient smoothed with the trailing moving average.
    pub smoothed_gradient: Vec<f64>,
}

/// Compute the per-step series for a point sequence.
pub fn segment_profile(points: &[TrackPoint]) -> SegmentProfile {
    let n = points.len();
    let elevations: Vec<f64> = points.iter().map(|p| p.elevation.unwrap_or(0.0)).collect();

    let mut distance_diff = Vec::with_capacity(n);
    let mut elevation_diff = Vec::with_capacity(n);
    let mut gradient = Vec::with_capacity(n);

    for (i, point) in points.iter().enumerate() {
        if i == 0 {
            distance_diff.push(0.0);
            elevation_diff.push(0.0);
            gradient.push(0.0);
            continue;
        }

        let step = step_distance_3d(&points[i - 1], point);
        let climb = elevations[i] - elevations[i - 1];
        distance_diff.push(step);
        elevation_diff.push(climb);
        gradient.push(if step > 0.0 { climb / step } else { 0.0 });
    }

    let smoothed_elevation = moving_average(&elevations, SMOOTHING_WINDOW);
    let smoothed_gradient = moving_average(&gradient, SMOOTHING_WINDOW);

    SegmentProfile {
        distance_diff,
        elevation_diff,
        gradient,
        smoothed_elevation,
        smoothed_gradient,
    }
}

/// 3D distance between two consecutive points in meters.
///
/// Combines the haversine great-circle distance with the elevation delta.
/// Missing elevation counts as 0.0, consistent with the differencing policy.
#[inline]
pub fn step_distance_3d(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let horizontal = Haversine::distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    );
    let vertical = b.elevation.unwrap_or(0.0) - a.elevation.unwrap_or(0.0);
    (horizontal * horizontal + vertical * vertical).sqrt()
}

/// Trailing moving average with partial windows at the head.
///
/// `out[i]` is the mean of `series[i.saturating_sub(window - 1)..=i]`, so the
/// output has the same length as the input and contains no NaN padding.
pub fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return series.to_vec();
    }

    series
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = i.saturating_sub(window - 1);
            let slice = &series[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

// ============================================================================
// Aggregation
// ============================================================================

/// Extract the fixed-order feature vector for a point sequence.
///
/// Keys always appear in [`FEATURE_NAMES`] order. Degenerate inputs (0 or 1
/// points) produce zeroed distance and gradient statistics rather than errors.
pub fn extract_features(points: &[TrackPoint]) -> FeatureVector {
    let profile = segment_profile(points);

    let total_distance: f64 = profile.distance_diff.iter().sum();
    let total_elevation_gain: f64 = profile
        .elevation_diff
        .iter()
        .filter(|&&d| d > 0.0)
        .sum();
    let total_elevation_loss: f64 = profile
        .elevation_diff
        .iter()
        .filter(|&&d| d < 0.0)
        .sum::<f64>()
        .abs();

    let (avg_gradient, max_gradient, min_gradient, std_gradient) =
        series_stats(&profile.gradient);

    // Extrema skip points without an elevation reading; a track with no
    // elevation data at all reports flat extrema.
    let mut max_elevation = f64::NEG_INFINITY;
    let mut min_elevation = f64::INFINITY;
    let mut has_elevation = false;
    for elevation in points.iter().filter_map(|p| p.elevation) {
        max_elevation = max_elevation.max(elevation);
        min_elevation = min_elevation.min(elevation);
        has_elevation = true;
    }
    if !has_elevation {
        max_elevation = 0.0;
        min_elevation = 0.0;
    }

    let mut features = FeatureVector::new();
    features.insert("total_distance", total_distance);
    features.insert("total_elevation_gain", total_elevation_gain);
    features.insert("total_elevation_loss", total_elevation_loss);
    features.insert("avg_gradient", avg_gradient);
    features.insert("max_gradient", max_gradient);
    features.insert("min_gradient", min_gradient);
    features.insert("std_gradient", std_gradient);
    features.insert("max_elevation", max_elevation);
    features.insert("min_elevation", min_elevation);
    features.insert("elevation_range", max_elevation - min_elevation);
    features.insert("num_points", points.len() as f64);
    features
}

/// Mean, max, min and population standard deviation of a series.
/// An empty series reports all zeros.
fn series_stats(series: &[f64]) -> (f64, f64, f64, f64) {
    if series.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }

    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let variance = series.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

    (mean, max, min, variance.sqrt())
}

/// Observed completion time in minutes, if the track can serve as a label.
///
/// Returns `Some((max timestamp − min timestamp) in minutes)` when every point
/// carries a timestamp, `None` otherwise. A `None` means the submission cannot
/// be used for training but is still fine for prediction.
pub fn completion_time_minutes(points: &[TrackPoint]) -> Option<f64> {
    let mut earliest = None;
    let mut latest = None;

    for point in points {
        let t = point.time?;
        earliest = Some(earliest.map_or(t, |e| if t < e { t } else { e }));
        latest = Some(latest.map_or(t, |l| if t > l { t } else { l }));
    }

    let (earliest, latest) = (earliest?, latest?);
    Some((latest - earliest).as_seconds_f64() / 60.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn pt(lat: f64, lon: f64, ele: Option<f64>, unix_secs: Option<i64>) -> TrackPoint {
        TrackPoint {
            latitude: lat,
            longitude: lon,
            elevation: ele,
            time: unix_secs.map(|s| OffsetDateTime::from_unix_timestamp(s).unwrap()),
        }
    }

    /// ~50m of longitude at the equator (1 deg ≈ 111,195m for the mean-radius
    /// sphere the haversine implementation uses).
    const LON_50M: f64 = 50.0 / 111_194.9;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_moving_average_partial_head_windows() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let smoothed = moving_average(&series, 5);
        assert_eq!(smoothed, vec![1.0, 1.5, 2.0, 2.5, 3.0, 4.0]);
        assert!(smoothed.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_moving_average_window_larger_than_series() {
        let smoothed = moving_average(&[2.0, 4.0], 5);
        assert_eq!(smoothed, vec![2.0, 3.0]);
    }

    #[test]
    fn test_step_distance_combines_elevation() {
        let a = pt(0.0, 0.0, Some(0.0), None);
        let b = pt(0.0, LON_50M, Some(50.0), None);
        // 50m horizontal + 50m vertical -> ~70.7m
        let dist = step_distance_3d(&a, &b);
        assert!(approx_eq(dist, 50.0 * 2f64.sqrt(), 0.5), "got {dist}");
    }

    #[test]
    fn test_profile_series_have_one_entry_per_point() {
        let points = vec![
            pt(0.0, 0.0, Some(100.0), None),
            pt(0.0, LON_50M, Some(150.0), None),
            pt(0.0, 2.0 * LON_50M, Some(120.0), None),
        ];
        let profile = segment_profile(&points);

        assert_eq!(profile.distance_diff.len(), 3);
        assert_eq!(profile.elevation_diff.len(), 3);
        assert_eq!(profile.gradient.len(), 3);
        assert_eq!(profile.smoothed_elevation.len(), 3);
        assert_eq!(profile.smoothed_gradient.len(), 3);

        assert_eq!(profile.distance_diff[0], 0.0);
        assert_eq!(profile.elevation_diff[0], 0.0);
        assert!(approx_eq(profile.elevation_diff[1], 50.0, 1e-9));
        assert!(approx_eq(profile.elevation_diff[2], -30.0, 1e-9));
        assert!(profile.gradient[1] > 0.0);
        assert!(profile.gradient[2] < 0.0);
    }

    #[test]
    fn test_zero_length_step_has_zero_gradient() {
        let points = vec![
            pt(10.0, 10.0, Some(200.0), None),
            pt(10.0, 10.0, Some(200.0), None),
        ];
        let profile = segment_profile(&points);
        assert_eq!(profile.distance_diff[1], 0.0);
        assert_eq!(profile.gradient[1], 0.0);
    }

    #[test]
    fn test_feature_order_is_fixed() {
        let points = vec![pt(0.0, 0.0, Some(10.0), None)];
        let features = extract_features(&points);
        let names: Vec<&str> = features.names().collect();
        assert_eq!(names, FEATURE_NAMES.to_vec());
    }

    #[test]
    fn test_single_point_is_degenerate_not_an_error() {
        let features = extract_features(&[pt(47.0, 8.0, Some(300.0), None)]);
        assert_eq!(features.get("total_distance"), Some(0.0));
        assert_eq!(features.get("avg_gradient"), Some(0.0));
        assert_eq!(features.get("std_gradient"), Some(0.0));
        assert_eq!(features.get("max_elevation"), Some(300.0));
        assert_eq!(features.get("elevation_range"), Some(0.0));
        assert_eq!(features.get("num_points"), Some(1.0));
        assert!(features.iter().all(|(_, v)| v.is_finite()));
    }

    #[test]
    fn test_empty_sequence_yields_zeroed_features() {
        let features = extract_features(&[]);
        assert_eq!(features.get("total_distance"), Some(0.0));
        assert_eq!(features.get("num_points"), Some(0.0));
        assert!(features.iter().all(|(_, v)| v.is_finite()));
    }

    #[test]
    fn test_gain_and_loss_split_signed_changes() {
        let points = vec![
            pt(0.0, 0.0, Some(100.0), None),
            pt(0.0, LON_50M, Some(150.0), None),
            pt(0.0, 2.0 * LON_50M, Some(120.0), None),
            pt(0.0, 3.0 * LON_50M, Some(160.0), None),
        ];
        let features = extract_features(&points);
        assert!(approx_eq(features.get("total_elevation_gain").unwrap(), 90.0, 1e-9));
        assert!(approx_eq(features.get("total_elevation_loss").unwrap(), 30.0, 1e-9));
        assert_eq!(features.get("max_elevation"), Some(160.0));
        assert_eq!(features.get("min_elevation"), Some(100.0));
        assert_eq!(features.get("elevation_range"), Some(60.0));
    }

    #[test]
    fn test_missing_elevation_is_zero_for_differencing_only() {
        let points = vec![
            pt(0.0, 0.0, None, None),
            pt(0.0, LON_50M, Some(100.0), None),
        ];
        let features = extract_features(&points);
        // Differencing saw 0 -> 100.
        assert!(approx_eq(features.get("total_elevation_gain").unwrap(), 100.0, 1e-9));
        // Extrema only saw the single real reading.
        assert_eq!(features.get("min_elevation"), Some(100.0));
        assert_eq!(features.get("max_elevation"), Some(100.0));
    }

    #[test]
    fn test_completion_time_requires_every_timestamp() {
        let full = vec![
            pt(0.0, 0.0, None, Some(0)),
            pt(0.0, LON_50M, None, Some(60)),
            pt(0.0, 2.0 * LON_50M, None, Some(120)),
        ];
        assert_eq!(completion_time_minutes(&full), Some(2.0));

        let partial = vec![pt(0.0, 0.0, None, Some(0)), pt(0.0, LON_50M, None, None)];
        assert_eq!(completion_time_minutes(&partial), None);

        assert_eq!(completion_time_minutes(&[]), None);
    }

    #[test]
    fn test_completion_time_uses_extrema_not_endpoints() {
        // Out-of-order timestamps still yield max - min.
        let points = vec![
            pt(0.0, 0.0, None, Some(300)),
            pt(0.0, LON_50M, None, Some(0)),
            pt(0.0, 2.0 * LON_50M, None, Some(180)),
        ];
        assert_eq!(completion_time_minutes(&points), Some(5.0));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let points = vec![
            pt(0.0, 0.0, Some(100.0), None),
            pt(0.0, LON_50M, Some(150.0), None),
            pt(0.0, 2.0 * LON_50M, Some(120.0), None),
        ];
        assert_eq!(extract_features(&points), extract_features(&points));
    }

    #[test]
    fn test_project_orders_values_and_flags_missing() {
        let mut features = FeatureVector::new();
        features.insert("a", 1.0);
        features.insert("b", 2.0);

        let names = vec!["b".to_string(), "a".to_string()];
        assert_eq!(features.project(&names).unwrap(), vec![2.0, 1.0]);

        let missing = vec!["c".to_string()];
        let err = features.project(&missing).unwrap_err();
        assert!(matches!(err, PredictorError::MissingFeature(name) if name == "c"));
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut features = FeatureVector::new();
        features.insert("a", 1.0);
        features.insert("b", 2.0);
        features.insert("a", 9.0);

        let names: Vec<&str> = features.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(features.get("a"), Some(9.0));
    }

    #[test]
    fn test_feature_vector_serializes_as_ordered_map() {
        let mut features = FeatureVector::new();
        features.insert("total_distance", 1.5);
        features.insert("num_points", 3.0);

        let json = serde_json::to_string(&features).unwrap();
        assert_eq!(json, r#"{"total_distance":1.5,"num_points":3.0}"#);
    }
}
