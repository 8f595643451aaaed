//! # Track-Log Parsing
//!
//! Decodes a GPX track log into the flat, ordered point sequence the rest of
//! the pipeline works on.
//!
//! GPX groups points into tracks, each made of segments. The feature extractor
//! does not care about that structure, so all segment points across all tracks
//! are concatenated in source order. Segment boundaries are NOT specially
//! marked: the step between the last point of one segment and the first point
//! of the next is computed as if the two were contiguous. For recorded hikes
//! (where a segment break usually means a paused watch) this slightly inflates
//! distance; it matches the reference behavior and is a documented limitation.
//!
//! Standalone waypoints (`<wpt>`) and routes (`<rte>`) are ignored — only
//! `<trk>` content describes the walked route.

use log::{debug, warn};
use time::OffsetDateTime;

use crate::{PredictorError, TrackPoint};

/// Parse raw GPX bytes into a flattened, ordered point sequence.
///
/// Returns [`PredictorError::Parse`] when the content is not valid GPX.
/// An empty `<trk>` (or a GPX file without tracks) parses successfully into an
/// empty sequence; downstream stages handle that degenerately rather than
/// treating it as a syntax error.
///
/// # Example
/// ```
/// use hike_predictor::track_log::parse_track_log;
///
/// let gpx = br#"<?xml version="1.0" encoding="UTF-8"?>
/// <gpx version="1.1" creator="unit-test" xmlns="http://www.topografix.com/GPX/1/1">
///   <trk><trkseg>
///     <trkpt lat="47.3769" lon="8.5417"><ele>408.0</ele></trkpt>
///     <trkpt lat="47.3775" lon="8.5421"><ele>412.5</ele></trkpt>
///   </trkseg></trk>
/// </gpx>"#;
///
/// let points = parse_track_log(gpx).unwrap();
/// assert_eq!(points.len(), 2);
/// assert_eq!(points[0].elevation, Some(408.0));
/// ```
pub fn parse_track_log(raw: &[u8]) -> Result<Vec<TrackPoint>, PredictorError> {
    let gpx = gpx::read(raw)?;

    let mut points = Vec::new();
    for track in &gpx.tracks {
        for segment in &track.segments {
            for waypoint in &segment.points {
                let position = waypoint.point();
                let point = TrackPoint {
                    latitude: position.y(),
                    longitude: position.x(),
                    elevation: waypoint.elevation,
                    time: waypoint.time.map(OffsetDateTime::from),
                };
                if !point.is_valid() {
                    // Kept anyway: the sequence must mirror the source track.
                    warn!(
                        "[TrackLog] Point {} has out-of-range coordinates ({}, {})",
                        points.len(),
                        point.latitude,
                        point.longitude
                    );
                }
                points.push(point);
            }
        }
    }

    debug!(
        "[TrackLog] Parsed {} points from {} track(s)",
        points.len(),
        gpx.tracks.len()
    );

    Ok(points)
}
