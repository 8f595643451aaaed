//! Basic example of training the predictor and estimating a hike's duration.
//!
//! Run with: cargo run --example basic_prediction

use hike_predictor::HikePredictor;

/// ~50m of longitude at the equator.
const LON_50M: f64 = 50.0 / 111_194.9;

fn gpx_track(name: &str, minutes_per_step: f64, steps: usize, climb_per_step: f64) -> Vec<u8> {
    let mut body = String::from("<trk><trkseg>\n");
    for i in 0..steps {
        let lon = i as f64 * LON_50M;
        let ele = 400.0 + i as f64 * climb_per_step;
        let total_secs = (i as f64 * minutes_per_step * 60.0) as u64;
        let (h, m, s) = (8 + total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60);
        body.push_str(&format!(
            r#"<trkpt lat="0.0" lon="{lon:.10}"><ele>{ele}</ele><time>2024-06-01T{h:02}:{m:02}:{s:02}Z</time></trkpt>"#,
        ));
        body.push('\n');
    }
    body.push_str("</trkseg></trk>");
    println!("Built synthetic track '{name}': {steps} points");

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="hike-predictor-demo" xmlns="http://www.topografix.com/GPX/1/1">
{body}
</gpx>"#
    )
    .into_bytes()
}

fn main() {
    let mut predictor = HikePredictor::new();

    // Train on three synthetic hikes of varying steepness and pace.
    let hikes = [
        ("easy-valley.gpx", gpx_track("easy-valley", 0.5, 40, 2.0)),
        ("ridge-walk.gpx", gpx_track("ridge-walk", 0.8, 40, 8.0)),
        ("steep-summit.gpx", gpx_track("steep-summit", 1.2, 40, 15.0)),
    ];

    println!("\nTraining:");
    for (name, raw) in &hikes {
        let example = predictor
            .add_training_example(name, raw)
            .expect("training submission failed");
        println!(
            "  {} -> {:.0} min observed, {:.0}m distance, {:.0}m gain",
            example.name,
            example.completion_time,
            example.features.get("total_distance").unwrap_or(0.0),
            example.features.get("total_elevation_gain").unwrap_or(0.0),
        );
    }

    // An unlabeled route of intermediate steepness.
    let query = {
        let mut body = String::from("<trk><trkseg>\n");
        for i in 0..40 {
            let lon = i as f64 * LON_50M;
            let ele = 400.0 + i as f64 * 6.0;
            body.push_str(&format!(
                r#"<trkpt lat="0.0" lon="{lon:.10}"><ele>{ele}</ele></trkpt>"#
            ));
            body.push('\n');
        }
        body.push_str("</trkseg></trk>");
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="hike-predictor-demo" xmlns="http://www.topografix.com/GPX/1/1">
{body}
</gpx>"#
        )
        .into_bytes()
    };

    let prediction = predictor.predict(&query).expect("prediction failed");
    println!(
        "\nEstimated completion time for the unlabeled route: {:.1} min",
        prediction.estimated_time
    );

    println!(
        "Training set holds {} example(s)",
        predictor.training_examples().len()
    );
}
