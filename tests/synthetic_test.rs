use multiview_match::observation::ObservationSource;
use multiview_match::synthetic::{SyntheticConfig, SyntheticSource};
use multiview_match::{DedupPolicy, assemble_from};
use nalgebra as na;
use tempfile::TempDir;

/// Pinhole cameras at x = offset looking down +z, 1000 px focal length.
fn camera_row(offsets: &[f64]) -> Vec<na::Matrix3x4<f64>> {
    let k = na::Matrix3::new(1000.0, 0.0, 960.0, 0.0, 1000.0, 540.0, 0.0, 0.0, 1.0);
    offsets
        .iter()
        .map(|x| {
            let rt = na::Matrix3x4::new(
                1.0, 0.0, 0.0, -x, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0,
            );
            k * rt
        })
        .collect()
}

fn small_config() -> SyntheticConfig {
    SyntheticConfig {
        max_points: 50,
        box_range: [[-500, 500], [-300, 300], [2000, 3000]],
        seed: 7,
        ..Default::default()
    }
}

#[test]
fn test_tracks_are_covisible() {
    let source = SyntheticSource::new(camera_row(&[0.0, 100.0, 200.0]), small_config()).unwrap();
    let tracks = source.observations().unwrap();
    assert_eq!(tracks.len(), 50);
    for t in &tracks {
        assert_eq!(t.num_cameras(), 3);
        assert!(t.track_length() >= 2);
        for p in t.pixel_points.iter().flatten() {
            assert!(p.x >= 0.0 && p.x < 1920.0);
            assert!(p.y >= 0.0 && p.y < 1080.0);
        }
    }
}

#[test]
fn test_same_seed_same_observations() {
    let source = SyntheticSource::new(camera_row(&[0.0, 100.0]), small_config()).unwrap();
    assert_eq!(source.observations().unwrap(), source.observations().unwrap());

    let other = SyntheticSource::new(
        camera_row(&[0.0, 100.0]),
        SyntheticConfig {
            seed: 8,
            ..small_config()
        },
    )
    .unwrap();
    assert_ne!(source.observations().unwrap(), other.observations().unwrap());
}

#[test]
fn test_track_range_limits_length() {
    let config = SyntheticConfig {
        track_range: Some([2, 3]),
        ..small_config()
    };
    let cameras = camera_row(&[0.0, 50.0, 100.0, 150.0, 200.0]);
    let source = SyntheticSource::new(cameras, config).unwrap();
    for t in source.observations().unwrap() {
        let len = t.track_length();
        assert!((2..=3).contains(&len), "track length {}", len);
    }
}

#[test]
fn test_unreachable_points_give_up() {
    let config = SyntheticConfig {
        max_points: 1,
        // every point sits behind the cameras
        box_range: [[0, 10], [0, 10], [-100, -50]],
        max_attempts: 20,
        ..Default::default()
    };
    let source = SyntheticSource::new(camera_row(&[0.0, 100.0]), config).unwrap();
    assert!(source.observations().is_err());
}

#[test]
fn test_projections_from_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("projections.json");
    let rows: Vec<[[f64; 4]; 3]> = camera_row(&[0.0, 100.0])
        .iter()
        .map(|p| -> [[f64; 4]; 3] { std::array::from_fn(|i| std::array::from_fn(|j| p[(i, j)])) })
        .collect();
    std::fs::write(&path, serde_json::to_string(&rows).unwrap()).unwrap();

    let source = SyntheticSource::from_json_file(&path, small_config()).unwrap();
    assert_eq!(source.num_cameras(), 2);
    let corr = assemble_from(&source, DedupPolicy::Exact).unwrap();
    assert_eq!(corr.pair_matches(0, 1).len(), 50);
}
