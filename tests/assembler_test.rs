use glam::Vec2;
use multiview_match::assembler::assemble;
use multiview_match::keypoints::DedupPolicy;
use multiview_match::observation::{InMemorySource, TrackObservation};
use multiview_match::{MatchError, assemble_from};

fn track(raw: &[(f32, f32)]) -> TrackObservation {
    TrackObservation::from_raw(raw)
}

#[test]
fn test_single_camera_track_has_no_matches() {
    let tracks = vec![track(&[(10.0, 20.0), (-1.0, -1.0)])];
    let corr = assemble(&tracks, 2, DedupPolicy::Exact).unwrap();

    let cam0 = corr.camera(0).unwrap().keypoints();
    assert_eq!(cam0.len(), 1);
    assert_eq!(cam0.lookup(Vec2::new(10.0, 20.0)), Some(0));
    assert!(corr.camera(1).unwrap().keypoints().is_empty());
    assert!(corr.pair_matches(0, 1).is_empty());
    assert_eq!(corr.total_matches(), 0);
}

#[test]
fn test_shared_keypoint_across_tracks() {
    let tracks = vec![
        track(&[(1.0, 1.0), (2.0, 2.0), (-1.0, -1.0)]),
        track(&[(1.0, 1.0), (-1.0, -1.0), (3.0, 3.0)]),
    ];
    let corr = assemble(&tracks, 3, DedupPolicy::Exact).unwrap();

    assert_eq!(corr.camera(0).unwrap().keypoints().len(), 1);
    assert_eq!(corr.pair_matches(0, 1).as_ref(), &[(0, 0)]);
    assert_eq!(corr.pair_matches(0, 2).as_ref(), &[(0, 0)]);
    assert!(corr.pair_matches(1, 2).is_empty());
}

#[test]
fn test_one_tuple_per_covisible_pair() {
    let tracks = vec![
        track(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]),
        track(&[(4.0, 4.0), (-1.0, -1.0), (5.0, 5.0)]),
        track(&[(6.0, 6.0), (7.0, 7.0), (-1.0, -1.0)]),
        track(&[(1.0, 1.0), (8.0, 8.0), (5.0, 5.0)]),
    ];
    let corr = assemble(&tracks, 3, DedupPolicy::Exact).unwrap();

    // track order is preserved per pair, ids come from each camera's table
    assert_eq!(corr.pair_matches(0, 1).as_ref(), &[(0, 0), (2, 1), (0, 2)]);
    assert_eq!(corr.pair_matches(0, 2).as_ref(), &[(0, 0), (1, 1), (0, 1)]);
    assert_eq!(corr.pair_matches(1, 2).as_ref(), &[(0, 0), (2, 1)]);
    assert_eq!(corr.total_matches(), 8);

    for (t, obs) in tracks.iter().enumerate() {
        for (i, j, matches) in corr.pairs() {
            let (Some(pi), Some(pj)) = (obs.pixel_points[i], obs.pixel_points[j]) else {
                continue;
            };
            let expected = (
                corr.camera(i).unwrap().keypoints().lookup(pi).unwrap(),
                corr.camera(j).unwrap().keypoints().lookup(pj).unwrap(),
            );
            assert!(matches.contains(&expected), "track {} missing in {}-{}", t, i, j);
        }
    }
}

#[test]
fn test_reverse_orientation_swaps_tuples() {
    let tracks = vec![
        track(&[(1.0, 1.0), (2.0, 2.0)]),
        track(&[(3.0, 3.0), (2.0, 2.0)]),
    ];
    let corr = assemble(&tracks, 2, DedupPolicy::Exact).unwrap();
    assert_eq!(corr.pair_matches(0, 1).as_ref(), &[(0, 0), (1, 0)]);
    assert_eq!(corr.pair_matches(1, 0).as_ref(), &[(0, 0), (0, 1)]);
    assert!(corr.pair_matches(1, 1).is_empty());
}

#[test]
fn test_pairs_cover_every_camera_pair() {
    let corr = assemble(&Vec::<TrackObservation>::new(), 4, DedupPolicy::Exact).unwrap();
    let pairs: Vec<(usize, usize)> = corr.pairs().map(|(i, j, _)| (i, j)).collect();
    assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
    let ids: Vec<u32> = corr.cameras().iter().map(|c| c.image_id()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn test_track_length_mismatch_names_track() {
    let tracks = vec![
        track(&[(1.0, 1.0), (2.0, 2.0)]),
        track(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]),
    ];
    match assemble(&tracks, 2, DedupPolicy::Exact) {
        Err(MatchError::TrackLength {
            track,
            expected,
            found,
        }) => {
            assert_eq!((track, expected, found), (1, 2, 3));
        }
        other => panic!("unexpected result {:?}", other.map(|c| c.total_matches())),
    }
}

#[test]
fn test_zero_cameras_rejected() {
    assert!(matches!(
        assemble(&Vec::<TrackObservation>::new(), 0, DedupPolicy::Exact),
        Err(MatchError::NoCameras)
    ));
}

#[test]
fn test_camera_count_at_pair_bound_rejected() {
    assert!(matches!(
        assemble(&Vec::<TrackObservation>::new(), 2_147_483_647, DedupPolicy::Exact),
        Err(MatchError::CameraIdOutOfRange(2_147_483_647))
    ));
}

#[test]
fn test_tolerance_with_extreme_coordinates() {
    let tracks = vec![
        track(&[(1e30, 1e30), (5.0, 5.0)]),
        track(&[(1e30, 1e30), (9.0, 9.0)]),
        track(&[(2e30, 1e30), (5.0, 5.0)]),
    ];
    let corr = assemble(&tracks, 2, DedupPolicy::Tolerance { radius: 1e-30 }).unwrap();
    assert_eq!(corr.camera(0).unwrap().keypoints().len(), 2);
    assert_eq!(corr.camera(1).unwrap().keypoints().len(), 2);
    assert_eq!(corr.pair_matches(0, 1).as_ref(), &[(0, 0), (0, 1), (1, 0)]);
}

#[test]
#[should_panic]
fn test_pair_matches_out_of_range_panics() {
    let tracks = vec![track(&[(1.0, 1.0), (2.0, 2.0)])];
    let corr = assemble(&tracks, 2, DedupPolicy::Exact).unwrap();
    let _ = corr.pair_matches(0, 2);
}

#[test]
fn test_invalid_policy_rejected() {
    let policy = DedupPolicy::Tolerance { radius: -1.0 };
    let result = assemble(&Vec::<TrackObservation>::new(), 2, policy);
    assert!(matches!(result, Err(MatchError::Config(_))));
}

#[test]
fn test_assemble_from_source() {
    let source = InMemorySource {
        num_cameras: 2,
        tracks: vec![track(&[(1.0, 1.0), (2.0, 2.0)])],
    };
    let corr = assemble_from(&source, DedupPolicy::Exact).unwrap();
    assert_eq!(corr.num_cameras(), 2);
    assert_eq!(corr.pair_matches(0, 1).as_ref(), &[(0, 0)]);
}

#[test]
fn test_from_raw_sentinel() {
    let t = track(&[(-1.0, -1.0), (0.0, 0.0), (-0.5, 3.0)]);
    assert_eq!(t.pixel_points, vec![None, Some(Vec2::ZERO), None]);
    assert_eq!(t.track_length(), 1);
}
