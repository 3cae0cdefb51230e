use multiview_match::io::{render_track_dump, write_track_dump};
use multiview_match::observation::TrackObservation;
use tempfile::TempDir;

#[test]
fn test_track_dump_lists_every_slot() {
    let tracks = vec![
        TrackObservation::from_raw(&[(1.5, 2.0), (-1.0, -1.0), (3.0, 4.0)]),
        TrackObservation::from_raw(&[(-1.0, -1.0), (7.0, 8.25), (-1.0, -1.0)]),
    ];
    assert_eq!(
        render_track_dump(&tracks),
        "(1.5, 2) | (-1, -1) | (3, 4)\n(-1, -1) | (7, 8.25) | (-1, -1)\n"
    );

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tracks.txt");
    write_track_dump(&path, &tracks).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), render_track_dump(&tracks));
}
