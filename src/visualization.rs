use glam::Vec2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::RecordingStream;

use crate::assembler::Correspondences;
use crate::store::ImageIndex;

pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

/// Logs detected corners, coloured and labelled by their track slot.
pub fn log_detections(
    recording: &RecordingStream,
    topic: &str,
    detections: &[(usize, Vec2)],
) -> Result<(), rerun::RecordingStreamError> {
    let ((pts, colors), labels): ((Vec<_>, Vec<_>), Vec<_>) = detections
        .iter()
        .map(|(slot, p)| (((p.x, p.y), id_to_color(*slot)), slot.to_string()))
        .unzip();
    let pts = rerun_shift(&pts);
    recording.log(
        format!("{}/pts", topic),
        &rerun::Points2D::new(pts)
            .with_colors(colors)
            .with_labels(labels)
            .with_radii([rerun::Radius::new_ui_points(5.0)]),
    )
}

/// Logs the final keypoint table of every camera, coloured by keypoint id.
pub fn log_keypoints(
    recording: &RecordingStream,
    correspondences: &Correspondences,
    names: &ImageIndex,
) -> Result<(), rerun::RecordingStreamError> {
    for camera in correspondences.cameras() {
        let (pts, colors): (Vec<_>, Vec<_>) = camera
            .keypoints()
            .coordinates()
            .iter()
            .enumerate()
            .map(|(id, p)| ((p.x, p.y), id_to_color(id)))
            .unzip();
        let pts = rerun_shift(&pts);
        recording.log(
            format!("keypoints/{}", names.display_name(camera.image_id())),
            &rerun::Points2D::new(pts)
                .with_colors(colors)
                .with_radii([rerun::Radius::new_ui_points(3.0)]),
        )?;
    }
    Ok(())
}
