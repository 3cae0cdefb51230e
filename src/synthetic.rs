use std::path::Path;

use log::{debug, info};
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::io::object_from_json;
use crate::observation::{ObservationSource, TrackObservation};

/// Points drawn inside the box before ring sampling starts, so the camera
/// array interior always keeps some coverage.
const RING_INTERIOR_POINTS: usize = 100;
const RING_RADIUS: f64 = 40000.0;
const RING_THICKNESS: f64 = 2000.0;
const RING_HEIGHT: f64 = 2500.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub max_points: usize,
    /// Inclusive integer range per axis, x then y then z.
    pub box_range: [[i32; 2]; 3],
    pub image_width: u32,
    pub image_height: u32,
    /// Noise is drawn from `[noise_2d - 1, noise_2d)` per pixel axis.
    pub noise_2d: f64,
    /// Draw points past the first hundred from a ring around the array.
    pub ring: bool,
    /// Inclusive bounds on the number of cameras observing each point.
    pub track_range: Option<[usize; 2]>,
    pub seed: u64,
    /// Redraws allowed for a single point before giving up.
    pub max_attempts: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            max_points: 1000,
            box_range: [[-2000, 2000], [-2000, 2000], [0, 2500]],
            image_width: 1920,
            image_height: 1080,
            noise_2d: 1.0,
            ring: false,
            track_range: None,
            seed: 0,
            max_attempts: 100_000,
        }
    }
}

/// Row-major 3x4 projection matrices as stored on disk.
pub type ProjectionRows = [[f64; 4]; 3];

/// Random 3D points projected through known camera matrices.
pub struct SyntheticSource {
    projections: Vec<na::Matrix3x4<f64>>,
    config: SyntheticConfig,
}

impl SyntheticSource {
    pub fn new(projections: Vec<na::Matrix3x4<f64>>, config: SyntheticConfig) -> Result<Self> {
        if let Some([lo, hi]) = config.track_range {
            if lo > hi || hi > projections.len() {
                return Err(MatchError::Config(format!(
                    "track range [{}, {}] does not fit {} cameras",
                    lo,
                    hi,
                    projections.len()
                )));
            }
        }
        for [lo, hi] in config.box_range {
            if lo > hi {
                return Err(MatchError::Config(format!("empty box range [{}, {}]", lo, hi)));
            }
        }
        Ok(SyntheticSource {
            projections,
            config,
        })
    }

    /// Loads a JSON array of row-major 3x4 projection matrices, one per camera.
    pub fn from_json_file<P: AsRef<Path>>(path: P, config: SyntheticConfig) -> Result<Self> {
        let rows: Vec<ProjectionRows> = object_from_json(path)?;
        let projections = rows
            .iter()
            .map(|r| na::Matrix3x4::from_fn(|i, j| r[i][j]))
            .collect();
        Self::new(projections, config)
    }

    fn draw_point(&self, rng: &mut ChaCha8Rng, index: usize) -> na::Vector4<f64> {
        if self.config.ring && index >= RING_INTERIOR_POINTS {
            let outer = RING_RADIUS + RING_THICKNESS;
            let (x, y) = loop {
                let x: f64 = rng.random_range(-outer..outer);
                let y: f64 = rng.random_range(-outer..outer);
                let r2 = x * x + y * y;
                if r2 >= RING_RADIUS * RING_RADIUS && r2 <= outer * outer {
                    break (x, y);
                }
            };
            let z: f64 = rng.random_range(0.0..RING_HEIGHT);
            na::Vector4::new(x, y, z, 1.0)
        } else {
            let [x, y, z] = self
                .config
                .box_range
                .map(|[lo, hi]| rng.random_range(lo..=hi) as f64);
            na::Vector4::new(x, y, z, 1.0)
        }
    }

    /// Projects `point` into every camera, dropping projections outside the
    /// image or behind the camera.
    fn project(&self, rng: &mut ChaCha8Rng, point: &na::Vector4<f64>) -> TrackObservation {
        let noise = self.config.noise_2d;
        let mut track = TrackObservation::new(self.projections.len());
        for (cam, p) in self.projections.iter().enumerate() {
            let uvw = p * point;
            let du: f64 = rng.random_range(noise - 1.0..noise);
            let dv: f64 = rng.random_range(noise - 1.0..noise);
            if uvw.z <= 0.0 {
                continue;
            }
            let u = uvw.x / uvw.z + du;
            let v = uvw.y / uvw.z + dv;
            if u >= 0.0
                && v >= 0.0
                && u < self.config.image_width as f64
                && v < self.config.image_height as f64
            {
                track.fill(cam, u as f32, v as f32);
            }
        }
        track
    }

    /// Blanks random observing cameras until the track length lies in `[lo, hi]`.
    fn limit_track_length(
        &self,
        rng: &mut ChaCha8Rng,
        track: &mut TrackObservation,
        lo: usize,
        hi: usize,
    ) {
        let visible: Vec<usize> = (0..track.num_cameras())
            .filter(|&i| track.pixel_points[i].is_some())
            .collect();
        let keep = rng.random_range(lo..=hi);
        for idx in rand::seq::index::sample(rng, visible.len(), visible.len() - keep) {
            track.pixel_points[visible[idx]] = None;
        }
    }
}

impl ObservationSource for SyntheticSource {
    fn num_cameras(&self) -> usize {
        self.projections.len()
    }

    fn observations(&self) -> Result<Vec<TrackObservation>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut tracks = Vec::with_capacity(self.config.max_points);
        let mut redraws = 0;
        for index in 0..self.config.max_points {
            let mut attempts = 0;
            let track = loop {
                attempts += 1;
                if attempts > self.config.max_attempts {
                    return Err(MatchError::Config(format!(
                        "point {} not co-visible after {} attempts",
                        index, self.config.max_attempts
                    )));
                }
                let point = self.draw_point(&mut rng, index);
                let mut track = self.project(&mut rng, &point);
                let length = track.track_length();
                match self.config.track_range {
                    None if length >= 2 => break track,
                    None => {}
                    Some([lo, _]) if length < lo => {}
                    Some([_, hi]) if length <= hi => break track,
                    Some([lo, hi]) => {
                        self.limit_track_length(&mut rng, &mut track, lo, hi);
                        break track;
                    }
                }
            };
            redraws += attempts - 1;
            tracks.push(track);
        }
        debug!("{} redraws", redraws);
        info!(
            "generated {} synthetic tracks over {} cameras",
            tracks.len(),
            self.projections.len()
        );
        Ok(tracks)
    }
}
