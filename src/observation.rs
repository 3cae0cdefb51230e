use std::fmt;

use glam::Vec2;

use crate::error::Result;

/// One physical 3D point and where each camera saw it.
///
/// `pixel_points[i]` is the pixel coordinate in camera `i`, or `None` when
/// that camera did not observe the point.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackObservation {
    pub pixel_points: Vec<Option<Vec2>>,
}

impl TrackObservation {
    /// An observation with every camera slot empty.
    pub fn new(num_cameras: usize) -> TrackObservation {
        TrackObservation {
            pixel_points: vec![None; num_cameras],
        }
    }

    /// Builds an observation from raw `(u, v)` slots where a negative `u`
    /// marks the camera as not observing the point.
    pub fn from_raw(raw: &[(f32, f32)]) -> TrackObservation {
        TrackObservation {
            pixel_points: raw
                .iter()
                .map(|&(u, v)| if u < 0.0 { None } else { Some(Vec2::new(u, v)) })
                .collect(),
        }
    }

    /// Records the pixel seen by `view`. Negative coordinates clear the slot.
    pub fn fill(&mut self, view: usize, u: f32, v: f32) {
        self.pixel_points[view] = if u < 0.0 { None } else { Some(Vec2::new(u, v)) };
    }

    pub fn num_cameras(&self) -> usize {
        self.pixel_points.len()
    }

    /// Number of cameras observing this track.
    pub fn track_length(&self) -> usize {
        self.pixel_points.iter().filter(|p| p.is_some()).count()
    }
}

/// Slots as `(u, v)` separated by ` | `, absent ones as `(-1, -1)`.
impl fmt::Display for TrackObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.pixel_points.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            match p {
                Some(p) => write!(f, "({}, {})", p.x, p.y)?,
                None => write!(f, "(-1, -1)")?,
            }
        }
        Ok(())
    }
}

/// Anything that yields a finite list of track observations for a fixed
/// number of cameras. Calling [`ObservationSource::observations`] again must
/// produce the same sequence.
pub trait ObservationSource {
    fn num_cameras(&self) -> usize;
    fn observations(&self) -> Result<Vec<TrackObservation>>;
}

/// Observations that are already materialized.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    pub num_cameras: usize,
    pub tracks: Vec<TrackObservation>,
}

impl ObservationSource for InMemorySource {
    fn num_cameras(&self) -> usize {
        self.num_cameras
    }

    fn observations(&self) -> Result<Vec<TrackObservation>> {
        Ok(self.tracks.clone())
    }
}
