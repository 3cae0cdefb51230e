use std::borrow::Cow;

use log::{debug, info, trace};

use crate::error::{MatchError, Result};
use crate::keypoints::{DedupPolicy, KeypointTable};
use crate::observation::{ObservationSource, TrackObservation};
use crate::pair_id::MAX_IMAGE_ID;

/// Keypoint ids of one track as seen by two cameras.
pub type PointMatch = (u32, u32);

/// Keypoints and outgoing matches of a single camera.
#[derive(Debug, Clone)]
pub struct CameraRecord {
    image_id: u32,
    keypoints: KeypointTable,
    /// `matches[j]` holds matches to camera index `j`; only `j` greater than
    /// this camera's own index is populated.
    matches: Vec<Vec<PointMatch>>,
}

impl CameraRecord {
    fn new(image_id: u32, num_cameras: usize, policy: DedupPolicy) -> CameraRecord {
        CameraRecord {
            image_id,
            keypoints: KeypointTable::new(policy),
            matches: vec![Vec::new(); num_cameras],
        }
    }

    /// 1-based database image id.
    pub fn image_id(&self) -> u32 {
        self.image_id
    }

    pub fn keypoints(&self) -> &KeypointTable {
        &self.keypoints
    }
}

/// Result of assembling track observations: one record per camera.
#[derive(Debug, Clone)]
pub struct Correspondences {
    cameras: Vec<CameraRecord>,
}

impl Correspondences {
    pub fn num_cameras(&self) -> usize {
        self.cameras.len()
    }

    pub fn cameras(&self) -> &[CameraRecord] {
        &self.cameras
    }

    pub fn camera(&self, index: usize) -> Option<&CameraRecord> {
        self.cameras.get(index)
    }

    /// Matches between camera indices `a` and `b`, first component in `a`.
    ///
    /// Only the `a < b` orientation is stored; the other one is produced by
    /// swapping each tuple.
    ///
    /// # Panics
    ///
    /// Panics if `a` or `b` is not below [`Correspondences::num_cameras`].
    pub fn pair_matches(&self, a: usize, b: usize) -> Cow<'_, [PointMatch]> {
        if a < b {
            Cow::Borrowed(&self.cameras[a].matches[b])
        } else if a > b {
            Cow::Owned(
                self.cameras[b].matches[a]
                    .iter()
                    .map(|&(ib, ia)| (ia, ib))
                    .collect(),
            )
        } else {
            Cow::Borrowed(&[])
        }
    }

    /// Every unordered camera pair `(i, j)` with `i < j`, including pairs
    /// without matches, in row-major order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, &[PointMatch])> + '_ {
        let n = self.cameras.len();
        (0..n).flat_map(move |i| {
            ((i + 1)..n).map(move |j| (i, j, self.cameras[i].matches[j].as_slice()))
        })
    }

    pub fn total_matches(&self) -> usize {
        self.pairs().map(|(_, _, m)| m.len()).sum()
    }
}

/// Assigns keypoint ids per camera and collects pairwise matches.
///
/// Tracks are consumed in iteration order, which fixes both the keypoint id
/// assignment and the order of tuples within every pair.
pub fn assemble<'a, I>(
    tracks: I,
    num_cameras: usize,
    policy: DedupPolicy,
) -> Result<Correspondences>
where
    I: IntoIterator<Item = &'a TrackObservation>,
{
    if num_cameras == 0 {
        return Err(MatchError::NoCameras);
    }
    if num_cameras as u64 >= MAX_IMAGE_ID {
        return Err(MatchError::CameraIdOutOfRange(num_cameras as u64));
    }
    policy.validate()?;

    let mut cameras: Vec<CameraRecord> = (0..num_cameras)
        .map(|i| CameraRecord::new(i as u32 + 1, num_cameras, policy))
        .collect();

    let mut ids: Vec<Option<u32>> = vec![None; num_cameras];
    let mut num_tracks = 0;
    for (track_idx, track) in tracks.into_iter().enumerate() {
        if track.num_cameras() != num_cameras {
            return Err(MatchError::TrackLength {
                track: track_idx,
                expected: num_cameras,
                found: track.num_cameras(),
            });
        }
        trace!("track {}: {}", track_idx, track);
        for (cam_idx, p) in track.pixel_points.iter().enumerate() {
            ids[cam_idx] = p.map(|p| cameras[cam_idx].keypoints.lookup_or_insert(p).0);
        }
        for i in 0..num_cameras {
            let Some(id_i) = ids[i] else {
                continue;
            };
            for j in (i + 1)..num_cameras {
                if let Some(id_j) = ids[j] {
                    cameras[i].matches[j].push((id_i, id_j));
                }
            }
        }
        num_tracks += 1;
    }

    let correspondences = Correspondences { cameras };
    info!(
        "assembled {} tracks over {} cameras into {} matches",
        num_tracks,
        num_cameras,
        correspondences.total_matches()
    );
    for c in correspondences.cameras() {
        debug!("image {}: {} keypoints", c.image_id, c.keypoints.len());
    }
    Ok(correspondences)
}

/// Pulls the full observation list from `source` and assembles it.
pub fn assemble_from<S: ObservationSource + ?Sized>(
    source: &S,
    policy: DedupPolicy,
) -> Result<Correspondences> {
    let tracks = source.observations()?;
    assemble(&tracks, source.num_cameras(), policy)
}
