use std::path::{Path, PathBuf};

use aprilgrid::detector::TagDetector;
use glam::Vec2;
use glob::glob;
use image::{DynamicImage, ImageReader};
use indicatif::ParallelProgressIterator;
use log::{debug, trace, warn};
use rayon::prelude::*;
use rerun::TimeCell;

use crate::board::Board;
use crate::error::{MatchError, Result};
use crate::observation::{ObservationSource, TrackObservation};
use crate::store::ImageIndex;
use crate::visualization::log_detections;

/// One image of one capture group, already resolved to a camera index.
struct GroupImage {
    group: usize,
    camera: usize,
    path: PathBuf,
}

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        for ext in &[".png", ".jpg"] {
            if p.as_os_str().to_string_lossy().ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

fn glob_sorted(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).map_err(|e| MatchError::Config(format!("{}: {}", pattern, e)))?;
    let mut paths: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
    paths.sort();
    Ok(paths)
}

/// Detects board corners in `img` and returns `(board corner index, pixel)`.
fn detect_corners(
    tag_detector: &TagDetector,
    img: &DynamicImage,
    board: &Board,
) -> Vec<(usize, Vec2)> {
    let detected_tag = tag_detector.detect(img);
    detected_tag
        .iter()
        .flat_map(|(tag_id, corners)| {
            corners
                .iter()
                .enumerate()
                .filter_map(|(i, p)| {
                    board
                        .corner_index(*tag_id, i)
                        .map(|corner| (corner, Vec2::new(p.0, p.1)))
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Observations from AprilGrid corners seen in synchronized image groups.
///
/// `root_folder` holds one sub-folder per capture group; each group folder
/// holds one image per camera, named as the image is registered in the
/// database. Corner `c` of group `g` becomes track `g * corners_per_board + c`.
/// Image id `k` fills camera slot `k - 1`, and unless overridden there are as
/// many slots as the largest registered id.
pub struct MarkerSource<'a> {
    root_folder: PathBuf,
    tag_detector: &'a TagDetector,
    board: &'a Board,
    images: &'a ImageIndex,
    num_cameras: usize,
    group_start: usize,
    group_num: Option<usize>,
    recording: Option<&'a rerun::RecordingStream>,
}

impl<'a> MarkerSource<'a> {
    pub fn new<P: AsRef<Path>>(
        root_folder: P,
        tag_detector: &'a TagDetector,
        board: &'a Board,
        images: &'a ImageIndex,
    ) -> MarkerSource<'a> {
        MarkerSource {
            root_folder: root_folder.as_ref().to_path_buf(),
            tag_detector,
            board,
            images,
            num_cameras: images.max_image_id() as usize,
            group_start: 0,
            group_num: None,
            recording: None,
        }
    }

    /// Skips the first `group_start` groups and keeps at most `group_num`.
    pub fn with_groups(mut self, group_start: usize, group_num: Option<usize>) -> Self {
        self.group_start = group_start;
        self.group_num = group_num;
        self
    }

    pub fn with_num_cameras(mut self, num_cameras: usize) -> Self {
        self.num_cameras = num_cameras;
        self
    }

    pub fn with_recording(mut self, recording: &'a rerun::RecordingStream) -> Self {
        self.recording = Some(recording);
        self
    }

    fn group_folders(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!("{}/*", self.root_folder.display());
        let folders = glob_sorted(&pattern)?
            .into_iter()
            .filter(|p| p.is_dir())
            .skip(self.group_start)
            .take(self.group_num.unwrap_or(usize::MAX))
            .collect();
        Ok(folders)
    }

    fn group_images(&self, group: usize, folder: &Path) -> Result<Vec<GroupImage>> {
        let pattern = format!("{}/*", folder.display());
        let paths =
            glob(&pattern).map_err(|e| MatchError::Config(format!("{}: {}", pattern, e)))?;
        let mut images = Vec::new();
        for path in paths.filter_map(img_filter) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.images.index_of(&name) {
                Some(camera) if camera < self.num_cameras => images.push(GroupImage {
                    group,
                    camera,
                    path,
                }),
                Some(camera) => {
                    warn!("{} maps to camera {} beyond {}", name, camera, self.num_cameras)
                }
                None => warn!("{} is not registered in the database, skipped", name),
            }
        }
        images.sort_by_key(|img| img.camera);
        Ok(images)
    }
}

impl ObservationSource for MarkerSource<'_> {
    fn num_cameras(&self) -> usize {
        self.num_cameras
    }

    fn observations(&self) -> Result<Vec<TrackObservation>> {
        let folders = self.group_folders()?;
        let mut jobs = Vec::new();
        for (group, folder) in folders.iter().enumerate() {
            trace!("loading group {}", folder.display());
            jobs.extend(self.group_images(group, folder)?);
        }

        let detections: Vec<(usize, usize, Vec<(usize, Vec2)>)> = jobs
            .par_iter()
            .progress_count(jobs.len() as u64)
            .map(|job| -> Result<(usize, usize, Vec<(usize, Vec2)>)> {
                let img = ImageReader::open(&job.path)?.decode()?;
                let corners = detect_corners(self.tag_detector, &img, self.board);
                trace!("{}: {} corners", job.path.display(), corners.len());
                Ok((job.group, job.camera, corners))
            })
            .collect::<Result<_>>()?;

        let corners_per_board = self.board.corners_per_board();
        let mut tracks =
            vec![TrackObservation::new(self.num_cameras); folders.len() * corners_per_board];
        for (group, camera, corners) in &detections {
            for (corner, p) in corners {
                tracks[group * corners_per_board + corner].fill(*camera, p.x, p.y);
            }
            if let Some(recording) = self.recording {
                recording.set_time("group", TimeCell::from_sequence(*group as i64));
                let topic = format!("cam{}", camera);
                log_detections(
                    recording,
                    &topic,
                    &corners
                        .iter()
                        .map(|(c, p)| (group * corners_per_board + c, *p))
                        .collect::<Vec<_>>(),
                )?;
            }
        }
        debug!(
            "{} groups, {} images, {} track slots",
            folders.len(),
            detections.len(),
            tracks.len()
        );
        Ok(tracks)
    }
}
