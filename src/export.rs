use std::fmt::Write as _;
use std::path::Path;

use glam::Vec2;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::assembler::{Correspondences, PointMatch};
use crate::error::{MatchError, Result};
use crate::keypoints::{DedupPolicy, KeypointTable};
use crate::pair_id::image_ids_to_pair_id;
use crate::store::{
    ImageIndex, KEYPOINTS_TABLE, MATCHES_TABLE, MatchStore, TWO_VIEW_GEOMETRIES_TABLE,
};

/// What the exporter does when a single row fails to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failed key and keep writing the others.
    #[default]
    BestEffort,
    /// Run the export in one transaction and roll back on the first failure.
    Atomic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dedup: DedupPolicy,
    pub failure_policy: FailurePolicy,
    /// Also clear `two_view_geometries`, which would otherwise refer to
    /// keypoint ids from a previous run.
    pub clear_two_view_geometries: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dedup: DedupPolicy::Exact,
            failure_policy: FailurePolicy::BestEffort,
            clear_two_view_geometries: true,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        self.dedup.validate()
    }
}

/// A row that could not be written.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedWrite {
    pub table: String,
    pub key: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub keypoint_rows: usize,
    pub match_rows: usize,
    pub failures: Vec<FailedWrite>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Keypoint coordinates in id order, one `[x, y]` row per keypoint.
pub fn keypoint_rows(table: &KeypointTable) -> Vec<[f32; 2]> {
    table.coordinates().iter().map(|p| [p.x, p.y]).collect()
}

pub fn match_rows(matches: &[PointMatch]) -> Vec<[i32; 2]> {
    matches.iter().map(|&(a, b)| [a as i32, b as i32]).collect()
}

/// Native-endian `f32` pairs, COLMAP's two-column keypoint blob.
pub fn keypoints_blob(table: &KeypointTable) -> Vec<u8> {
    bytemuck::cast_slice(&keypoint_rows(table)).to_vec()
}

/// Native-endian `i32` pairs, COLMAP's match blob.
pub fn matches_blob(matches: &[PointMatch]) -> Vec<u8> {
    bytemuck::cast_slice(&match_rows(matches)).to_vec()
}

pub fn decode_keypoints_blob(data: &[u8]) -> Vec<Vec2> {
    data.chunks_exact(8)
        .map(|c| {
            Vec2::new(
                f32::from_ne_bytes([c[0], c[1], c[2], c[3]]),
                f32::from_ne_bytes([c[4], c[5], c[6], c[7]]),
            )
        })
        .collect()
}

pub fn decode_matches_blob(data: &[u8]) -> Vec<(i32, i32)> {
    data.chunks_exact(8)
        .map(|c| {
            (
                i32::from_ne_bytes([c[0], c[1], c[2], c[3]]),
                i32::from_ne_bytes([c[4], c[5], c[6], c[7]]),
            )
        })
        .collect()
}

/// Renders every camera pair as a `"<name1> <name2>"` header followed by one
/// `"<id1> <id2>"` line per match, blocks separated by a blank line.
pub fn render_match_text(correspondences: &Correspondences, names: &ImageIndex) -> String {
    let cameras = correspondences.cameras();
    let mut s = String::new();
    for (pair_idx, (i, j, matches)) in correspondences.pairs().enumerate() {
        if pair_idx != 0 {
            s.push('\n');
        }
        let _ = writeln!(
            s,
            "{} {}",
            names.display_name(cameras[i].image_id()),
            names.display_name(cameras[j].image_id())
        );
        for (a, b) in matches {
            let _ = writeln!(s, "{} {}", a, b);
        }
    }
    s
}

pub fn write_match_text<P: AsRef<Path>>(
    output_path: P,
    correspondences: &Correspondences,
    names: &ImageIndex,
) -> Result<()> {
    std::fs::write(output_path, render_match_text(correspondences, names))?;
    Ok(())
}

struct Writer<'a, S: MatchStore> {
    store: &'a mut S,
    policy: FailurePolicy,
    report: ExportReport,
}

impl<S: MatchStore> Writer<'_, S> {
    /// Returns `Ok(true)` when the row was written.
    fn write(&mut self, table: &str, key: i64, rows: usize, payload: &[u8]) -> Result<bool> {
        match self.store.upsert_blob(table, key, rows as i32, 2, payload) {
            Ok(()) => Ok(true),
            Err(source) if self.policy == FailurePolicy::BestEffort => {
                error!("failed to write {} key {}: {}", table, key, source);
                self.report.failures.push(FailedWrite {
                    table: table.to_string(),
                    key,
                    message: source.to_string(),
                });
                Ok(false)
            }
            Err(source) => Err(MatchError::Store {
                table: table.to_string(),
                key,
                source,
            }),
        }
    }

    fn clear(&mut self, table: &str) -> Result<()> {
        self.store.delete_all(table).map_err(|source| MatchError::Store {
            table: table.to_string(),
            key: -1,
            source,
        })
    }
}

fn write_all<S: MatchStore>(
    writer: &mut Writer<'_, S>,
    correspondences: &Correspondences,
    clear_two_view_geometries: bool,
) -> Result<()> {
    writer.clear(KEYPOINTS_TABLE)?;
    writer.clear(MATCHES_TABLE)?;
    if clear_two_view_geometries {
        writer.clear(TWO_VIEW_GEOMETRIES_TABLE)?;
    }

    let cameras = correspondences.cameras();
    for camera in cameras {
        let keypoints = camera.keypoints();
        if writer.write(
            KEYPOINTS_TABLE,
            camera.image_id() as i64,
            keypoints.len(),
            &keypoints_blob(keypoints),
        )? {
            writer.report.keypoint_rows += 1;
        }
    }
    for (i, j, matches) in correspondences.pairs() {
        let pair_id = image_ids_to_pair_id(cameras[i].image_id(), cameras[j].image_id());
        if writer.write(MATCHES_TABLE, pair_id as i64, matches.len(), &matches_blob(matches))? {
            writer.report.match_rows += 1;
        }
    }
    Ok(())
}

/// Replaces the keypoint and match tables of `store` with `correspondences`.
///
/// With [`FailurePolicy::BestEffort`] a failed row is logged and listed in
/// the report while the remaining rows are still written. Failing to clear
/// the tables aborts in either mode.
pub fn export_to_store<S: MatchStore>(
    store: &mut S,
    correspondences: &Correspondences,
    config: &ExportConfig,
) -> Result<ExportReport> {
    let mut writer = Writer {
        store,
        policy: config.failure_policy,
        report: ExportReport::default(),
    };

    if config.failure_policy == FailurePolicy::Atomic {
        writer.store.begin()?;
        if let Err(e) = write_all(&mut writer, correspondences, config.clear_two_view_geometries) {
            if let Err(rollback_err) = writer.store.rollback() {
                error!("rollback failed: {}", rollback_err);
            }
            return Err(e);
        }
        writer.store.commit()?;
    } else {
        write_all(&mut writer, correspondences, config.clear_two_view_geometries)?;
    }

    let report = writer.report;
    info!(
        "exported {} keypoint rows and {} match rows ({} failed)",
        report.keypoint_rows,
        report.match_rows,
        report.failures.len()
    );
    Ok(report)
}

/// Writes both the database tables and the text match file.
pub fn export<S: MatchStore, P: AsRef<Path>>(
    store: &mut S,
    text_path: P,
    correspondences: &Correspondences,
    names: &ImageIndex,
    config: &ExportConfig,
) -> Result<ExportReport> {
    let report = export_to_store(store, correspondences, config)?;
    write_match_text(text_path, correspondences, names)?;
    Ok(report)
}
