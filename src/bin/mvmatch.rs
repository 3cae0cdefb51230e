use aprilgrid::TagFamily;
use aprilgrid::detector::TagDetector;
use clap::{Args, Parser, Subcommand};
use multiview_match::assemble;
use multiview_match::board::{Board, BoardConfig};
use multiview_match::data_loader::MarkerSource;
use multiview_match::export::{ExportConfig, FailurePolicy, export};
use multiview_match::io::{object_from_json, write_track_dump};
use multiview_match::keypoints::DedupPolicy;
use multiview_match::observation::ObservationSource;
use multiview_match::store::{ImageIndex, SqliteStore};
use multiview_match::synthetic::{SyntheticConfig, SyntheticSource};
use multiview_match::visualization::log_keypoints;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct MvMatchCli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// COLMAP project folder holding database.db; match.txt is written there
    #[arg(long, global = true, default_value = ".")]
    project_path: PathBuf,

    /// Export config JSON
    #[arg(long, global = true)]
    config: Option<String>,

    /// Merge keypoints within this many pixels instead of exact matching
    #[arg(long, global = true)]
    dedup_radius: Option<f32>,

    /// Roll back the whole export on the first failed write
    #[arg(long, global = true)]
    atomic: bool,

    /// Save a rerun recording of the keypoints to this file
    #[arg(long, global = true)]
    rerun: Option<String>,

    /// Write every track's raw camera slots to this file before assembling
    #[arg(long, global = true)]
    dump_tracks: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect AprilGrid corners in grouped multi-view images
    Markers {
        /// folder with one sub-folder per capture group
        image_path: String,

        /// tag_family: ["t16h5", "t25h7", "t25h9", "t36h11", "t36h11b1"]
        #[arg(long, value_enum, default_value = "t36h11")]
        tag_family: TagFamily,

        /// Board configuration JSON
        #[arg(long)]
        board_config: Option<String>,

        #[arg(long)]
        cam_num: Option<usize>,

        #[arg(long, default_value = "0")]
        group_start: usize,

        #[arg(long)]
        group_num: Option<usize>,
    },
    /// Project random 3D points through known projection matrices
    Synthetic {
        /// JSON array of row-major 3x4 projection matrices
        projections: String,

        /// Generator configuration JSON
        #[arg(long)]
        generator_config: Option<String>,

        #[arg(long)]
        max_points: Option<usize>,

        #[arg(long)]
        pixel_error: Option<f64>,

        #[arg(long, num_args = 2)]
        track_length: Option<Vec<usize>>,

        #[arg(long)]
        seed: Option<u64>,
    },
}

fn load_export_config(common: &CommonArgs) -> Result<ExportConfig, Box<dyn std::error::Error>> {
    let mut config: ExportConfig = match &common.config {
        Some(path) => object_from_json(path)?,
        None => ExportConfig::default(),
    };
    if let Some(radius) = common.dedup_radius {
        config.dedup = DedupPolicy::Tolerance { radius };
    }
    if common.atomic {
        config.failure_policy = FailurePolicy::Atomic;
    }
    config.validate()?;
    Ok(config)
}

struct ExportTarget<'a> {
    store: &'a mut SqliteStore,
    images: &'a ImageIndex,
    project_path: &'a Path,
    config: &'a ExportConfig,
    dump_tracks: Option<&'a Path>,
}

fn run_export<S: ObservationSource + ?Sized>(
    source: &S,
    target: ExportTarget<'_>,
    recording: Option<&rerun::RecordingStream>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ExportTarget {
        store,
        images,
        project_path,
        config,
        dump_tracks,
    } = target;
    let tracks = source.observations()?;
    if let Some(path) = dump_tracks {
        write_track_dump(path, &tracks)?;
        log::info!("wrote {} tracks to {}", tracks.len(), path.display());
    }
    log::info!("assembling correspondences");
    let correspondences = assemble(&tracks, source.num_cameras(), config.dedup)?;
    if let Some(recording) = recording {
        log_keypoints(recording, &correspondences, images)?;
    }
    log::info!("exporting to database");
    let report = export(
        store,
        project_path.join("match.txt"),
        &correspondences,
        images,
        config,
    )?;
    for failure in &report.failures {
        log::error!("{} {}: {}", failure.table, failure.key, failure.message);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = MvMatchCli::parse();
    let now = Instant::now();

    let config = load_export_config(&cli.common)?;
    let project_path = cli.common.project_path.as_path();
    let dump_tracks = cli.common.dump_tracks.as_deref();
    let mut store = SqliteStore::open(project_path.join("database.db"))?;
    let images = store.read_image_index()?;
    log::info!("{} images registered", images.len());

    let recording = match &cli.common.rerun {
        Some(path) => Some(rerun::RecordingStreamBuilder::new("mvmatch").save(path)?),
        None => None,
    };

    match cli.command {
        Commands::Markers {
            image_path,
            tag_family,
            board_config,
            cam_num,
            group_start,
            group_num,
        } => {
            let board_config: BoardConfig = match board_config {
                Some(path) => object_from_json(path)?,
                None => BoardConfig::default(),
            };
            let board = Board::from_config(&board_config);
            let detector = TagDetector::new(&tag_family, None);
            let mut source = MarkerSource::new(&image_path, &detector, &board, &images)
                .with_groups(group_start, group_num);
            if let Some(cam_num) = cam_num {
                source = source.with_num_cameras(cam_num);
            }
            if let Some(recording) = &recording {
                source = source.with_recording(recording);
            }
            let target = ExportTarget {
                store: &mut store,
                images: &images,
                project_path,
                config: &config,
                dump_tracks,
            };
            run_export(&source, target, recording.as_ref())?;
        }
        Commands::Synthetic {
            projections,
            generator_config,
            max_points,
            pixel_error,
            track_length,
            seed,
        } => {
            let mut generator: SyntheticConfig = match generator_config {
                Some(path) => object_from_json(path)?,
                None => SyntheticConfig::default(),
            };
            if let Some(max_points) = max_points {
                generator.max_points = max_points;
            }
            if let Some(pixel_error) = pixel_error {
                generator.noise_2d = pixel_error;
            }
            if let Some(range) = track_length {
                generator.track_range = Some([range[0], range[1]]);
            }
            if let Some(seed) = seed {
                generator.seed = seed;
            }
            let source = SyntheticSource::from_json_file(&projections, generator)?;
            let target = ExportTarget {
                store: &mut store,
                images: &images,
                project_path,
                config: &config,
                dump_tracks,
            };
            run_export(&source, target, recording.as_ref())?;
        }
    }

    let duration_sec = now.elapsed().as_secs_f64();
    log::info!("finished in {:.3} sec", duration_sec);
    Ok(())
}
