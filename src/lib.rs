pub mod assembler;
pub mod board;
pub mod data_loader;
pub mod error;
pub mod export;
pub mod io;
pub mod keypoints;
pub mod observation;
pub mod pair_id;
pub mod store;
pub mod synthetic;
pub mod visualization;

pub use assembler::{Correspondences, assemble, assemble_from};
pub use error::{MatchError, Result};
pub use export::{ExportConfig, ExportReport, FailurePolicy, export};
pub use keypoints::{DedupPolicy, KeypointTable};
pub use observation::{ObservationSource, TrackObservation};
