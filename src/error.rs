//! Error types for correspondence assembly and export

use thiserror::Error;

/// Result type for multiview-match operations
pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Error, Debug)]
pub enum MatchError {
    /// A track observation does not carry one slot per camera
    #[error("track {track} has {found} observation slots, expected {expected}")]
    TrackLength {
        track: usize,
        expected: usize,
        found: usize,
    },

    /// Camera identifier does not fit the pair id encoding
    #[error(
        "camera id {0} is not below the pair id bound {max}",
        max = crate::pair_id::MAX_IMAGE_ID
    )]
    CameraIdOutOfRange(u64),

    #[error("at least one camera is required")]
    NoCameras,

    /// A delete or insert against the store failed
    #[error("store write failed on {table} (key {key}): {source}")]
    Store {
        table: String,
        key: i64,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Visualization error: {0}")]
    Visualization(#[from] rerun::RecordingStreamError),
}
