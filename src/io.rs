use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::observation::TrackObservation;

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// One line per track with every camera slot, for inspecting raw input.
pub fn render_track_dump(tracks: &[TrackObservation]) -> String {
    tracks.iter().map(|track| format!("{}\n", track)).collect()
}

pub fn write_track_dump<P: AsRef<Path>>(
    output_path: P,
    tracks: &[TrackObservation],
) -> Result<()> {
    std::fs::write(output_path, render_track_dump(tracks))?;
    Ok(())
}
