//! JSON reports exchanged between the `detect` and `match` CLI commands.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use scouter_core::{CameraId, CandidateSet, MVCandidate, RegionsWithCameraId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ScouterError;

/// Candidates found on one camera image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub camera_id: CameraId,
    /// Position of the processed image in the camera's full frame.
    #[serde(default)]
    pub offset: [i32; 2],
    /// `[width, height]` of the processed image.
    pub image_size: [usize; 2],
    pub candidates: CandidateSet,
}

impl DetectionReport {
    pub fn regions(&self) -> RegionsWithCameraId {
        RegionsWithCameraId::new(self.camera_id, self.candidates.clone())
    }
}

/// Matched multi-view objects for one frame round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub threshold: f32,
    pub objects: Vec<MVCandidate>,
}

/// Read a JSON value from `path`.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ScouterError> {
    let path = path.as_ref();
    log::debug!("reading {}", path.display());
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write `value` to `path` as pretty-printed JSON.
pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), ScouterError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scouter_core::{Candidate, Rect};

    #[test]
    fn detection_report_json_roundtrip() {
        let mut candidates = CandidateSet::new();
        candidates.push(
            Candidate::new(Rect::new(4, 8, 20, 50), 1.25)
                .unwrap()
                .with_offset([100, 40]),
        );
        let report = DetectionReport {
            camera_id: 3,
            offset: [100, 40],
            image_size: [320, 240],
            candidates,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json(&report, &path).unwrap();
        let back: DetectionReport = load_json(&path).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.regions().candidates.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_json::<DetectionReport>("/nonexistent/report.json").unwrap_err();
        assert!(matches!(err, ScouterError::Io(_)));
    }
}
