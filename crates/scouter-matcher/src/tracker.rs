use scouter_core::{CameraId, Candidate, CodecError, MVCandidate, RegionsWithCameraId};

use crate::matcher::Entry;
use crate::{MatchError, MatchParams, MovingObjectMatcher};

/// A serialized candidate that could not be decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedBlob {
    pub camera_id: CameraId,
    /// Position of the buffer in that camera's input list.
    pub index: usize,
    pub error: CodecError,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackOutput {
    pub objects: Vec<MVCandidate>,
    pub skipped: Vec<SkippedBlob>,
}

/// Runs the matcher with a fixed threshold and resolves the result into
/// individually owned multi-view candidates.
#[derive(Clone, Debug)]
pub struct Tracker {
    threshold: f32,
    matcher: MovingObjectMatcher,
}

impl Tracker {
    pub fn new(threshold: f32, params: MatchParams) -> Result<Self, MatchError> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(MatchError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            matcher: MovingObjectMatcher::new(params)?,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn process(
        &self,
        regions: &[RegionsWithCameraId],
    ) -> Result<Vec<MVCandidate>, MatchError> {
        Ok(self.matcher.get_matching(regions, self.threshold)?.resolve())
    }

    /// Decode per-camera candidate buffers, then match.
    ///
    /// Malformed buffers are skipped and reported; the rest is matched. A
    /// view's `index` is the position of its buffer in that camera's input
    /// list, the same numbering [`SkippedBlob::index`] uses.
    pub fn process_serialized<B: AsRef<[u8]>>(
        &self,
        input: &[(CameraId, Vec<B>)],
    ) -> Result<TrackOutput, MatchError> {
        let mut skipped = Vec::new();
        let mut decoded: Vec<(CameraId, u32, Candidate)> = Vec::new();
        for (camera_id, blobs) in input {
            for (index, blob) in blobs.iter().enumerate() {
                match Candidate::from_bytes(blob.as_ref()) {
                    Ok(c) => decoded.push((*camera_id, index as u32, c)),
                    Err(error) => {
                        log::warn!("camera {camera_id}: skipping candidate #{index}: {error}");
                        skipped.push(SkippedBlob {
                            camera_id: *camera_id,
                            index,
                            error,
                        });
                    }
                }
            }
        }

        let entries: Vec<Entry<'_>> = decoded
            .iter()
            .map(|(camera_id, index, candidate)| Entry {
                camera_id: *camera_id,
                index: *index,
                candidate,
            })
            .collect();
        Ok(TrackOutput {
            objects: self.matcher.match_entries(&entries, self.threshold).resolve(),
            skipped,
        })
    }
}
