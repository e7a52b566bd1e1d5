//! Stream-style helpers over serialized candidates.
//!
//! Each helper handles a whole frame's worth of candidate buffers. A buffer
//! that fails to decode or process is reported in
//! [`BatchOutcome::failures`] and does not stop the rest of the batch.

use scouter_core::{Candidate, CodecError, Frame};

use crate::{DetectError, Detector};

/// Why one element of a batch was not processed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Detect(#[from] DetectError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatchFailure {
    /// Position of the element in the input slice.
    pub index: usize,
    pub error: BatchError,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchOutcome {
    /// Serialized candidates that passed this stage, in input order.
    pub kept: Vec<Vec<u8>>,
    /// Number of well-formed candidates the stage dropped on purpose.
    pub rejected: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    fn fail(&mut self, index: usize, error: impl Into<BatchError>) {
        let error = error.into();
        log::warn!("batch element #{index}: {error}");
        self.failures.push(BatchFailure { index, error });
    }
}

/// Detect on a processed frame and serialize every candidate.
pub fn detect_frame(detector: &Detector, frame: &Frame) -> Result<Vec<Vec<u8>>, DetectError> {
    let set = detector.detect(&frame.view(), frame.offset_x(), frame.offset_y())?;
    Ok(set.iter().map(Candidate::to_bytes).collect())
}

/// Keep the candidates the mask accepts; their buffers carry the verdict.
pub fn filter_by_mask_batch<B: AsRef<[u8]>>(detector: &Detector, regions: &[B]) -> BatchOutcome {
    let mut out = BatchOutcome::default();
    for (index, blob) in regions.iter().enumerate() {
        let mut c = match Candidate::from_bytes(blob.as_ref()) {
            Ok(c) => c,
            Err(err) => {
                out.fail(index, err);
                continue;
            }
        };
        match detector.filter_by_mask(&mut c) {
            Ok(true) => out.kept.push(c.to_bytes()),
            Ok(false) => out.rejected += 1,
            Err(err) => out.fail(index, err),
        }
    }
    log::debug!(
        "mask filter: {} kept, {} rejected, {} failed",
        out.kept.len(),
        out.rejected,
        out.failures.len()
    );
    out
}

/// Estimate heights for candidates detected at `(offset_x, offset_y)`.
///
/// Every decodable candidate is kept; when estimation fails its height stays
/// undefined and the failure is also listed.
pub fn estimate_height_batch<B: AsRef<[u8]>>(
    detector: &Detector,
    offset_x: i32,
    offset_y: i32,
    regions: &[B],
) -> BatchOutcome {
    let mut out = BatchOutcome::default();
    for (index, blob) in regions.iter().enumerate() {
        let mut c = match Candidate::from_bytes(blob.as_ref()) {
            Ok(c) => c,
            Err(err) => {
                out.fail(index, err);
                continue;
            }
        };
        if let Err(err) = detector.estimate_height(&mut c, offset_x, offset_y) {
            out.fail(index, err);
        }
        out.kept.push(c.to_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{blob_image, level_camera, luma_model};
    use crate::{DetectorConfig, MaskConfig, MaskMode};
    use scouter_core::{MaskVerdict, Rect};

    fn detector() -> Detector {
        Detector::new(DetectorConfig {
            models: vec![luma_model()],
            mask: Some(MaskConfig {
                frame_size: [64, 64],
                valid: vec![Rect::new(0, 0, 32, 64)],
                mode: MaskMode::FootPoint,
                min_coverage: 0.5,
            }),
            camera: Some(level_camera()),
            ..DetectorConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn detect_frame_serializes_candidates() {
        let frame = Frame {
            camera_id: 1,
            offset: [3, 4],
            image: blob_image(32, 32, Rect::new(8, 8, 8, 16)),
        };
        let blobs = detect_frame(&detector(), &frame).unwrap();
        assert_eq!(blobs.len(), 1);
        let c = Candidate::from_bytes(&blobs[0]).unwrap();
        assert_eq!(c.offset(), [3, 4]);
    }

    #[test]
    fn malformed_element_does_not_abort_mask_batch() {
        let inside = Candidate::new(Rect::new(4, 4, 8, 16), 1.0).unwrap();
        let outside = Candidate::new(Rect::new(40, 4, 8, 16), 1.0).unwrap();
        let blobs = vec![inside.to_bytes(), vec![1, 2, 3], outside.to_bytes()];

        let out = filter_by_mask_batch(&detector(), &blobs);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.rejected, 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].index, 1);
        assert!(matches!(out.failures[0].error, BatchError::Codec(_)));

        let kept = Candidate::from_bytes(&out.kept[0]).unwrap();
        assert_eq!(kept.verdict(), MaskVerdict::Accepted);
    }

    #[test]
    fn height_batch_keeps_failed_estimates_undefined() {
        let person = Candidate::new(Rect::new(20, 64, 40, 136), 1.0).unwrap();
        let sky = Candidate::new(Rect::new(20, 0, 40, 100), 1.0).unwrap();
        let blobs = [person.to_bytes(), sky.to_bytes()];

        let out = estimate_height_batch(&detector(), 600, 200, &blobs);
        assert_eq!(out.kept.len(), 2);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].index, 1);

        let a = Candidate::from_bytes(&out.kept[0]).unwrap();
        let b = Candidate::from_bytes(&out.kept[1]).unwrap();
        assert!(a.height().is_some());
        assert_eq!(b.height(), None);
    }
}
