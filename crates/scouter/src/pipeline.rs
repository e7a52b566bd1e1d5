//! Per-frame detection pipeline: detect, mask filter, height estimate.

use scouter_core::{CandidateSet, Frame, Rect, RgbImageView};
use scouter_detector::{DetectError, Detector};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Run every detector stage on one image placed at `(offset_x, offset_y)`
/// in its camera's full frame.
///
/// Candidates the mask rejects are dropped. When the detector carries a
/// calibration, each kept candidate gets a height estimate; an estimate that
/// fails leaves that candidate's height undefined and is logged.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(detector, img), fields(width = img.width, height = img.height))
)]
pub fn process_view(
    detector: &Detector,
    img: &RgbImageView<'_>,
    offset_x: i32,
    offset_y: i32,
) -> Result<CandidateSet, DetectError> {
    let candidates = detector.detect(img, offset_x, offset_y)?;
    refine(detector, candidates)
}

/// [`process_view`] on a processed camera frame.
pub fn process_frame(detector: &Detector, frame: &Frame) -> Result<CandidateSet, DetectError> {
    process_view(detector, &frame.view(), frame.offset_x(), frame.offset_y())
}

/// Mask and height stages for rects found by an external detector on an
/// image placed at `(offset_x, offset_y)`. Invalid rects are skipped.
pub fn process_rects(
    detector: &Detector,
    rects: &[Rect],
    offset_x: i32,
    offset_y: i32,
) -> Result<CandidateSet, DetectError> {
    let candidates = detector.detect_rects(rects, offset_x, offset_y);
    if candidates.len() < rects.len() {
        log::warn!("{} invalid rect(s) skipped", rects.len() - candidates.len());
    }
    refine(detector, candidates)
}

fn refine(detector: &Detector, candidates: CandidateSet) -> Result<CandidateSet, DetectError> {
    let detected = candidates.len();

    let mut kept = CandidateSet::new();
    for mut c in candidates {
        if detector.filter_by_mask(&mut c)? {
            kept.push(c);
        }
    }

    if detector.calibration().is_some() {
        for c in kept.iter_mut() {
            if let Err(err) = detector.estimate_height_in_frame(c) {
                log::debug!("no height for {:?}: {err}", c.rect());
            }
        }
    }

    log::info!(
        "{} candidate(s) detected, {} kept after mask",
        detected,
        kept.len()
    );
    Ok(kept)
}
