use std::collections::BTreeMap;
use std::path::Path;

use nalgebra::Point2;
use scouter_core::{
    resize_bilinear, CalibrationError, CameraCalibration, Candidate, CandidateSet, GrayImage,
    MaskVerdict, Rect, RgbImageView,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::acf::{non_max_suppression, scan_model, Detection};
use crate::channels::ChannelFeatures;
use crate::error::{DetectError, DetectorConfigError};
use crate::mask::Mask;
use crate::params::DetectorConfig;

/// Multi-model object detector.
///
/// Immutable after construction; share it across threads by reference.
#[derive(Clone, Debug)]
pub struct Detector {
    config: DetectorConfig,
    mask: Option<Mask>,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorConfigError> {
        config.validate()?;
        let mask = config.mask.as_ref().map(Mask::from_config);
        log::debug!(
            "detector ready: {} model(s), mask={}, calibrated={}",
            config.models.len(),
            mask.is_some(),
            config.camera.is_some()
        );
        Ok(Self { config, mask })
    }

    pub fn from_json_str(json: &str) -> Result<Self, DetectorConfigError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DetectorConfigError> {
        Self::new(DetectorConfig::load_json(path)?)
    }

    /// Load the detection config and, optionally, a separate camera
    /// calibration file that replaces any `camera` entry in the config.
    pub fn from_files(
        detection: impl AsRef<Path>,
        camera: Option<&Path>,
    ) -> Result<Self, DetectorConfigError> {
        let mut config = DetectorConfig::load_json(detection)?;
        if let Some(path) = camera {
            let raw = std::fs::read_to_string(path)?;
            config.camera = Some(serde_json::from_str(&raw)?);
        }
        Self::new(config)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn calibration(&self) -> Option<&CameraCalibration> {
        self.config.camera.as_ref()
    }

    /// Detect objects in `image`, which sits at `(offset_x, offset_y)` inside
    /// the camera's full frame.
    ///
    /// Rects are in `image` coordinates; the offset is stored on each
    /// candidate. Output is sorted by descending score.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn detect(
        &self,
        image: &RgbImageView<'_>,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<CandidateSet, DetectError> {
        image.validate()?;
        let luma = image.to_luma();

        // Channel features are shared by models scanning the same scale.
        let mut pyramid: BTreeMap<(u32, usize), Option<ChannelFeatures>> = BTreeMap::new();
        let mut raw: Vec<Detection> = Vec::new();
        for model in &self.config.models {
            for &scale in &model.scales {
                let features = pyramid
                    .entry((scale.to_bits(), model.shrink))
                    .or_insert_with(|| scaled_features(&luma, scale, model.shrink));
                let Some(features) = features else {
                    continue;
                };
                let found = scan_model(model, features, scale);
                log::trace!(
                    "model `{}` scale {scale}: {} window(s) above threshold",
                    model.name,
                    found.len()
                );
                raw.extend(found);
            }
        }

        let kept = non_max_suppression(raw, self.config.nms_overlap, self.config.max_detections);
        let mut out = CandidateSet::new();
        for d in kept {
            let Some(rect) = d.rect.clipped(image.width, image.height) else {
                continue;
            };
            match Candidate::new(rect, d.score) {
                Ok(c) => out.push(c.with_offset([offset_x, offset_y])),
                Err(err) => log::warn!("dropping detection: {err}"),
            }
        }
        log::debug!("detected {} candidate(s)", out.len());
        Ok(out)
    }

    /// Promote rects from an external cascade-style detector into candidates.
    ///
    /// Invalid rects are skipped; every candidate gets score `0.0`.
    pub fn detect_rects(&self, rects: &[Rect], offset_x: i32, offset_y: i32) -> CandidateSet {
        CandidateSet::from_rects(rects, &[], [offset_x, offset_y])
    }

    /// Check `candidate` against the configured mask.
    ///
    /// Returns `true` when the candidate is accepted. The verdict is stored on
    /// the candidate and reused by later calls. Without a mask every
    /// candidate is accepted.
    pub fn filter_by_mask(&self, candidate: &mut Candidate) -> Result<bool, DetectError> {
        match candidate.verdict() {
            MaskVerdict::Accepted => return Ok(true),
            MaskVerdict::Rejected => return Ok(false),
            MaskVerdict::NotEvaluated => {}
        }
        let rect = candidate.rect();
        if !rect.is_valid() {
            return Err(DetectError::InvalidCandidate { rect });
        }
        let accepted = self
            .mask
            .as_ref()
            .is_none_or(|m| m.accepts(candidate.frame_rect()));
        candidate.set_verdict(if accepted {
            MaskVerdict::Accepted
        } else {
            MaskVerdict::Rejected
        });
        Ok(accepted)
    }

    /// Estimate the real-world height of `candidate` and its ground position.
    ///
    /// `offset_x`/`offset_y` place the candidate's rect in the calibrated full
    /// frame and take precedence over the offset stored on the candidate
    /// (which [`filter_by_mask`](Self::filter_by_mask) uses). A candidate
    /// whose stored offset is non-zero and differs from the arguments is
    /// measured with the arguments and a warning is logged; use
    /// [`estimate_height_in_frame`](Self::estimate_height_in_frame) to measure
    /// at the stored offset. On failure the candidate's height is left
    /// undefined.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, candidate)))]
    pub fn estimate_height(
        &self,
        candidate: &mut Candidate,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<f32, DetectError> {
        let stored = candidate.offset();
        if stored != [0, 0] && stored != [offset_x, offset_y] {
            log::warn!(
                "rect {:?}: height measured at offset ({offset_x}, {offset_y}), candidate carries {stored:?}",
                candidate.rect()
            );
        }
        candidate.clear_height_estimate();
        let camera = self
            .config
            .camera
            .as_ref()
            .ok_or(DetectError::CalibrationMissing)?;
        let rect = candidate.rect();
        if !rect.is_valid() {
            return Err(DetectError::InvalidCandidate { rect });
        }

        let frame_rect = rect.translated(offset_x, offset_y);
        let (ground, height) = camera.measure(frame_rect.foot_point(), frame_rect.head_point())?;
        let height = height as f32;
        let ground = Point2::new(ground.x as f32, ground.y as f32);
        candidate
            .set_height_estimate(height, ground)
            .map_err(|_| DetectError::DegenerateGeometry(CalibrationError::NonFinite))?;
        log::trace!("rect {frame_rect:?}: height {height:.3} at {ground:?}");
        Ok(height)
    }

    /// [`estimate_height`](Self::estimate_height) at the offset stored on
    /// the candidate, the same placement the mask check uses.
    pub fn estimate_height_in_frame(&self, candidate: &mut Candidate) -> Result<f32, DetectError> {
        let [ox, oy] = candidate.offset();
        self.estimate_height(candidate, ox, oy)
    }
}

fn scaled_features(luma: &GrayImage, scale: f32, shrink: usize) -> Option<ChannelFeatures> {
    let w = (luma.width as f32 * scale).round() as usize;
    let h = (luma.height as f32 * scale).round() as usize;
    if w < shrink || h < shrink {
        return None;
    }
    let resized = resize_bilinear(&luma.view(), w, h);
    let features = ChannelFeatures::compute(&resized.view(), shrink);
    (!features.is_empty()).then_some(features)
}
