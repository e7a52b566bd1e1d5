use scouter_core::{CameraCalibration, Rect};
use serde::{Deserialize, Serialize};

use crate::channels::NUM_CHANNELS;
use crate::error::DetectorConfigError;

fn default_shrink() -> usize {
    4
}

fn default_stride() -> usize {
    1
}

fn default_scales() -> Vec<f32> {
    vec![1.0]
}

/// One linear sliding-window model over aggregated channel features.
///
/// `weights` is laid out `[channel][cell_row][cell_col]` with
/// `NUM_CHANNELS * (window[1] / shrink) * (window[0] / shrink)` entries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcfModel {
    #[serde(default)]
    pub name: String,
    /// Window size `[width, height]` in pixels at scale 1.
    pub window: [usize; 2],
    /// Side of the square pixel block aggregated into one feature cell.
    #[serde(default = "default_shrink")]
    pub shrink: usize,
    /// Window step in cells.
    #[serde(default = "default_stride")]
    pub stride: usize,
    /// Image scale factors scanned by this model (1.0 = native size,
    /// 0.5 = image halved, which finds objects twice the window size).
    #[serde(default = "default_scales")]
    pub scales: Vec<f32>,
    pub weights: Vec<f32>,
    #[serde(default)]
    pub bias: f32,
    /// Windows scoring below this value are dropped.
    #[serde(default)]
    pub threshold: f32,
}

impl AcfModel {
    /// Window size in cells, `[cols, rows]`.
    pub fn cells(&self) -> [usize; 2] {
        [self.window[0] / self.shrink, self.window[1] / self.shrink]
    }

    pub fn feature_len(&self) -> usize {
        let [cw, ch] = self.cells();
        NUM_CHANNELS * cw * ch
    }

    pub fn validate(&self) -> Result<(), DetectorConfigError> {
        let invalid = |reason: String| {
            Err(DetectorConfigError::Invalid(format!(
                "model `{}`: {reason}",
                self.name
            )))
        };
        if self.shrink == 0 || self.stride == 0 {
            return invalid("shrink and stride must be positive".into());
        }
        let [cw, ch] = self.cells();
        if cw == 0
            || ch == 0
            || self.window[0] % self.shrink != 0
            || self.window[1] % self.shrink != 0
        {
            return invalid(format!(
                "window {:?} must be a positive multiple of shrink {}",
                self.window, self.shrink
            ));
        }
        if self.scales.is_empty() || self.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return invalid("scales must be finite and positive".into());
        }
        if self.weights.len() != self.feature_len() {
            return invalid(format!(
                "expected {} weights, got {}",
                self.feature_len(),
                self.weights.len()
            ));
        }
        if self.weights.iter().any(|w| !w.is_finite())
            || !self.bias.is_finite()
            || !self.threshold.is_finite()
        {
            return invalid("weights, bias and threshold must be finite".into());
        }
        Ok(())
    }
}

/// How a candidate is tested against the mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskMode {
    /// Fraction of the rect inside the valid area must reach `min_coverage`.
    #[default]
    Coverage,
    /// The bottom-centre point must lie inside the valid area.
    FootPoint,
}

/// Spatial validity mask in full-frame coordinates.
///
/// The valid area is the union of `valid` rects clipped to `frame_size`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaskConfig {
    /// `[width, height]` of the camera's full frame.
    pub frame_size: [usize; 2],
    pub valid: Vec<Rect>,
    #[serde(default)]
    pub mode: MaskMode,
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f32,
}

fn default_min_coverage() -> f32 {
    0.5
}

fn default_nms_overlap() -> f32 {
    0.5
}

/// Complete detector configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub models: Vec<AcfModel>,
    /// IoU above which the lower-scoring of two detections is suppressed.
    #[serde(default = "default_nms_overlap")]
    pub nms_overlap: f32,
    /// Keep at most this many detections per image, best first.
    #[serde(default)]
    pub max_detections: Option<usize>,
    #[serde(default)]
    pub mask: Option<MaskConfig>,
    #[serde(default)]
    pub camera: Option<CameraCalibration>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            nms_overlap: default_nms_overlap(),
            max_detections: None,
            mask: None,
            camera: None,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectorConfigError> {
        if self.models.is_empty() {
            return Err(DetectorConfigError::Invalid(
                "at least one model is required".into(),
            ));
        }
        for model in &self.models {
            model.validate()?;
        }
        if !(self.nms_overlap > 0.0 && self.nms_overlap <= 1.0) {
            return Err(DetectorConfigError::Invalid(format!(
                "nms_overlap must be in (0, 1], got {}",
                self.nms_overlap
            )));
        }
        if let Some(mask) = &self.mask {
            if mask.frame_size[0] == 0 || mask.frame_size[1] == 0 {
                return Err(DetectorConfigError::Invalid(
                    "mask frame_size must be positive".into(),
                ));
            }
            if !(0.0..=1.0).contains(&mask.min_coverage) {
                return Err(DetectorConfigError::Invalid(format!(
                    "mask min_coverage must be in [0, 1], got {}",
                    mask.min_coverage
                )));
            }
        }
        Ok(())
    }
}
