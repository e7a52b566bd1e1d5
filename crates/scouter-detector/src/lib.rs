//! Object detector for the scouter pipeline.
//!
//! A [`Detector`] is built once from a JSON [`DetectorConfig`] and then used
//! read-only:
//!
//! - [`Detector::detect`] scans an RGB image with one or more linear models
//!   over aggregated channel features and returns a
//!   [`CandidateSet`](scouter_core::CandidateSet);
//! - [`Detector::filter_by_mask`] checks candidates against a spatial mask
//!   given in full-frame coordinates;
//! - [`Detector::estimate_height`] uses the camera calibration to attach a
//!   real-world height and ground position.
//!
//! The [`batch`] module runs the same stages over serialized candidates.
//!
//! ## Quickstart
//!
//! ```no_run
//! use scouter_core::RgbImage;
//! use scouter_detector::Detector;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = Detector::from_json_file("detector.json")?;
//! let img = RgbImage::from_raw(640, 480, vec![0; 640 * 480 * 3])?;
//! let mut candidates = detector.detect(&img.view(), 0, 0)?;
//! for c in candidates.iter_mut() {
//!     if detector.filter_by_mask(c)? {
//!         let _ = detector.estimate_height(c, 0, 0);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod acf;
pub mod batch;
mod channels;
mod detector;
mod error;
mod io;
mod mask;
mod params;

pub use acf::{non_max_suppression, scan_model, Detection};
pub use batch::{
    detect_frame, estimate_height_batch, filter_by_mask_batch, BatchError, BatchFailure,
    BatchOutcome,
};
pub use channels::{ChannelFeatures, NUM_CHANNELS};
pub use detector::Detector;
pub use error::{DetectError, DetectorConfigError};
pub use params::{AcfModel, DetectorConfig, MaskConfig, MaskMode};

#[cfg(test)]
pub(crate) mod test_support {
    use nalgebra::{Matrix3, Vector3};
    use scouter_core::{CameraCalibration, Rect, RgbImage};

    use crate::AcfModel;

    /// 8x16 window that fires only when every luma cell is bright.
    pub(crate) fn luma_model() -> AcfModel {
        let mut m = AcfModel {
            name: "luma".into(),
            window: [8, 16],
            shrink: 4,
            stride: 1,
            scales: vec![1.0],
            weights: Vec::new(),
            bias: -7.5,
            threshold: 0.0,
        };
        m.weights = vec![0.0; m.feature_len()];
        m.weights[..8].fill(1.0);
        m
    }

    /// Black image with a white `blob`.
    pub(crate) fn blob_image(width: usize, height: usize, blob: Rect) -> RgbImage {
        let mut data = vec![0u8; width * height * 3];
        for y in blob.y as usize..blob.bottom() as usize {
            for x in blob.x as usize..blob.right() as usize {
                let i = 3 * (y * width + x);
                data[i..i + 3].fill(255);
            }
        }
        RgbImage::from_raw(width, height, data).unwrap()
    }

    /// Camera 3 m above the origin looking along world +Y, f = 800 px.
    pub(crate) fn level_camera() -> CameraCalibration {
        let k = Matrix3::new(800.0, 0.0, 640.0, 0.0, 800.0, 360.0, 0.0, 0.0, 1.0);
        let r = Matrix3::new(1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0);
        CameraCalibration::from_parts(k, r, -(r * Vector3::new(0.0, 0.0, 3.0))).unwrap()
    }
}
