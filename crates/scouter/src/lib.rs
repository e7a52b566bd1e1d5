//! High-level facade crate for the `scouter-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core model, the detector and the cross-camera matcher;
//! - [`pipeline`] helpers that run detect, mask filter and height estimation
//!   on one camera image;
//! - JSON [`report`] types used by the `scouter` CLI;
//! - (feature `image`) decoding, JPEG encoding and drawing of candidates.
//!
//! ## Quickstart
//!
//! ```no_run
//! use scouter::{get_matching, imaging, pipeline, Detector, RegionsWithCameraId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = Detector::from_json_file("detector.json")?;
//! let mut regions = Vec::new();
//! for (camera_id, path) in [(1, "cam1.jpg"), (2, "cam2.jpg")] {
//!     let img = imaging::decode_image(&std::fs::read(path)?)?;
//!     let found = pipeline::process_view(&detector, &img.view(), 0, 0)?;
//!     regions.push(RegionsWithCameraId::new(camera_id, found));
//! }
//! let objects = get_matching(&regions, 0.5)?;
//! println!("{} object(s)", objects.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `scouter::core`: rects, candidates, multi-view candidates, binary codec,
//!   camera geometry, images.
//! - `scouter::detector`: [`Detector`] and batch helpers over serialized
//!   candidates.
//! - `scouter::matcher`: [`get_matching`], correspondence scoring, [`Tracker`].
//! - `scouter::imaging` (feature `image`): `image`/`imageproc` helpers.

pub use scouter_core as core;
pub use scouter_detector as detector;
pub use scouter_matcher as matcher;

pub use scouter_core::{
    CameraCalibration, CameraId, Candidate, CandidateSet, Frame, MVCandidate, MVCandidateSet,
    MaskVerdict, Rect, RegionsWithCameraId, RgbImage, RgbImageView,
};
pub use scouter_detector::{Detector, DetectorConfig};
pub use scouter_matcher::{get_matching, MatchParams, MovingObjectMatcher, Tracker};

mod error;
pub mod pipeline;
pub mod report;

pub use error::ScouterError;

#[cfg(feature = "image")]
pub mod imaging;
