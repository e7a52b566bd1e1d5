//! Core types for multi-view moving-object detection.
//!
//! This crate holds the value types every stage exchanges: [`Rect`],
//! [`Candidate`] and its owned collection [`CandidateSet`], the multi-view
//! identity [`MVCandidate`], and the binary [`codec`] used to move
//! candidates between processes. It also carries the camera geometry needed
//! for ground-plane reasoning and a small dense RGB image type.
//!
//! It does *not* depend on any detector or image-decoding library.
//!
//! ## Quickstart
//!
//! ```
//! use scouter_core::{Candidate, Rect};
//!
//! let c = Candidate::new(Rect::new(10, 20, 40, 120), 0.8).unwrap();
//! let bytes = c.to_bytes();
//! assert_eq!(Candidate::from_bytes(&bytes).unwrap(), c);
//! ```

mod camera;
mod candidate;
pub mod codec;
mod frame;
mod homography;
mod image;
mod logger;
mod mv_candidate;
mod rect;

pub use camera::{CalibrationError, CameraCalibration};
pub use candidate::{Candidate, CandidateError, CandidateSet, MaskVerdict};
pub use codec::{
    deserialize_candidate, deserialize_mv_candidate, serialize_candidate, serialize_mv_candidate,
    CodecError,
};
pub use frame::Frame;
pub use homography::Homography;
pub use image::{
    resize_bilinear, sample_bilinear, GrayImage, GrayImageView, ImageError, RgbImage, RgbImageView,
};
pub use mv_candidate::{CameraId, MVCandidate, MVCandidateSet, RegionsWithCameraId, View};
pub use rect::Rect;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
