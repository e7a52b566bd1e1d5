use scouter_core::{CalibrationError, ImageError, Rect};

/// Failures while loading or validating a detector configuration.
#[derive(thiserror::Error, Debug)]
pub enum DetectorConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid detector config: {0}")]
    Invalid(String),
}

/// Errors returned by detector operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error(transparent)]
    InvalidImage(#[from] ImageError),
    #[error("candidate rect {rect:?} is not valid")]
    InvalidCandidate { rect: Rect },
    #[error("no camera calibration configured")]
    CalibrationMissing,
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(#[from] CalibrationError),
}
