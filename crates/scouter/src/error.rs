use scouter_core::{CandidateError, CodecError, ImageError};
use scouter_detector::{DetectError, DetectorConfigError};
use scouter_matcher::MatchError;

/// Errors produced by the facade helpers and the CLI.
#[derive(thiserror::Error, Debug)]
pub enum ScouterError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] DetectorConfigError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Candidate(#[from] CandidateError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[cfg(feature = "image")]
    #[error("image codec error: {0}")]
    ImageCodec(#[from] ::image::ImageError),
}
