//! Cross-camera moving-object matching.
//!
//! Each camera reports a [`CandidateSet`](scouter_core::CandidateSet) for the
//! same frame round. [`get_matching`] scores every pair of detections from
//! different cameras ([`score::correspondence_score`]), then greedily merges
//! pairs above a threshold, best pair first, without ever putting two
//! detections of one camera in the same group. The result is an
//! [`MVCandidateSet`](scouter_core::MVCandidateSet) that accounts for every
//! input detection exactly once.
//!
//! Candidates must carry a height estimate and ground position (see
//! `scouter-detector`) to be merged; others pass through as singletons.
//!
//! ## Features
//!
//! - `parallel`: score pairs with `rayon`. Output is identical.
//! - `tracing`: instrument [`MovingObjectMatcher::get_matching`].

mod matcher;
mod params;
pub mod score;
mod tracker;

pub use matcher::{get_matching, MatchError, MovingObjectMatcher};
pub use params::MatchParams;
pub use tracker::{SkippedBlob, TrackOutput, Tracker};
