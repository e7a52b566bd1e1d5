use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::Rect;

/// Outcome of the spatial mask check on a candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskVerdict {
    #[default]
    NotEvaluated,
    Accepted,
    Rejected,
}

impl MaskVerdict {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            MaskVerdict::NotEvaluated => 0,
            MaskVerdict::Accepted => 1,
            MaskVerdict::Rejected => 2,
        }
    }

    pub(crate) fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MaskVerdict::NotEvaluated),
            1 => Some(MaskVerdict::Accepted),
            2 => Some(MaskVerdict::Rejected),
            _ => None,
        }
    }
}

/// Candidate construction errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CandidateError {
    #[error("invalid rect {rect:?}: origin must be non-negative and extent positive")]
    InvalidRect { rect: Rect },
    #[error("candidate score must be finite (got {score})")]
    NonFiniteScore { score: f32 },
    #[error("height estimate must be finite and positive (got {height})")]
    InvalidHeight { height: f32 },
    #[error("height and ground position must be set together")]
    IncompleteEstimate,
}

/// One detected object region plus derived attributes.
///
/// The rect is in the coordinates of the image it was detected on; `offset`
/// is where that image sits inside the camera's full frame. `height` and
/// `ground` stay `None` until a height estimate succeeded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CandidateFields")]
pub struct Candidate {
    rect: Rect,
    score: f32,
    offset: [i32; 2],
    height: Option<f32>,
    ground: Option<Point2<f32>>,
    verdict: MaskVerdict,
}

#[derive(Deserialize)]
struct CandidateFields {
    rect: Rect,
    score: f32,
    #[serde(default)]
    offset: [i32; 2],
    #[serde(default)]
    height: Option<f32>,
    #[serde(default)]
    ground: Option<Point2<f32>>,
    #[serde(default)]
    verdict: MaskVerdict,
}

impl TryFrom<CandidateFields> for Candidate {
    type Error = CandidateError;

    fn try_from(f: CandidateFields) -> Result<Self, Self::Error> {
        let mut c = Candidate::new(f.rect, f.score)?.with_offset(f.offset);
        match (f.height, f.ground) {
            (Some(h), Some(g)) => c.set_height_estimate(h, g)?,
            (None, None) => {}
            _ => return Err(CandidateError::IncompleteEstimate),
        }
        c.verdict = f.verdict;
        Ok(c)
    }
}

impl Candidate {
    /// Create a candidate from a detected rect and its detector score.
    pub fn new(rect: Rect, score: f32) -> Result<Self, CandidateError> {
        if !rect.is_valid() {
            return Err(CandidateError::InvalidRect { rect });
        }
        if !score.is_finite() {
            return Err(CandidateError::NonFiniteScore { score });
        }
        Ok(Self {
            rect,
            score,
            offset: [0, 0],
            height: None,
            ground: None,
            verdict: MaskVerdict::NotEvaluated,
        })
    }

    /// Record the frame offset of the image this candidate was detected on.
    pub fn with_offset(mut self, offset: [i32; 2]) -> Self {
        self.offset = offset;
        self
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn score(&self) -> f32 {
        self.score
    }

    #[inline]
    pub fn offset(&self) -> [i32; 2] {
        self.offset
    }

    /// Rect in the camera's full-frame coordinates.
    pub fn frame_rect(&self) -> Rect {
        self.rect.translated(self.offset[0], self.offset[1])
    }

    /// Real-world height, `None` until estimated.
    #[inline]
    pub fn height(&self) -> Option<f32> {
        self.height
    }

    /// Ground-plane foot position, `None` until estimated.
    #[inline]
    pub fn ground(&self) -> Option<Point2<f32>> {
        self.ground
    }

    #[inline]
    pub fn verdict(&self) -> MaskVerdict {
        self.verdict
    }

    pub fn set_verdict(&mut self, verdict: MaskVerdict) {
        self.verdict = verdict;
    }

    /// Store a height estimate together with the ground position it came from.
    pub fn set_height_estimate(
        &mut self,
        height: f32,
        ground: Point2<f32>,
    ) -> Result<(), CandidateError> {
        if !height.is_finite() || height <= 0.0 {
            return Err(CandidateError::InvalidHeight { height });
        }
        if !ground.x.is_finite() || !ground.y.is_finite() {
            return Err(CandidateError::InvalidHeight { height });
        }
        self.height = Some(height);
        self.ground = Some(ground);
        Ok(())
    }

    /// Drop any previous estimate, leaving the height undefined.
    pub fn clear_height_estimate(&mut self) {
        self.height = None;
        self.ground = None;
    }
}

/// Owned, ordered collection of candidates from one detector invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Promote a raw rectangle list into candidates.
    ///
    /// `scores` is matched by index; missing scores default to `0.0`. Invalid
    /// rects are skipped one by one and do not affect the rest of the list.
    pub fn from_rects(rects: &[Rect], scores: &[f32], offset: [i32; 2]) -> Self {
        let mut candidates = Vec::with_capacity(rects.len());
        for (i, &rect) in rects.iter().enumerate() {
            let score = scores.get(i).copied().unwrap_or(0.0);
            match Candidate::new(rect, score) {
                Ok(c) => candidates.push(c.with_offset(offset)),
                Err(err) => log::warn!("skipping rect #{i}: {err}"),
            }
        }
        Self { candidates }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Candidate> {
        self.candidates.iter_mut()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Transfer ownership of every element to the caller, in set order.
    pub fn resolve(self) -> Vec<Candidate> {
        self.candidates
    }
}

impl From<Vec<Candidate>> for CandidateSet {
    fn from(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<T: IntoIterator<Item = Candidate>>(iter: T) -> Self {
        Self {
            candidates: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CandidateSet {
    type Item = Candidate;
    type IntoIter = std::vec::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}
