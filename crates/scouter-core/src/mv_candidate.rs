use serde::{Deserialize, Serialize};

use crate::{Candidate, CandidateSet};

/// Integer identifier of a camera.
pub type CameraId = i32;

/// One source detection that contributes to a multi-view identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub camera_id: CameraId,
    /// Index of the candidate inside its camera's candidate set.
    pub index: u32,
    pub candidate: Candidate,
}

/// A candidate enriched with its source camera and cross-view correlation.
///
/// `candidate` carries the representative geometry. `camera_id` is the camera
/// of that representative and never changes after construction.
/// `correlation` is `None` until the matcher has assigned a group key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MVCandidate {
    candidate: Candidate,
    camera_id: CameraId,
    correlation: Option<u32>,
    views: Vec<View>,
}

impl MVCandidate {
    /// A direct single-camera detection, not yet correlated.
    pub fn single(camera_id: CameraId, index: u32, candidate: Candidate) -> Self {
        Self {
            views: vec![View {
                camera_id,
                index,
                candidate: candidate.clone(),
            }],
            candidate,
            camera_id,
            correlation: None,
        }
    }

    /// A correlated group produced by the matcher.
    ///
    /// `representative` indexes into `views`; its candidate and camera become
    /// the group's geometry and camera ID. Returns `None` for an empty group
    /// or an out-of-range representative.
    pub fn grouped(correlation: u32, representative: usize, views: Vec<View>) -> Option<Self> {
        let rep = views.get(representative)?;
        Some(Self {
            candidate: rep.candidate.clone(),
            camera_id: rep.camera_id,
            correlation: Some(correlation),
            views,
        })
    }

    pub(crate) fn from_parts(
        candidate: Candidate,
        camera_id: CameraId,
        correlation: Option<u32>,
        views: Vec<View>,
    ) -> Self {
        Self {
            candidate,
            camera_id,
            correlation,
            views,
        }
    }

    #[inline]
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    #[inline]
    pub fn camera_id(&self) -> CameraId {
        self.camera_id
    }

    #[inline]
    pub fn correlation(&self) -> Option<u32> {
        self.correlation
    }

    #[inline]
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Number of source detections merged into this identity.
    #[inline]
    pub fn group_size(&self) -> usize {
        self.views.len()
    }

    /// True when more than one camera contributed.
    pub fn is_multi_view(&self) -> bool {
        self.views
            .iter()
            .any(|v| v.camera_id != self.views[0].camera_id)
    }
}

/// Matcher output: an owned, ordered collection of multi-view candidates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MVCandidateSet {
    items: Vec<MVCandidate>,
}

impl MVCandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MVCandidate> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MVCandidate> {
        self.items.iter()
    }

    pub fn push(&mut self, item: MVCandidate) {
        self.items.push(item);
    }

    /// Transfer every element to the caller; exactly `len()` items in order.
    pub fn resolve(self) -> Vec<MVCandidate> {
        self.items
    }

    /// Total number of source detections across all groups.
    pub fn total_views(&self) -> usize {
        self.items.iter().map(MVCandidate::group_size).sum()
    }
}

impl From<Vec<MVCandidate>> for MVCandidateSet {
    fn from(items: Vec<MVCandidate>) -> Self {
        Self { items }
    }
}

impl FromIterator<MVCandidate> for MVCandidateSet {
    fn from_iter<T: IntoIterator<Item = MVCandidate>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MVCandidateSet {
    type Item = MVCandidate;
    type IntoIter = std::vec::IntoIter<MVCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a MVCandidateSet {
    type Item = &'a MVCandidate;
    type IntoIter = std::slice::Iter<'a, MVCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Matcher input record: the candidates one camera produced in a frame round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionsWithCameraId {
    pub camera_id: CameraId,
    pub candidates: CandidateSet,
}

impl RegionsWithCameraId {
    pub fn new(camera_id: CameraId, candidates: impl Into<CandidateSet>) -> Self {
        Self {
            camera_id,
            candidates: candidates.into(),
        }
    }
}
