use std::cmp::Ordering;
use std::collections::BTreeSet;

use scouter_core::{CameraId, Candidate, MVCandidate, MVCandidateSet, RegionsWithCameraId, View};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::score::correspondence_score;
use crate::MatchParams;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("threshold must be a finite value in [0, 1], got {0}")]
    InvalidThreshold(f32),
    #[error("invalid match parameters: {0:?}")]
    InvalidParams(MatchParams),
}

/// One flattened input detection. `index` is the detection's position in
/// its camera's input.
pub(crate) struct Entry<'a> {
    pub(crate) camera_id: CameraId,
    pub(crate) index: u32,
    pub(crate) candidate: &'a Candidate,
}

impl Entry<'_> {
    #[inline]
    fn key(&self) -> (CameraId, u32) {
        (self.camera_id, self.index)
    }
}

#[derive(Clone, Copy, Debug)]
struct Pair {
    score: f32,
    lo: usize,
    hi: usize,
}

/// Disjoint groups with a per-group camera set.
struct Groups {
    parent: Vec<usize>,
    cameras: Vec<BTreeSet<CameraId>>,
    // step of the first merge that involved the group
    formed: Vec<Option<usize>>,
}

impl Groups {
    fn new(entries: &[Entry<'_>]) -> Self {
        Self {
            parent: (0..entries.len()).collect(),
            cameras: entries
                .iter()
                .map(|e| BTreeSet::from([e.camera_id]))
                .collect(),
            formed: vec![None; entries.len()],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Merge the groups of `a` and `b` unless they already share a camera.
    fn try_union(&mut self, a: usize, b: usize, step: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb || !self.cameras[ra].is_disjoint(&self.cameras[rb]) {
            return false;
        }
        let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[child] = root;
        let moved = std::mem::take(&mut self.cameras[child]);
        self.cameras[root].extend(moved);
        self.formed[root] = match (self.formed[root], self.formed[child]) {
            (Some(x), Some(y)) => Some(x.min(y)),
            (Some(x), None) | (None, Some(x)) => Some(x),
            (None, None) => Some(step),
        };
        true
    }
}

fn pair_order<'a>(entries: &'a [Entry<'a>]) -> impl Fn(&Pair, &Pair) -> Ordering + 'a {
    move |a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| entries[a.lo].key().cmp(&entries[b.lo].key()))
            .then_with(|| entries[a.hi].key().cmp(&entries[b.hi].key()))
            .then_with(|| (a.lo, a.hi).cmp(&(b.lo, b.hi)))
    }
}

/// Moving-object matcher: merges detections of the same physical object seen
/// by different cameras.
///
/// Stateless; every call depends only on its arguments.
#[derive(Clone, Debug, Default)]
pub struct MovingObjectMatcher {
    params: MatchParams,
}

impl MovingObjectMatcher {
    pub fn new(params: MatchParams) -> Result<Self, MatchError> {
        if !params.is_valid() {
            return Err(MatchError::InvalidParams(params));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    fn flatten<'a>(regions: &'a [RegionsWithCameraId]) -> Vec<Entry<'a>> {
        regions
            .iter()
            .flat_map(|r| {
                r.candidates
                    .iter()
                    .enumerate()
                    .map(move |(i, c)| Entry {
                        camera_id: r.camera_id,
                        index: i as u32,
                        candidate: c,
                    })
            })
            .collect()
    }

    fn pairs_for(&self, entries: &[Entry<'_>], i: usize, threshold: f32) -> Vec<Pair> {
        let a = &entries[i];
        let mut out = Vec::new();
        for (j, b) in entries.iter().enumerate().skip(i + 1) {
            if a.camera_id == b.camera_id {
                continue;
            }
            let Some(score) = correspondence_score(a.candidate, b.candidate, &self.params) else {
                log::debug!(
                    "pair {:?}/{:?} unscorable: missing height or ground position",
                    a.key(),
                    b.key()
                );
                continue;
            };
            if score < threshold {
                continue;
            }
            let (lo, hi) = if a.key() <= b.key() { (i, j) } else { (j, i) };
            out.push(Pair { score, lo, hi });
        }
        out
    }

    fn scored_pairs(&self, entries: &[Entry<'_>], threshold: f32) -> Vec<Pair> {
        #[cfg(feature = "parallel")]
        let mut pairs: Vec<Pair> = (0..entries.len())
            .into_par_iter()
            .flat_map_iter(|i| self.pairs_for(entries, i, threshold))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let mut pairs: Vec<Pair> = (0..entries.len())
            .flat_map(|i| self.pairs_for(entries, i, threshold))
            .collect();

        pairs.sort_by(pair_order(entries));
        pairs
    }

    /// Group detections across cameras.
    ///
    /// Every input candidate appears in exactly one output element. Merged
    /// groups come first, in the order they were formed, followed by
    /// unmatched candidates in input order. Each element's correlation key
    /// is its output position.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, regions), fields(cameras = regions.len()))
    )]
    pub fn get_matching(
        &self,
        regions: &[RegionsWithCameraId],
        threshold: f32,
    ) -> Result<MVCandidateSet, MatchError> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(MatchError::InvalidThreshold(threshold));
        }

        let entries = Self::flatten(regions);
        Ok(self.match_entries(&entries, threshold))
    }

    /// Matching over already flattened entries; `threshold` is valid.
    pub(crate) fn match_entries(&self, entries: &[Entry<'_>], threshold: f32) -> MVCandidateSet {
        if entries.is_empty() {
            return MVCandidateSet::new();
        }

        let pairs = self.scored_pairs(entries, threshold);
        let mut groups = Groups::new(entries);
        let mut merges = 0usize;
        for (step, p) in pairs.iter().enumerate() {
            if groups.try_union(p.lo, p.hi, step) {
                merges += 1;
            } else {
                log::trace!(
                    "pair {:?}/{:?} (score {:.3}) not merged",
                    entries[p.lo].key(),
                    entries[p.hi].key(),
                    p.score
                );
            }
        }

        // members per root, in flatten order
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
        for i in 0..entries.len() {
            let root = groups.find(i);
            members[root].push(i);
        }

        let mut merged: Vec<(usize, &Vec<usize>)> = Vec::new();
        let mut singles: Vec<usize> = Vec::new();
        for (root, m) in members.iter().enumerate() {
            match groups.formed[root] {
                Some(step) if m.len() > 1 => merged.push((step, m)),
                _ => singles.extend(m.iter().copied()),
            }
        }
        merged.sort_by_key(|(step, _)| *step);

        let mut out = MVCandidateSet::new();
        for (_, m) in merged {
            if let Some(mv) = materialize(entries, m, out.len() as u32) {
                out.push(mv);
            }
        }
        for i in singles {
            if let Some(mv) = materialize(entries, &[i], out.len() as u32) {
                out.push(mv);
            }
        }

        log::debug!(
            "matched {} detection(s) into {} object(s) ({} merge(s), {} pair(s) above {threshold})",
            entries.len(),
            out.len(),
            merges,
            pairs.len()
        );
        out
    }
}

/// Build one output element from group members.
///
/// The representative is the highest-scoring member, ties going to the lower
/// `(camera, index)`.
fn materialize(entries: &[Entry<'_>], members: &[usize], correlation: u32) -> Option<MVCandidate> {
    let mut sorted: Vec<usize> = members.to_vec();
    sorted.sort_by_key(|&i| (entries[i].key(), i));

    let rep = sorted
        .iter()
        .enumerate()
        .min_by(|a, b| {
            let (ea, eb) = (&entries[*a.1], &entries[*b.1]);
            eb.candidate
                .score()
                .partial_cmp(&ea.candidate.score())
                .unwrap_or(Ordering::Equal)
                .then_with(|| ea.key().cmp(&eb.key()))
        })
        .map(|(pos, _)| pos)?;

    let views: Vec<View> = sorted
        .iter()
        .map(|&i| View {
            camera_id: entries[i].camera_id,
            index: entries[i].index,
            candidate: entries[i].candidate.clone(),
        })
        .collect();

    MVCandidate::grouped(correlation, rep, views)
}

/// [`MovingObjectMatcher::get_matching`] with default parameters.
pub fn get_matching(
    regions: &[RegionsWithCameraId],
    threshold: f32,
) -> Result<MVCandidateSet, MatchError> {
    MovingObjectMatcher::default().get_matching(regions, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use scouter_core::{CandidateSet, Rect};

    fn person(x: f32, h: f32, score: f32) -> Candidate {
        let mut c = Candidate::new(Rect::new(100, 50, 40, 120), score).unwrap();
        c.set_height_estimate(h, Point2::new(x, 0.0)).unwrap();
        c
    }

    fn region(camera_id: CameraId, cands: Vec<Candidate>) -> RegionsWithCameraId {
        RegionsWithCameraId::new(camera_id, CandidateSet::from(cands))
    }

    #[test]
    fn threshold_is_validated() {
        for t in [-0.1, 1.5, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                get_matching(&[], t),
                Err(MatchError::InvalidThreshold(_))
            ));
        }
        assert!(get_matching(&[], 0.0).unwrap().is_empty());
        assert!(get_matching(&[], 1.0).unwrap().is_empty());
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = MatchParams {
            sigma_ground: 0.0,
            ..MatchParams::default()
        };
        assert!(MovingObjectMatcher::new(params).is_err());
    }

    #[test]
    fn chain_stops_at_camera_conflict() {
        // cam1 and cam3 both see an object near x = 0, cam2 bridges them;
        // cam1 also has a second detection close to cam2's.
        let regions = vec![
            region(1, vec![person(0.0, 1.7, 0.9), person(0.2, 1.7, 0.5)]),
            region(2, vec![person(0.05, 1.7, 0.8)]),
            region(3, vec![person(0.0, 1.7, 0.7)]),
        ];
        let out = get_matching(&regions, 0.5).unwrap();
        assert_eq!(out.total_views(), 4);
        for mv in &out {
            let cams: BTreeSet<CameraId> = mv.views().iter().map(|v| v.camera_id).collect();
            assert_eq!(cams.len(), mv.group_size());
        }
        assert_eq!(out.get(0).map(|m| m.group_size()), Some(3));
        assert_eq!(out.get(1).map(|m| m.group_size()), Some(1));
    }

    #[test]
    fn representative_is_highest_score() {
        let regions = vec![
            region(4, vec![person(0.0, 1.7, 0.3)]),
            region(2, vec![person(0.0, 1.7, 0.6)]),
        ];
        let out = get_matching(&regions, 0.5).unwrap();
        assert_eq!(out.len(), 1);
        let mv = out.get(0).unwrap();
        assert_eq!(mv.camera_id(), 2);
        assert_eq!(mv.candidate().score(), 0.6);
        assert_eq!(mv.correlation(), Some(0));
        // views sorted by camera
        let cams: Vec<CameraId> = mv.views().iter().map(|v| v.camera_id).collect();
        assert_eq!(cams, vec![2, 4]);
    }

    #[test]
    fn unscorable_candidates_pass_through() {
        let bare = Candidate::new(Rect::new(0, 0, 10, 30), 0.4).unwrap();
        let regions = vec![
            region(1, vec![bare.clone()]),
            region(2, vec![bare]),
        ];
        let out = get_matching(&regions, 0.0).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|m| m.group_size() == 1));
        let corr: Vec<Option<u32>> = out.iter().map(|m| m.correlation()).collect();
        assert_eq!(corr, vec![Some(0), Some(1)]);
    }
}
