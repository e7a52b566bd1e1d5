//! Pairwise correspondence score between detections from two cameras.
//!
//! ```text
//! geometric  = exp(-d^2 / (2 sigma_ground^2))          (0 beyond max distance)
//! s_height   = exp(-r^2 / (2 sigma_height^2)),   r = |h1 - h2| / max(h1, h2)
//! s_aspect   = min(a1, a2) / max(a1, a2)
//! appearance = (1 - w) + w * s_height * s_aspect
//! score      = geometric * appearance                  in [0, 1]
//! ```
//!
//! The score strictly decreases with ground distance for fixed appearance.

use scouter_core::Candidate;

use crate::MatchParams;

#[inline]
fn gaussian(x: f32, sigma: f32) -> f32 {
    (-(x * x) / (2.0 * sigma * sigma)).exp()
}

pub fn geometric_score(distance: f32, params: &MatchParams) -> f32 {
    if distance > params.max_ground_distance {
        return 0.0;
    }
    gaussian(distance, params.sigma_ground)
}

pub fn appearance_score(a: &Candidate, b: &Candidate, params: &MatchParams) -> Option<f32> {
    let (ha, hb) = (a.height()?, b.height()?);
    let r = (ha - hb).abs() / ha.max(hb);
    let s_height = gaussian(r, params.sigma_height);

    let (aa, ab) = (a.rect().aspect_ratio()?, b.rect().aspect_ratio()?);
    let s_aspect = aa.min(ab) / aa.max(ab);

    let w = params.appearance_weight;
    Some((1.0 - w) + w * s_height * s_aspect)
}

/// Score of `a` and `b` referring to the same object.
///
/// `None` when either candidate lacks a height estimate or ground position;
/// such pairs can never be merged.
pub fn correspondence_score(a: &Candidate, b: &Candidate, params: &MatchParams) -> Option<f32> {
    let (ga, gb) = (a.ground()?, b.ground()?);
    let d = (ga - gb).norm();
    let score = geometric_score(d, params) * appearance_score(a, b, params)?;
    Some(score.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use scouter_core::Rect;

    fn person(x: f32, y: f32, h: f32) -> Candidate {
        let mut c = Candidate::new(Rect::new(0, 0, 40, 120), 0.9).unwrap();
        c.set_height_estimate(h, Point2::new(x, y)).unwrap();
        c
    }

    #[test]
    fn identical_candidates_score_one() {
        let a = person(1.0, 2.0, 1.7);
        let s = correspondence_score(&a, &a, &MatchParams::default()).unwrap();
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn close_similar_pair_scores_high_but_not_perfect() {
        let p = MatchParams::default();
        let s = correspondence_score(&person(0.0, 0.0, 1.70), &person(0.18, 0.0, 1.58), &p)
            .unwrap();
        assert!(s >= 0.8, "score {s}");
        assert!(s < 0.95, "score {s}");
    }

    #[test]
    fn score_decreases_with_distance() {
        let p = MatchParams::default();
        let a = person(0.0, 0.0, 1.7);
        let mut last = f32::INFINITY;
        for i in 0..10 {
            let b = person(0.15 * i as f32, 0.0, 1.7);
            let s = correspondence_score(&a, &b, &p).unwrap();
            assert!(s < last);
            last = s;
        }
        assert_eq!(correspondence_score(&a, &person(5.0, 0.0, 1.7), &p), Some(0.0));
    }

    #[test]
    fn missing_height_is_unscorable() {
        let a = person(0.0, 0.0, 1.7);
        let b = Candidate::new(Rect::new(0, 0, 40, 120), 0.9).unwrap();
        assert_eq!(correspondence_score(&a, &b, &MatchParams::default()), None);
    }
}
