use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Point2;
use scouter_core::{CameraId, Candidate, CandidateSet, MVCandidateSet, Rect, RegionsWithCameraId};
use scouter_matcher::{get_matching, MatchError, MatchParams, MovingObjectMatcher};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn person(ground: [f32; 2], height: f32, score: f32, aspect_w: i32) -> Candidate {
    let mut c = Candidate::new(Rect::new(50, 40, aspect_w, 120), score).unwrap();
    c.set_height_estimate(height, Point2::new(ground[0], ground[1]))
        .unwrap();
    c
}

/// Deterministic pseudo-random scene: `cameras` cameras looking at the same
/// few people, each detection jittered.
fn crowd(cameras: i32, per_camera: usize) -> Vec<RegionsWithCameraId> {
    let mut state = 0x2545_f491_u32;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state % 10_000) as f32 / 10_000.0
    };
    (1..=cameras)
        .map(|cam| {
            let set: CandidateSet = (0..per_camera)
                .map(|i| {
                    let gx = i as f32 * 0.9 + 0.4 * next();
                    let gy = 0.4 * next();
                    let h = 1.5 + 0.4 * next();
                    let w = 35 + (10.0 * next()) as i32;
                    person([gx, gy], h, next(), w)
                })
                .collect();
            RegionsWithCameraId::new(cam, set)
        })
        .collect()
}

fn merges(out: &MVCandidateSet) -> usize {
    out.total_views() - out.len()
}

#[test]
fn two_camera_scenario_depends_on_threshold() {
    init_logging();
    let regions = vec![
        RegionsWithCameraId::new(1, vec![person([2.0, 5.0], 1.70, 0.8, 40)]),
        RegionsWithCameraId::new(2, vec![person([2.12, 5.15], 1.58, 0.6, 40)]),
    ];

    let out = get_matching(&regions, 0.5).unwrap();
    assert_eq!(out.len(), 1);
    let group = out.get(0).unwrap();
    assert_eq!(group.group_size(), 2);
    assert_eq!(group.camera_id(), 1);
    assert!(group.is_multi_view());

    let out = get_matching(&regions, 0.95).unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|m| m.group_size() == 1));
}

#[test]
fn empty_regions_give_empty_result() {
    assert!(get_matching(&[], 0.5).unwrap().is_empty());
    let regions = vec![
        RegionsWithCameraId::new(1, CandidateSet::new()),
        RegionsWithCameraId::new(2, CandidateSet::new()),
    ];
    assert!(get_matching(&regions, 0.5).unwrap().is_empty());
}

#[test]
fn out_of_range_threshold_is_rejected() {
    let regions = crowd(2, 2);
    assert_eq!(
        get_matching(&regions, 1.01),
        Err(MatchError::InvalidThreshold(1.01))
    );
    assert!(get_matching(&regions, -0.5).is_err());
}

#[test]
fn every_input_appears_exactly_once() {
    init_logging();
    let mut regions = crowd(4, 6);
    // one camera without height estimates
    regions.push(RegionsWithCameraId::new(
        9,
        vec![Candidate::new(Rect::new(0, 0, 30, 90), 0.5).unwrap()],
    ));
    let input: usize = regions.iter().map(|r| r.candidates.len()).sum();

    for threshold in [0.0, 0.3, 0.6, 0.9, 1.0] {
        let out = get_matching(&regions, threshold).unwrap();
        assert_eq!(out.total_views(), input);

        let mut seen: BTreeMap<(CameraId, u32), usize> = BTreeMap::new();
        for mv in &out {
            for v in mv.views() {
                *seen.entry((v.camera_id, v.index)).or_default() += 1;
            }
        }
        assert_eq!(seen.len(), input);
        assert!(seen.values().all(|&n| n == 1));
    }
}

#[test]
fn groups_never_hold_two_detections_of_one_camera() {
    let regions = crowd(5, 5);
    for threshold in [0.0, 0.2, 0.5, 0.8] {
        let out = get_matching(&regions, threshold).unwrap();
        for mv in &out {
            let cams: BTreeSet<CameraId> = mv.views().iter().map(|v| v.camera_id).collect();
            assert_eq!(cams.len(), mv.group_size(), "threshold {threshold}");
        }
    }
}

#[test]
fn raising_threshold_never_adds_merges() {
    let regions = crowd(4, 5);
    let mut last = usize::MAX;
    for step in 0..=20 {
        let threshold = step as f32 * 0.05;
        let n = merges(&get_matching(&regions, threshold).unwrap());
        assert!(n <= last, "threshold {threshold}: {n} merges > {last}");
        last = n;
    }
    assert!(merges(&get_matching(&regions, 0.0).unwrap()) > 0);
}

#[test]
fn repeated_calls_are_identical() {
    let regions = crowd(3, 6);
    let matcher = MovingObjectMatcher::new(MatchParams::default()).unwrap();
    let a = matcher.get_matching(&regions, 0.4).unwrap();
    let b = matcher.get_matching(&regions, 0.4).unwrap();
    assert_eq!(a, b);

    let bytes_a: Vec<Vec<u8>> = a.iter().map(|m| m.to_bytes()).collect();
    let bytes_b: Vec<Vec<u8>> = b.iter().map(|m| m.to_bytes()).collect();
    assert_eq!(bytes_a, bytes_b);

    for (pos, mv) in a.iter().enumerate() {
        assert_eq!(mv.correlation(), Some(pos as u32));
    }
}

#[test]
fn output_roundtrips_through_codec() {
    let out = get_matching(&crowd(3, 3), 0.3).unwrap();
    for mv in out.resolve() {
        let back = scouter_core::MVCandidate::from_bytes(&mv.to_bytes()).unwrap();
        assert_eq!(back, mv);
    }
}
