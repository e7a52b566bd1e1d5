//! Sliding-window scoring and non-maximum suppression.

use std::cmp::Ordering;

use scouter_core::Rect;

use crate::channels::{ChannelFeatures, NUM_CHANNELS};
use crate::params::AcfModel;

/// A scored window in source-image pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub rect: Rect,
    pub score: f32,
}

/// Linear score `w . f + b` of the window whose top-left cell is `(row, col)`.
fn window_score(model: &AcfModel, features: &ChannelFeatures, row: usize, col: usize) -> f32 {
    let [cw, ch] = model.cells();
    let mut acc = model.bias;
    for c in 0..NUM_CHANNELS {
        for y in 0..ch {
            let base = (c * ch + y) * cw;
            for x in 0..cw {
                acc += model.weights[base + x] * features.get(c, row + y, col + x);
            }
        }
    }
    acc
}

/// Score every window position of `model` on `features`.
///
/// `scale` is the factor the source image was resized by before the
/// features were computed; returned rects are mapped back to source pixels.
pub fn scan_model(model: &AcfModel, features: &ChannelFeatures, scale: f32) -> Vec<Detection> {
    let [cw, ch] = model.cells();
    let mut out = Vec::new();
    if features.cols < cw || features.rows < ch {
        return out;
    }

    let inv = 1.0 / scale;
    let win_w = ((model.window[0] as f32 * inv).round() as i32).max(1);
    let win_h = ((model.window[1] as f32 * inv).round() as i32).max(1);
    let shrink = features.shrink as f32;

    for row in (0..=features.rows - ch).step_by(model.stride) {
        for col in (0..=features.cols - cw).step_by(model.stride) {
            let score = window_score(model, features, row, col);
            if score < model.threshold {
                continue;
            }
            out.push(Detection {
                rect: Rect::new(
                    (col as f32 * shrink * inv).round() as i32,
                    (row as f32 * shrink * inv).round() as i32,
                    win_w,
                    win_h,
                ),
                score,
            });
        }
    }
    out
}

fn by_score_then_position(a: &Detection, b: &Detection) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| (a.rect.y, a.rect.x).cmp(&(b.rect.y, b.rect.x)))
        .then_with(|| (a.rect.height, a.rect.width).cmp(&(b.rect.height, b.rect.width)))
}

/// Greedy NMS: visit detections best first and drop any whose IoU with an
/// already kept detection exceeds `overlap`.
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    overlap: f32,
    max_detections: Option<usize>,
) -> Vec<Detection> {
    detections.sort_by(by_score_then_position);
    let limit = max_detections.unwrap_or(usize::MAX);
    let mut kept: Vec<Detection> = Vec::new();
    for d in detections {
        if kept.len() >= limit {
            break;
        }
        if kept.iter().all(|k| k.rect.iou(&d.rect) <= overlap) {
            kept.push(d);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use scouter_core::GrayImage;

    fn det(x: i32, y: i32, score: f32) -> Detection {
        Detection {
            rect: Rect::new(x, y, 10, 20),
            score,
        }
    }

    #[test]
    fn nms_keeps_best_of_overlapping_pair() {
        let dets = vec![det(0, 0, 0.5), det(2, 0, 0.9), det(50, 0, 0.1)];
        let kept = non_max_suppression(dets, 0.5, None);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].rect.x, 50);
    }

    #[test]
    fn nms_ties_break_by_position() {
        let kept = non_max_suppression(vec![det(40, 0, 1.0), det(0, 0, 1.0)], 0.5, Some(1));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].rect.x, 0);
    }

    #[test]
    fn bright_block_is_found_by_luma_weight() {
        // 16x16 image, bright 8x8 block at (8, 4)
        let mut data = vec![0u8; 16 * 16];
        for y in 4..12 {
            for x in 8..16 {
                data[y * 16 + x] = 255;
            }
        }
        let img = GrayImage {
            width: 16,
            height: 16,
            data,
        };
        let features = ChannelFeatures::compute(&img.view(), 4);
        let mut model = AcfModel {
            name: "luma".into(),
            window: [8, 8],
            shrink: 4,
            stride: 1,
            scales: vec![1.0],
            weights: Vec::new(),
            bias: -3.5,
            threshold: 0.0,
        };
        model.weights = vec![0.0; model.feature_len()];
        model.weights[..4].fill(1.0);

        let dets = scan_model(&model, &features, 1.0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].rect, Rect::new(8, 4, 8, 8));
        assert!((dets[0].score - 0.5).abs() < 1e-5);

        let half = scan_model(&model, &features, 0.5);
        assert_eq!(half[0].rect, Rect::new(16, 8, 16, 16));
    }
}
