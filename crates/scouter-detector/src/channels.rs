//! Aggregated channel features.
//!
//! Channels, in order: normalized luma, gradient magnitude, and gradient
//! magnitude split into four unsigned orientation bins over `[0, pi)`. Each
//! channel is averaged over `shrink x shrink` pixel blocks.

use std::f32::consts::PI;

use scouter_core::GrayImageView;

pub const NUM_CHANNELS: usize = 6;
const ORIENTATION_BINS: usize = 4;

/// Channel stack of one image at one scale, laid out `[channel][row][col]`.
#[derive(Clone, Debug)]
pub struct ChannelFeatures {
    pub cols: usize,
    pub rows: usize,
    pub shrink: usize,
    data: Vec<f32>,
}

#[inline]
fn px(img: &GrayImageView<'_>, x: isize, y: isize) -> f32 {
    let x = x.clamp(0, img.width as isize - 1) as usize;
    let y = y.clamp(0, img.height as isize - 1) as usize;
    img.data[y * img.width + x] as f32
}

impl ChannelFeatures {
    pub fn compute(img: &GrayImageView<'_>, shrink: usize) -> Self {
        let shrink = shrink.max(1);
        let cols = img.width / shrink;
        let rows = img.height / shrink;
        let plane = cols * rows;
        let mut data = vec![0.0f32; NUM_CHANNELS * plane];
        if plane == 0 {
            return Self {
                cols,
                rows,
                shrink,
                data,
            };
        }

        let bin_width = PI / ORIENTATION_BINS as f32;
        for y in 0..rows * shrink {
            let cell_row = y / shrink;
            for x in 0..cols * shrink {
                let cell = cell_row * cols + x / shrink;
                let (xi, yi) = (x as isize, y as isize);

                let l = px(img, xi, yi) / 255.0;
                let gx = 0.5 * (px(img, xi + 1, yi) - px(img, xi - 1, yi)) / 255.0;
                let gy = 0.5 * (px(img, xi, yi + 1) - px(img, xi, yi - 1)) / 255.0;
                let mag = (gx * gx + gy * gy).sqrt();

                data[cell] += l;
                data[plane + cell] += mag;
                if mag > 0.0 {
                    let mut theta = gy.atan2(gx);
                    if theta < 0.0 {
                        theta += PI;
                    }
                    let bin = ((theta / bin_width) as usize).min(ORIENTATION_BINS - 1);
                    data[(2 + bin) * plane + cell] += mag;
                }
            }
        }

        let norm = 1.0 / (shrink * shrink) as f32;
        data.iter_mut().for_each(|v| *v *= norm);

        Self {
            cols,
            rows,
            shrink,
            data,
        }
    }

    #[inline]
    pub fn get(&self, channel: usize, row: usize, col: usize) -> f32 {
        self.data[(channel * self.rows + row) * self.cols + col]
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        let plane = self.rows * self.cols;
        &self.data[channel * plane..(channel + 1) * plane]
    }

    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }
}
