use scouter_core::Rect;

use crate::params::{MaskConfig, MaskMode};

/// Rasterized validity mask with an integral image for area queries.
#[derive(Clone, Debug)]
pub(crate) struct Mask {
    width: usize,
    height: usize,
    mode: MaskMode,
    min_coverage: f32,
    // (width + 1) x (height + 1) prefix sums of valid pixels
    integral: Vec<u64>,
}

impl Mask {
    pub(crate) fn from_config(cfg: &MaskConfig) -> Self {
        let [width, height] = cfg.frame_size;
        let mut valid = vec![false; width * height];
        for r in cfg.valid.iter().filter_map(|r| r.clipped(width, height)) {
            let (x0, y0) = (r.x as usize, r.y as usize);
            for y in y0..y0 + r.height as usize {
                valid[y * width + x0..y * width + x0 + r.width as usize].fill(true);
            }
        }

        let stride = width + 1;
        let mut integral = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0u64;
            for x in 0..width {
                row += valid[y * width + x] as u64;
                integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row;
            }
        }

        Self {
            width,
            height,
            mode: cfg.mode,
            min_coverage: cfg.min_coverage,
            integral,
        }
    }

    fn valid_pixels(&self, r: Rect) -> u64 {
        let Some(c) = r.clipped(self.width, self.height) else {
            return 0;
        };
        let stride = self.width + 1;
        let (x0, y0) = (c.x as usize, c.y as usize);
        let (x1, y1) = (x0 + c.width as usize, y0 + c.height as usize);
        self.integral[y1 * stride + x1] + self.integral[y0 * stride + x0]
            - self.integral[y0 * stride + x1]
            - self.integral[y1 * stride + x0]
    }

    /// Fraction of `r` lying on valid pixels; pixels outside the frame count
    /// as invalid.
    pub(crate) fn coverage(&self, r: Rect) -> f32 {
        let area = r.area();
        if area <= 0 {
            return 0.0;
        }
        (self.valid_pixels(r) as f64 / area as f64) as f32
    }

    pub(crate) fn contains(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.valid_pixels(Rect::new(x as i32, y as i32, 1, 1)) == 1
    }

    /// Verdict for a rect in full-frame coordinates.
    pub(crate) fn accepts(&self, r: Rect) -> bool {
        match self.mode {
            MaskMode::Coverage => self.coverage(r) >= self.min_coverage,
            MaskMode::FootPoint => {
                let foot = r.foot_point();
                // the bottom edge is exclusive, sample the last pixel row
                self.contains(foot.x.floor() as i64, foot.y as i64 - 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(mode: MaskMode) -> Mask {
        Mask::from_config(&MaskConfig {
            frame_size: [100, 50],
            valid: vec![Rect::new(0, 20, 50, 30), Rect::new(40, 0, 10, 10)],
            mode,
            min_coverage: 0.5,
        })
    }

    #[test]
    fn coverage_counts_union_once() {
        let m = mask(MaskMode::Coverage);
        assert_eq!(m.coverage(Rect::new(0, 20, 50, 30)), 1.0);
        assert_eq!(m.coverage(Rect::new(60, 0, 10, 10)), 0.0);
        assert!((m.coverage(Rect::new(25, 10, 50, 20)) - 0.25).abs() < 1e-6);
        // half the rect hangs outside the frame
        assert!((m.coverage(Rect::new(0, 40, 10, 20)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn foot_point_mode_looks_at_bottom_centre() {
        let m = mask(MaskMode::FootPoint);
        // foot at (45, 50): inside the lower region
        assert!(m.accepts(Rect::new(40, 10, 10, 40)));
        // foot at (75, 30): outside
        assert!(!m.accepts(Rect::new(70, 0, 10, 30)));
    }
}
