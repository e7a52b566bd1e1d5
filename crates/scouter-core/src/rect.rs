use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in image pixel coordinates.
///
/// `(x, y)` is the top-left corner. This is also the element type of the raw
/// rectangle lists produced by external cascade-style detectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Non-negative origin and strictly positive extent.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x >= 0 && self.y >= 0 && self.width > 0 && self.height > 0
    }

    /// Exclusive right edge, computed in `i64` so maximal rects do not overflow.
    #[inline]
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Width over height; `None` for a degenerate rect.
    pub fn aspect_ratio(&self) -> Option<f32> {
        (self.width > 0 && self.height > 0).then(|| self.width as f32 / self.height as f32)
    }

    pub fn intersection_area(&self, other: &Rect) -> i64 {
        let x0 = (self.x as i64).max(other.x as i64);
        let y0 = (self.y as i64).max(other.y as i64);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return 0;
        }
        (x1 - x0) * (y1 - y0)
    }

    /// Intersection over union, `0.0` when either rect is empty.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        (inter as f64 / union as f64) as f32
    }

    /// Bottom-centre point, where an upright object touches the ground.
    #[inline]
    pub fn foot_point(&self) -> Point2<f64> {
        Point2::new(
            self.x as f64 + 0.5 * self.width as f64,
            self.y as f64 + self.height as f64,
        )
    }

    /// Top-centre point.
    #[inline]
    pub fn head_point(&self) -> Point2<f64> {
        Point2::new(self.x as f64 + 0.5 * self.width as f64, self.y as f64)
    }

    /// Translate by a frame offset, saturating on overflow.
    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Clip to `[0, width) x [0, height)`; `None` if nothing remains.
    pub fn clipped(&self, width: usize, height: usize) -> Option<Rect> {
        let w = i64::try_from(width).ok()?;
        let h = i64::try_from(height).ok()?;
        let x0 = (self.x as i64).clamp(0, w);
        let y0 = (self.y as i64).clamp(0, h);
        let x1 = self.right().clamp(0, w);
        let y1 = self.bottom().clamp(0, h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect {
            x: i32::try_from(x0).ok()?,
            y: i32::try_from(y0).ok()?,
            width: i32::try_from(x1 - x0).ok()?,
            height: i32::try_from(y1 - y0).ok()?,
        })
    }
}

impl From<(i32, i32, i32, i32)> for Rect {
    fn from((x, y, width, height): (i32, i32, i32, i32)) -> Self {
        Rect::new(x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_requires_positive_extent() {
        assert!(Rect::new(0, 0, 1, 1).is_valid());
        assert!(!Rect::new(0, 0, 0, 4).is_valid());
        assert!(!Rect::new(-1, 0, 4, 4).is_valid());
        assert!(!Rect::new(0, 0, 4, -2).is_valid());
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 0, 10, 10);
        assert_eq!(a.intersection_area(&b), 50);
        let iou = a.iou(&b);
        assert!((iou - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&Rect::new(20, 20, 5, 5)), 0.0);
    }

    #[test]
    fn maximal_rect_does_not_overflow() {
        let r = Rect::new(i32::MAX, i32::MAX, i32::MAX, i32::MAX);
        assert_eq!(r.right(), 2 * i32::MAX as i64);
        assert!(r.area() > 0);
    }

    #[test]
    fn clipping_to_image_bounds() {
        let r = Rect::new(90, 40, 20, 20);
        assert_eq!(r.clipped(100, 50), Some(Rect::new(90, 40, 10, 10)));
        assert_eq!(Rect::new(200, 0, 5, 5).clipped(100, 50), None);
    }
}
