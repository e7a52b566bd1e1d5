//! Pinhole camera model and ground-plane geometry.
//!
//! World frame: `Z` points up and the ground is the plane `Z = 0`. A world
//! point `(X, Y, Z)` maps to the image through the 3x4 projection `P`:
//! `s [u v 1]^T = P [X Y Z 1]^T`.

use nalgebra::{Matrix3, Matrix3x4, Point2, Vector3};
use serde::{Deserialize, Serialize};

use crate::Homography;

/// Ground-plane geometry failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("projection matrix contains non-finite entries")]
    NonFinite,
    #[error("ground homography is singular")]
    SingularGroundHomography,
    #[error("image point does not intersect the ground plane")]
    NoGroundIntersection,
    #[error("head row is parallel to the vertical axis, height is unobservable")]
    UnobservableHeight,
    #[error("estimated height {height} is not positive")]
    NonPositiveHeight { height: f64 },
}

/// Projection matrix of one camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CalibrationRepr", into = "CalibrationRepr")]
pub struct CameraCalibration {
    projection: Matrix3x4<f64>,
    image_to_ground: Homography,
}

#[derive(Clone, Serialize, Deserialize)]
struct CalibrationRepr {
    /// Row-major 3x4 projection matrix.
    projection: [[f64; 4]; 3],
}

impl TryFrom<CalibrationRepr> for CameraCalibration {
    type Error = CalibrationError;

    fn try_from(r: CalibrationRepr) -> Result<Self, Self::Error> {
        Self::from_rows(r.projection)
    }
}

impl From<CameraCalibration> for CalibrationRepr {
    fn from(c: CameraCalibration) -> Self {
        Self {
            projection: c.to_rows(),
        }
    }
}

impl CameraCalibration {
    /// Build from a projection matrix.
    ///
    /// Fails when `P` has non-finite entries or when its ground homography
    /// `[p1 p2 p4]` is singular (the camera sees the ground edge-on).
    pub fn new(projection: Matrix3x4<f64>) -> Result<Self, CalibrationError> {
        if projection.iter().any(|v| !v.is_finite()) {
            return Err(CalibrationError::NonFinite);
        }
        let ground_to_image = Homography::new(Matrix3::from_columns(&[
            projection.column(0).into_owned(),
            projection.column(1).into_owned(),
            projection.column(3).into_owned(),
        ]));
        let image_to_ground = ground_to_image
            .inverse()
            .ok_or(CalibrationError::SingularGroundHomography)?;
        Ok(Self {
            projection,
            image_to_ground,
        })
    }

    pub fn from_rows(rows: [[f64; 4]; 3]) -> Result<Self, CalibrationError> {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(Matrix3x4::from_row_slice(&flat))
    }

    /// `P = K [R | t]`.
    pub fn from_parts(
        intrinsics: Matrix3<f64>,
        rotation: Matrix3<f64>,
        translation: Vector3<f64>,
    ) -> Result<Self, CalibrationError> {
        let mut rt = Matrix3x4::zeros();
        rt.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        rt.set_column(3, &translation);
        Self::new(intrinsics * rt)
    }

    pub fn projection(&self) -> &Matrix3x4<f64> {
        &self.projection
    }

    pub fn to_rows(&self) -> [[f64; 4]; 3] {
        let p = &self.projection;
        std::array::from_fn(|r| std::array::from_fn(|c| p[(r, c)]))
    }

    /// Project a world point into the image.
    pub fn project(&self, world: Vector3<f64>) -> Option<Point2<f64>> {
        let v = self.projection * world.push(1.0);
        if v[2].abs() < 1e-12 {
            return None;
        }
        Some(Point2::new(v[0] / v[2], v[1] / v[2]))
    }

    /// Back-project an image point onto the ground plane.
    pub fn project_to_ground(&self, image: Point2<f64>) -> Result<Point2<f64>, CalibrationError> {
        self.image_to_ground
            .apply(image)
            .ok_or(CalibrationError::NoGroundIntersection)
    }

    /// Height of a vertical segment standing at `ground` whose top projects
    /// onto image row `head_v`.
    pub fn height_at(&self, ground: Point2<f64>, head_v: f64) -> Result<f64, CalibrationError> {
        let p = &self.projection;
        let (x, y) = (ground.x, ground.y);
        let num = p[(1, 0)] * x + p[(1, 1)] * y + p[(1, 3)]
            - head_v * (p[(2, 0)] * x + p[(2, 1)] * y + p[(2, 3)]);
        let den = head_v * p[(2, 2)] - p[(1, 2)];
        if den.abs() < 1e-12 {
            return Err(CalibrationError::UnobservableHeight);
        }
        let height = num / den;
        if !height.is_finite() || height <= 0.0 {
            return Err(CalibrationError::NonPositiveHeight { height });
        }
        Ok(height)
    }

    /// Ground position of the foot point and height from the head row.
    pub fn measure(
        &self,
        foot: Point2<f64>,
        head: Point2<f64>,
    ) -> Result<(Point2<f64>, f64), CalibrationError> {
        let ground = self.project_to_ground(foot)?;
        let height = self.height_at(ground, head.y)?;
        Ok((ground, height))
    }
}
