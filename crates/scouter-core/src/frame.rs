use crate::{CameraId, ImageError, Rect, RgbImage, RgbImageView};

/// A processed image from one camera plus its position in the full frame.
///
/// Detections made on `image` carry `offset` so that downstream stages
/// (mask check, height estimation, drawing) can work in full-frame pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub camera_id: CameraId,
    pub offset: [i32; 2],
    pub image: RgbImage,
}

impl Frame {
    /// The whole camera frame, offset `(0, 0)`.
    pub fn full(camera_id: CameraId, image: RgbImage) -> Self {
        Self {
            camera_id,
            offset: [0, 0],
            image,
        }
    }

    /// Crop the region of interest `roi` out of `full_frame`.
    ///
    /// The ROI is clipped to the frame; the recorded offset is the clipped
    /// top-left corner.
    pub fn from_roi(
        camera_id: CameraId,
        full_frame: &RgbImageView<'_>,
        roi: Rect,
    ) -> Result<Self, ImageError> {
        let (image, clip) = full_frame.crop(roi)?;
        log::debug!(
            "camera {camera_id}: roi {:?} -> {}x{} at ({}, {})",
            roi,
            image.width,
            image.height,
            clip.x,
            clip.y
        );
        Ok(Self {
            camera_id,
            offset: [clip.x, clip.y],
            image,
        })
    }

    pub fn view(&self) -> RgbImageView<'_> {
        self.image.view()
    }

    #[inline]
    pub fn offset_x(&self) -> i32 {
        self.offset[0]
    }

    #[inline]
    pub fn offset_y(&self) -> i32 {
        self.offset[1]
    }
}
