use crate::Rect;

/// Image construction and cropping failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image dimensions must be positive (got {width}x{height})")]
    EmptyImage { width: usize, height: usize },
    #[error("pixel buffer has {got} bytes, expected {expected}")]
    DataLength { expected: usize, got: usize },
    #[error("crop region {rect:?} does not intersect a {width}x{height} image")]
    CropOutOfBounds {
        rect: Rect,
        width: usize,
        height: usize,
    },
}

/// Borrowed dense RGB image, row-major, 3 bytes per pixel.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned dense RGB image, row-major, 3 bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

fn check_dims(width: usize, height: usize, bpp: usize, len: usize) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::EmptyImage { width, height });
    }
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(bpp))
        .ok_or(ImageError::EmptyImage { width, height })?;
    if expected != len {
        return Err(ImageError::DataLength { expected, got: len });
    }
    Ok(())
}

impl<'a> RgbImageView<'a> {
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        check_dims(width, height, 3, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Re-run the size checks on a view built by hand.
    pub fn validate(&self) -> Result<(), ImageError> {
        check_dims(self.width, self.height, 3, self.data.len())
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = 3 * (y * self.width + x);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// BT.601 luma.
    pub fn to_luma(&self) -> GrayImage {
        let data = self
            .data
            .chunks_exact(3)
            .map(|p| {
                let y = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Copy out the part of `rect` that lies inside the image.
    ///
    /// Returns the crop together with the clipped rect it was taken from.
    pub fn crop(&self, rect: Rect) -> Result<(RgbImage, Rect), ImageError> {
        let clip = rect
            .clipped(self.width, self.height)
            .ok_or(ImageError::CropOutOfBounds {
                rect,
                width: self.width,
                height: self.height,
            })?;
        let (x0, y0) = (clip.x as usize, clip.y as usize);
        let (w, h) = (clip.width as usize, clip.height as usize);
        let mut data = Vec::with_capacity(w * h * 3);
        for y in y0..y0 + h {
            let start = 3 * (y * self.width + x0);
            data.extend_from_slice(&self.data[start..start + 3 * w]);
        }
        Ok((
            RgbImage {
                width: w,
                height: h,
                data,
            },
            clip,
        ))
    }
}

impl RgbImage {
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        check_dims(width, height, 3, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// `(width, height, bytes)`.
    pub fn to_raw(self) -> (usize, usize, Vec<u8>) {
        (self.width, self.height, self.data)
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

impl GrayImage {
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    // clamp to edge so downscaled borders do not darken
    let x = x.clamp(0, src.width as i32 - 1) as usize;
    let y = y.clamp(0, src.height as i32 - 1) as usize;
    src.data[y * src.width + x]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

/// Resample to `width x height` with pixel-centre aligned bilinear sampling.
pub fn resize_bilinear(src: &GrayImageView<'_>, width: usize, height: usize) -> GrayImage {
    if width == src.width && height == src.height {
        return GrayImage {
            width,
            height,
            data: src.data.to_vec(),
        };
    }
    let sx = src.width as f32 / width as f32;
    let sy = src.height as f32 / height as f32;
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        let fy = (y as f32 + 0.5) * sy - 0.5;
        for x in 0..width {
            let fx = (x as f32 + 0.5) * sx - 0.5;
            data.push(sample_bilinear(src, fx, fy).round().clamp(0.0, 255.0) as u8);
        }
    }
    GrayImage {
        width,
        height,
        data,
    }
}
