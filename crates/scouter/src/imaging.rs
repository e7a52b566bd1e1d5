//! Conversions between `image` buffers and the lightweight `scouter-core`
//! image types, JPEG encoding, and candidate visualization.

use ::image::codecs::jpeg::JpegEncoder;
use ::image::{ExtendedColorType, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as DrawRect;
use scouter_core::{
    CameraId, Candidate, ImageError, MVCandidateSet, MaskVerdict, Rect, RgbImage, RgbImageView,
};

use crate::ScouterError;

pub const ACCEPTED: [u8; 3] = [0, 220, 0];
pub const REJECTED: [u8; 3] = [230, 30, 30];
pub const NOT_EVALUATED: [u8; 3] = [240, 200, 0];

const PALETTE: [[u8; 3]; 8] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
];

/// Borrow an `image::RgbImage` as a `scouter-core` view.
pub fn rgb_view(img: &::image::RgbImage) -> RgbImageView<'_> {
    RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Decode any format `image` understands into an owned RGB image.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ScouterError> {
    let img = ::image::load_from_memory(bytes)?.to_rgb8();
    let (w, h) = img.dimensions();
    Ok(RgbImage::from_raw(w as usize, h as usize, img.into_raw())?)
}

/// Encode a view as JPEG. `quality` is clamped to `1..=100`.
pub fn encode_jpeg(view: &RgbImageView<'_>, quality: u8) -> Result<Vec<u8>, ScouterError> {
    view.validate()?;
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder.encode(
        view.data,
        view.width as u32,
        view.height as u32,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// Colour of the rect outline for a candidate's mask verdict.
pub fn verdict_color(verdict: MaskVerdict) -> [u8; 3] {
    match verdict {
        MaskVerdict::Accepted => ACCEPTED,
        MaskVerdict::Rejected => REJECTED,
        MaskVerdict::NotEvaluated => NOT_EVALUATED,
    }
}

/// Stable colour for a correlation key.
pub fn correlation_color(correlation: Option<u32>) -> [u8; 3] {
    match correlation {
        Some(key) => PALETTE[key as usize % PALETTE.len()],
        None => NOT_EVALUATED,
    }
}

fn to_buffer(view: &RgbImageView<'_>) -> Result<::image::RgbImage, ScouterError> {
    view.validate()?;
    ::image::RgbImage::from_raw(view.width as u32, view.height as u32, view.data.to_vec()).ok_or(
        ScouterError::Image(ImageError::DataLength {
            expected: view.width * view.height * 3,
            got: view.data.len(),
        }),
    )
}

fn from_buffer(img: ::image::RgbImage) -> Result<RgbImage, ScouterError> {
    let (w, h) = img.dimensions();
    Ok(RgbImage::from_raw(w as usize, h as usize, img.into_raw())?)
}

/// Two-pixel outline; rects with no area are skipped.
fn outline(canvas: &mut ::image::RgbImage, rect: Rect, color: [u8; 3]) {
    if rect.width <= 0 || rect.height <= 0 {
        return;
    }
    let outer = DrawRect::at(rect.x, rect.y).of_size(rect.width as u32, rect.height as u32);
    draw_hollow_rect_mut(canvas, outer, Rgb(color));
    if rect.width > 2 && rect.height > 2 {
        let inner = DrawRect::at(rect.x + 1, rect.y + 1)
            .of_size(rect.width as u32 - 2, rect.height as u32 - 2);
        draw_hollow_rect_mut(canvas, inner, Rgb(color));
    }
}

/// Copy of `view` with every rect outlined in `color`.
pub fn draw_rects(
    view: &RgbImageView<'_>,
    rects: &[Rect],
    color: [u8; 3],
) -> Result<RgbImage, ScouterError> {
    let mut canvas = to_buffer(view)?;
    for &r in rects {
        outline(&mut canvas, r, color);
    }
    from_buffer(canvas)
}

/// Copy of `view` with each candidate outlined in its verdict colour.
pub fn draw_candidates<'c>(
    view: &RgbImageView<'_>,
    candidates: impl IntoIterator<Item = &'c Candidate>,
) -> Result<RgbImage, ScouterError> {
    let mut canvas = to_buffer(view)?;
    for c in candidates {
        outline(&mut canvas, c.rect(), verdict_color(c.verdict()));
    }
    from_buffer(canvas)
}

/// Copy of `view` (an image of camera `camera_id`) with that camera's views
/// of every matched object outlined, one colour per correlation key.
pub fn draw_mv_candidates(
    view: &RgbImageView<'_>,
    camera_id: CameraId,
    objects: &MVCandidateSet,
) -> Result<RgbImage, ScouterError> {
    let mut canvas = to_buffer(view)?;
    for mv in objects {
        let color = correlation_color(mv.correlation());
        for v in mv.views().iter().filter(|v| v.camera_id == camera_id) {
            outline(&mut canvas, v.candidate.rect(), color);
        }
    }
    from_buffer(canvas)
}
