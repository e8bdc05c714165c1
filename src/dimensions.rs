// dimensions.rs - Pre-search dimension cap

use crate::codec::{Codec, RawFrame};
use crate::error::Result;

/// Calculate dimensions that fit inside the bounds, maintaining aspect ratio.
/// Never enlarges; each side is at least 1px.
pub fn fit_inside(
    width: u32,
    height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    let width_ratio = max_width.map(|m| m as f64 / width as f64).unwrap_or(1.0);
    let height_ratio = max_height.map(|m| m as f64 / height as f64).unwrap_or(1.0);
    let ratio = width_ratio.min(height_ratio);

    if ratio >= 1.0 {
        return (width, height);
    }

    (
        ((width as f64 * ratio).round() as u32).min(width).max(1),
        ((height as f64 * ratio).round() as u32).min(height).max(1),
    )
}

/// Cap a frame to the configured maximum width/height. Frames that already
/// fit, or calls with no bounds, come back untouched.
pub fn constrain(
    codec: &dyn Codec,
    frame: RawFrame,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Result<RawFrame> {
    if max_width.is_none() && max_height.is_none() {
        return Ok(frame);
    }

    let (width, height) = frame.dimensions();
    let (new_width, new_height) = fit_inside(width, height, max_width, max_height);
    if (new_width, new_height) == (width, height) {
        return Ok(frame);
    }

    log::debug!(
        "constraining frame {}x{} -> {}x{}",
        width,
        height,
        new_width,
        new_height
    );
    codec.resize(&frame, new_width, new_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ImageCodec;
    use image::DynamicImage;

    #[test]
    fn test_fit_inside() {
        assert_eq!(fit_inside(800, 600, Some(400), None), (400, 300));
        assert_eq!(fit_inside(400, 300, Some(400), None), (400, 300));
        assert_eq!(fit_inside(200, 150, Some(400), Some(400)), (200, 150));
        assert_eq!(fit_inside(800, 600, Some(1000), Some(300)), (400, 300));
        assert_eq!(fit_inside(2560, 1440, Some(1280), Some(960)), (1280, 720));
        assert_eq!(fit_inside(800, 600, None, None), (800, 600));
    }

    #[test]
    fn test_fit_inside_keeps_thin_frames_visible() {
        assert_eq!(fit_inside(10_000, 2, Some(100), None), (100, 1));
        assert_eq!(fit_inside(0, 600, Some(400), Some(300)), (1, 300));
    }

    #[test]
    fn test_constrain_without_bounds_is_identity() {
        let codec = ImageCodec::new();
        let frame = RawFrame::new(DynamicImage::new_rgb8(120, 80));
        let out = constrain(&codec, frame, None, None).unwrap();
        assert_eq!(out.dimensions(), (120, 80));
    }

    #[test]
    fn test_constrain_never_upscales() {
        let codec = ImageCodec::new();
        let frame = RawFrame::new(DynamicImage::new_rgb8(120, 80));
        let out = constrain(&codec, frame, Some(1920), Some(1080)).unwrap();
        assert_eq!(out.dimensions(), (120, 80));
    }

    #[test]
    fn test_constrain_preserves_aspect_ratio() {
        let codec = ImageCodec::new();
        let frame = RawFrame::new(DynamicImage::new_rgb8(300, 200));
        let out = constrain(&codec, frame, Some(150), Some(150)).unwrap();
        assert_eq!(out.dimensions(), (150, 100));
    }
}
