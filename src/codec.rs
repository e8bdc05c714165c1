// codec.rs - Codec capability: decode, quality-parameterised encode, resize

use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageReader};
use std::io::Cursor;

use crate::config::OutputFormat;
use crate::error::{CompressionError, Result};

/// Decoded bitmap plus its dimensions. Owned by a single compression call.
#[derive(Debug, Clone)]
pub struct RawFrame {
    image: DynamicImage,
}

impl RawFrame {
    pub fn new(image: DynamicImage) -> Self {
        RawFrame { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

}

/// The narrow imaging capability the pipeline runs against.
///
/// `encode` must be a pure function of its inputs; the quality search relies
/// on repeated calls with the same arguments producing the same size.
pub trait Codec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RawFrame> {
        decode_frame(bytes)
    }

    fn encode(&self, frame: &RawFrame, format: OutputFormat, quality: u8) -> Result<Vec<u8>>;

    fn resize(&self, frame: &RawFrame, width: u32, height: u32) -> Result<RawFrame>;
}

/// Decode any bitmap format the `image` crate recognises.
pub fn decode_frame(bytes: &[u8]) -> Result<RawFrame> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompressionError::InvalidInput(e.to_string()))?
        .decode()
        .map_err(|e| CompressionError::InvalidInput(e.to_string()))?;

    non_empty(image)
}

/// The scale loops need at least one pixel on each side.
fn non_empty(image: DynamicImage) -> Result<RawFrame> {
    if image.width() == 0 || image.height() == 0 {
        return Err(CompressionError::InvalidInput(format!(
            "empty {}x{} frame",
            image.width(),
            image.height()
        )));
    }
    Ok(RawFrame::new(image))
}

/// Production codec backed by `image`, `jpeg-encoder` and `webp`.
#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
    filter: FilterType,
}

impl ImageCodec {
    pub fn new() -> Self {
        ImageCodec {
            filter: FilterType::Lanczos3,
        }
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for ImageCodec {
    fn encode(&self, frame: &RawFrame, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Png => encode_png(frame.image(), quality),
            OutputFormat::Jpeg => encode_jpeg(frame.image(), quality),
            OutputFormat::Webp => encode_webp(frame.image(), quality),
        }
    }

    fn resize(&self, frame: &RawFrame, width: u32, height: u32) -> Result<RawFrame> {
        if width == 0 || height == 0 {
            return Err(CompressionError::CompressionFailed(format!(
                "cannot resize to {}x{}",
                width, height
            )));
        }
        if frame.dimensions() == (width, height) {
            return Ok(frame.clone());
        }

        Ok(RawFrame::new(
            frame.image().resize_exact(width, height, self.filter),
        ))
    }
}

/// Bits kept per channel for a PNG quality. 100 keeps the full 8 bits,
/// lower qualities reduce the palette down to 2 bits per channel.
fn png_channel_bits(quality: u8) -> u32 {
    if quality >= 100 {
        8
    } else {
        2 + (quality as u32 * 6) / 100
    }
}

fn png_compression(quality: u8) -> CompressionType {
    if quality >= 80 {
        CompressionType::Default
    } else {
        CompressionType::Best
    }
}

fn posterize(samples: &mut [u8], bits: u32) {
    if bits >= 8 {
        return;
    }
    let mask = !((1u8 << (8 - bits)) - 1);
    for sample in samples.iter_mut() {
        *sample &= mask;
    }
}

/// Compress image to PNG, reducing the palette as quality drops
fn encode_png(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let bits = png_channel_bits(quality);
    let compression = png_compression(quality);

    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        Cursor::new(&mut buffer),
        compression,
        PngFilterType::Adaptive,
    );

    let result = if img.color().has_alpha() {
        let mut rgba = img.to_rgba8();
        posterize(&mut rgba, bits);
        let (w, h) = rgba.dimensions();
        encoder.write_image(rgba.as_raw(), w, h, ExtendedColorType::Rgba8)
    } else {
        let mut rgb = img.to_rgb8();
        posterize(&mut rgb, bits);
        let (w, h) = rgb.dimensions();
        encoder.write_image(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
    };
    result.map_err(|e| CompressionError::CompressionFailed(format!("PNG encode failed: {}", e)))?;

    Ok(buffer)
}

/// Compress image to progressive JPEG. Alpha is dropped.
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    let (w, h) = match (u16::try_from(w), u16::try_from(h)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(CompressionError::CompressionFailed(format!(
                "{}x{} exceeds the JPEG dimension limit",
                w, h
            )))
        }
    };

    let mut buffer = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut buffer, quality);
    encoder.set_progressive(true);
    encoder
        .encode(rgb.as_raw(), w, h, jpeg_encoder::ColorType::Rgb)
        .map_err(|e| CompressionError::CompressionFailed(format!("JPEG encode failed: {}", e)))?;

    Ok(buffer)
}

/// Compress image to lossy WebP; quality drives colour and alpha alike
fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut config = webp::WebPConfig::new().map_err(|_| {
        CompressionError::CompressionFailed("failed to create WebP config".to_string())
    })?;
    config.lossless = 0;
    config.quality = quality as f32;
    config.alpha_quality = quality as i32;

    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let (w, h) = rgba.dimensions();
        webp::Encoder::from_rgba(rgba.as_raw(), w, h)
            .encode_advanced(&config)
            .map(|mem| mem.to_vec())
    } else {
        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        webp::Encoder::from_rgb(rgb.as_raw(), w, h)
            .encode_advanced(&config)
            .map(|mem| mem.to_vec())
    };

    encoded.map_err(|e| CompressionError::CompressionFailed(format!("WebP encode failed: {:?}", e)))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn frame() -> RawFrame {
        RawFrame::new(desktop_image(96, 64))
    }

    #[test]
    fn test_encode_produces_claimed_format() {
        let codec = ImageCodec::new();
        let cases = [
            (OutputFormat::Png, image::ImageFormat::Png),
            (OutputFormat::Jpeg, image::ImageFormat::Jpeg),
            (OutputFormat::Webp, image::ImageFormat::WebP),
        ];

        for (format, expected) in cases {
            let bytes = codec.encode(&frame(), format, 75).unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), expected, "{}", format);

            let decoded = decode_frame(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (96, 64));
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let codec = ImageCodec::new();
        let frame = RawFrame::new(noise_image(48, 48, 7));

        for format in [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::Webp] {
            let a = codec.encode(&frame, format, 60).unwrap();
            let b = codec.encode(&frame, format, 60).unwrap();
            assert_eq!(a, b, "{}", format);
        }
    }

    #[test]
    fn test_lower_quality_is_not_larger_for_lossy_formats() {
        let codec = ImageCodec::new();
        let frame = RawFrame::new(noise_image(64, 64, 3));

        for format in [OutputFormat::Jpeg, OutputFormat::Webp, OutputFormat::Png] {
            let high = codec.encode(&frame, format, 95).unwrap().len();
            let low = codec.encode(&frame, format, 20).unwrap().len();
            assert!(low < high, "{}: {} !< {}", format, low, high);
        }
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let codec = ImageCodec::new();
        let rgba = RawFrame::new(DynamicImage::new_rgba8(16, 16));
        let bytes = codec.encode(&rgba, OutputFormat::Jpeg, 80).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn test_png_channel_bits() {
        assert_eq!(png_channel_bits(100), 8);
        assert_eq!(png_channel_bits(99), 7);
        assert_eq!(png_channel_bits(50), 5);
        assert_eq!(png_channel_bits(1), 2);
    }

    #[test]
    fn test_posterize_masks_low_bits() {
        let mut samples = [0xffu8, 0x81, 0x0f];
        posterize(&mut samples, 4);
        assert_eq!(samples, [0xf0, 0x80, 0x00]);

        let mut untouched = [0xabu8];
        posterize(&mut untouched, 8);
        assert_eq!(untouched, [0xab]);
    }

    #[test]
    fn test_resize_exact_dimensions() {
        let codec = ImageCodec::new();
        let resized = codec.resize(&frame(), 30, 20).unwrap();
        assert_eq!(resized.dimensions(), (30, 20));
        assert!(codec.resize(&frame(), 0, 20).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_frame(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CompressionError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_sized_frames_are_rejected() {
        for (w, h) in [(0, 10), (10, 0), (0, 0)] {
            let err = non_empty(DynamicImage::new_rgb8(w, h)).unwrap_err();
            assert!(matches!(err, CompressionError::InvalidInput(_)), "{}x{}", w, h);
        }
        assert_eq!(non_empty(DynamicImage::new_rgb8(1, 1)).unwrap().dimensions(), (1, 1));
    }
}
