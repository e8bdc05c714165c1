// payload.rs - Base64 / data-URL screenshot payloads

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{CompressionError, Result};

const DATA_URL_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// A payload split into its optional data-URL subtype and base64 body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload<'a> {
    /// `png` in `data:image/png;base64,...`; `None` for bare base64.
    pub subtype: Option<&'a str>,
    pub base64: &'a str,
}

impl Payload<'_> {
    pub fn media_type(&self) -> Option<String> {
        self.subtype.map(|s| format!("image/{}", s.to_ascii_lowercase()))
    }
}

/// Strip an optional `data:image/<subtype>;base64,` prefix.
/// Any other `data:` URL is rejected.
pub fn parse(raw: &str) -> Result<Payload<'_>> {
    let raw = raw.trim();

    if raw.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:")) {
        let rest = raw
            .get(DATA_URL_PREFIX.len()..)
            .filter(|_| raw[..DATA_URL_PREFIX.len()].eq_ignore_ascii_case(DATA_URL_PREFIX))
            .ok_or_else(|| CompressionError::InvalidInput("data URL is not an image".to_string()))?;

        let (subtype, body) = rest.split_once(BASE64_MARKER).ok_or_else(|| {
            CompressionError::InvalidInput("data URL is not base64 encoded".to_string())
        })?;
        if subtype.is_empty() || subtype.contains([',', ';']) {
            return Err(CompressionError::InvalidInput(format!(
                "malformed data URL subtype {:?}",
                subtype
            )));
        }

        return Ok(Payload {
            subtype: Some(subtype),
            base64: body.trim(),
        });
    }

    Ok(Payload {
        subtype: None,
        base64: raw,
    })
}

/// Decode the base64 body of a payload to raw image bytes.
pub fn decode(payload: &Payload<'_>) -> Result<Vec<u8>> {
    if payload.base64.is_empty() {
        return Err(CompressionError::InvalidInput("empty payload".to_string()));
    }

    BASE64
        .decode(payload.base64)
        .map_err(|e| CompressionError::InvalidInput(format!("malformed base64: {}", e)))
}

pub fn encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// MIME type from the leading magic bytes, for payloads without a data URL.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        image::ImageFormat::Png => Some("image/png"),
        image::ImageFormat::Jpeg => Some("image/jpeg"),
        image::ImageFormat::WebP => Some("image/webp"),
        image::ImageFormat::Gif => Some("image/gif"),
        image::ImageFormat::Bmp => Some("image/bmp"),
        image::ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}
