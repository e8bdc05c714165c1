// screenshot.rs - Tool-result image blocks with graceful fallback

use serde::Serialize;

use crate::codec::Codec;
use crate::compress::{CompressionOutcome, CompressionResult, Compressor};
use crate::payload;

const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// `{ "type": "base64", "media_type": ..., "data": ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub media_type: String,
    pub data: String,
}

/// Image content block embedded in a tool result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageContentBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub source: ImageSource,
}

impl ImageContentBlock {
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        ImageContentBlock {
            kind: "image",
            source: ImageSource {
                kind: "base64",
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }
}

/// A prepared screenshot and how it was produced
#[derive(Debug, Clone)]
pub struct PreparedScreenshot {
    pub block: ImageContentBlock,
    /// Present when the pipeline produced the payload.
    pub compression: Option<CompressionResult>,
}

impl PreparedScreenshot {
    pub fn compressed(&self) -> bool {
        self.compression.is_some()
    }
}

/// Compress a captured frame for the model. Never fails: any pipeline error
/// is logged and the original frame is sent as-is.
pub fn prepare_screenshot<C: Codec + 'static>(compressor: &Compressor<C>, raw: &str) -> PreparedScreenshot {
    match compressor.compress_to_fit(raw) {
        Ok(CompressionOutcome::Compressed(result)) => PreparedScreenshot {
            block: ImageContentBlock::base64(result.media_type(), result.base64.clone()),
            compression: Some(result),
        },
        Ok(CompressionOutcome::Bypassed(raw)) => original(&raw),
        Err(err) => {
            compressor.logger().log_fallback(raw.len(), &err);
            original(raw)
        }
    }
}

/// Async variant; the pipeline runs on the blocking pool.
pub async fn prepare_screenshot_async<C: Codec + 'static>(
    compressor: &Compressor<C>,
    raw: String,
) -> PreparedScreenshot {
    match compressor.compress_to_fit_async(raw.clone()).await {
        Ok(CompressionOutcome::Compressed(result)) => PreparedScreenshot {
            block: ImageContentBlock::base64(result.media_type(), result.base64.clone()),
            compression: Some(result),
        },
        Ok(CompressionOutcome::Bypassed(raw)) => original(&raw),
        Err(err) => {
            compressor.logger().log_fallback(raw.len(), &err);
            original(&raw)
        }
    }
}

/// Block for an unprocessed frame: data-URL prefix stripped, media type from
/// the prefix or the decoded magic bytes.
fn original(raw: &str) -> PreparedScreenshot {
    let (media_type, data) = match payload::parse(raw) {
        Ok(parsed) => {
            let media_type = parsed.media_type().or_else(|| {
                payload::decode(&parsed)
                    .ok()
                    .and_then(|bytes| payload::sniff_media_type(&bytes))
                    .map(str::to_string)
            });
            (media_type, parsed.base64.to_string())
        }
        Err(_) => (None, raw.trim().to_string()),
    };

    PreparedScreenshot {
        block: ImageContentBlock::base64(
            media_type.unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string()),
            data,
        ),
        compression: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::testing::{desktop_image, ModelCodec};
    use crate::config::{CompressionConfig, OutputFormat};
    use crate::logger::Logger;
    use image::ImageFormat;
    use std::io::Cursor;
    use std::sync::Arc;

    fn jpeg_base64() -> String {
        let mut bytes = Vec::new();
        desktop_image(40, 30)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .unwrap();
        payload::encode(&bytes)
    }

    fn compressor(config: CompressionConfig) -> Compressor {
        Compressor::new(Arc::new(config)).with_logger(Logger::silent())
    }

    #[test]
    fn test_compressed_block_uses_output_format() {
        let config = CompressionConfig::builder().format(OutputFormat::Webp).build().unwrap();
        let prepared = prepare_screenshot(&compressor(config), &jpeg_base64());

        assert!(prepared.compressed());
        assert_eq!(prepared.block.kind, "image");
        assert_eq!(prepared.block.source.kind, "base64");
        assert_eq!(prepared.block.source.media_type, "image/webp");
        assert_eq!(prepared.block.source.data, prepared.compression.unwrap().base64);
    }

    #[test]
    fn test_malformed_input_falls_back_to_raw() {
        let config = CompressionConfig::default();
        let raw = "this is !!! not base64";

        let prepared = prepare_screenshot(&compressor(config), raw);

        assert!(!prepared.compressed());
        assert_eq!(prepared.block.source.data, raw);
        assert_eq!(prepared.block.source.media_type, "image/png");
    }

    #[test]
    fn test_codec_failure_falls_back_with_sniffed_type() {
        let raw = jpeg_base64();
        let compressor = Compressor::with_codec(Arc::new(CompressionConfig::default()), ModelCodec::failing())
            .with_logger(Logger::silent());

        let prepared = prepare_screenshot(&compressor, &raw);

        assert!(!prepared.compressed());
        assert_eq!(prepared.block.source.data, raw);
        assert_eq!(prepared.block.source.media_type, "image/jpeg");
    }

    #[test]
    fn test_bypass_strips_prefix_and_keeps_media_type() {
        let config = CompressionConfig::builder().enabled(false).build().unwrap();
        let raw = format!("data:image/jpeg;base64,{}", jpeg_base64());

        let prepared = prepare_screenshot(&compressor(config), &raw);

        assert!(!prepared.compressed());
        assert_eq!(prepared.block.source.media_type, "image/jpeg");
        assert_eq!(prepared.block.source.data, jpeg_base64());
    }

    #[tokio::test]
    async fn test_async_fallback() {
        let compressor = compressor(CompressionConfig::default());
        let prepared = prepare_screenshot_async(&compressor, "@@@".to_string()).await;
        assert!(!prepared.compressed());
        assert_eq!(prepared.block.source.data, "@@@");
    }

    #[test]
    fn test_block_serializes_like_a_tool_result() {
        let block = ImageContentBlock::base64("image/png", "AAAA");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "image",
                "source": { "type": "base64", "media_type": "image/png", "data": "AAAA" }
            })
        );
    }
}
