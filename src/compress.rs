// compress.rs - Screenshot compression entry point

use serde::Serialize;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::codec::{Codec, ImageCodec, RawFrame};
use crate::config::{CompressionConfig, OutputFormat};
use crate::dimensions::constrain;
use crate::error::{CompressionError, Result};
use crate::logger::Logger;
use crate::payload;
use crate::resize::{resize_until_fits, ScaledOutcome};
use crate::search::search;
use crate::size::inspect;

/// Result of compression operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionResult {
    pub base64: String,
    pub size_bytes: usize,
    #[serde(rename = "sizeKB")]
    pub size_kb: f64,
    #[serde(rename = "sizeMB")]
    pub size_mb: f64,
    pub quality: u8,
    pub format: OutputFormat,
    /// Encode attempts made by the quality search that produced this result.
    pub iterations: u32,
    pub width: u32,
    pub height: u32,
}

impl CompressionResult {
    fn from_encoded(bytes: &[u8], format: OutputFormat, scaled: &ScaledOutcome) -> Self {
        let size = inspect(bytes);
        CompressionResult {
            base64: payload::encode(bytes),
            size_bytes: size.bytes,
            size_kb: size.kb,
            size_mb: size.mb,
            quality: scaled.outcome.quality,
            format,
            iterations: scaled.outcome.iterations,
            width: scaled.width,
            height: scaled.height,
        }
    }

    pub fn fits(&self, target_kb: f64) -> bool {
        self.size_kb <= target_kb
    }

    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }
}

/// What `compress_to_fit` hands back to the capture layer
#[derive(Debug, Clone, PartialEq)]
pub enum CompressionOutcome {
    Compressed(CompressionResult),
    /// Compression is disabled; the payload is returned exactly as given.
    Bypassed(String),
}

impl CompressionOutcome {
    pub fn base64(&self) -> &str {
        match self {
            CompressionOutcome::Compressed(result) => &result.base64,
            CompressionOutcome::Bypassed(raw) => raw,
        }
    }

    pub fn result(&self) -> Option<&CompressionResult> {
        match self {
            CompressionOutcome::Compressed(result) => Some(result),
            CompressionOutcome::Bypassed(_) => None,
        }
    }

    pub fn into_result(self) -> Option<CompressionResult> {
        match self {
            CompressionOutcome::Compressed(result) => Some(result),
            CompressionOutcome::Bypassed(_) => None,
        }
    }
}

/// Compression pipeline bound to one configuration and codec.
///
/// Cheap to clone and safe to share between concurrent calls: the config is
/// read-only and every call owns its own buffers.
pub struct Compressor<C: Codec = ImageCodec> {
    config: Arc<CompressionConfig>,
    codec: Arc<C>,
    logger: Logger,
}

impl<C: Codec> Clone for Compressor<C> {
    fn clone(&self) -> Self {
        Compressor {
            config: Arc::clone(&self.config),
            codec: Arc::clone(&self.codec),
            logger: self.logger.clone(),
        }
    }
}

impl Compressor<ImageCodec> {
    pub fn new(config: Arc<CompressionConfig>) -> Self {
        Self::with_codec(config, ImageCodec::new())
    }
}

impl<C: Codec + 'static> Compressor<C> {
    pub fn with_codec(config: Arc<CompressionConfig>, codec: C) -> Self {
        Compressor {
            config,
            codec: Arc::new(codec),
            logger: Logger::default(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Compress a base64 or data-URL screenshot to fit the configured target.
    /// Honours the configured timeout, if any.
    pub fn compress_to_fit(&self, raw: &str) -> Result<CompressionOutcome> {
        let cancel = CancelToken::for_timeout(self.config.timeout());
        self.compress_to_fit_with(raw, &cancel)
    }

    pub fn compress_to_fit_with(&self, raw: &str, cancel: &CancelToken) -> Result<CompressionOutcome> {
        if !self.config.enabled() {
            self.logger.log_bypass(raw.len(), "disabled");
            return Ok(CompressionOutcome::Bypassed(raw.to_string()));
        }

        let parsed = payload::parse(raw)?;
        let bytes = payload::decode(&parsed)?;
        let frame = self.codec.decode(&bytes)?;

        self.logger.debug(
            "Compression started",
            &serde_json::json!({
                "originalSize": bytes.len(),
                "width": frame.width(),
                "height": frame.height(),
                "format": self.config.format(),
                "targetSizeKB": self.config.target_size_kb(),
            }),
        );

        let (result, resized) = self.compress_frame(frame, cancel)?;

        self.logger.log_compression(bytes.len(), &result, resized);
        if !result.fits(self.config.target_size_kb()) {
            self.logger.log_over_target(&result, self.config.target_size_kb());
        }

        Ok(CompressionOutcome::Compressed(result))
    }

    /// Run the pipeline on an already decoded frame. The flag reports whether
    /// the progressive resize changed the dimensions.
    pub fn compress_frame(&self, frame: RawFrame, cancel: &CancelToken) -> Result<(CompressionResult, bool)> {
        let config = self.config.as_ref();
        let codec: &dyn Codec = self.codec.as_ref();
        let format = config.format();

        let frame = constrain(codec, frame, config.max_width(), config.max_height())?;
        let (width, height) = frame.dimensions();

        let first = ScaledOutcome {
            outcome: search(codec, &frame, format, config, cancel)?,
            width,
            height,
        };

        let chosen = if first.outcome.fits {
            first
        } else {
            resize_until_fits(codec, &frame, format, config, first, cancel)?
        };
        let resized = (chosen.width, chosen.height) != (width, height);

        Ok((
            CompressionResult::from_encoded(&chosen.outcome.buffer, format, &chosen),
            resized,
        ))
    }

    /// Same as `compress_to_fit`, on tokio's blocking pool so encoder work
    /// does not stall the async runtime.
    pub async fn compress_to_fit_async(&self, raw: String) -> Result<CompressionOutcome> {
        let compressor = self.clone();
        tokio::task::spawn_blocking(move || compressor.compress_to_fit(&raw))
            .await
            .map_err(|e| CompressionError::CompressionFailed(format!("worker failed: {}", e)))?
    }
}

/// One-shot helper using the default codec.
pub fn compress_to_fit(raw: &str, config: &CompressionConfig) -> Result<CompressionOutcome> {
    Compressor::new(Arc::new(config.clone())).compress_to_fit(raw)
}
