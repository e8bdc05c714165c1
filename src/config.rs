// config.rs - Compression configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::{CompressionError, Result};

pub const MIN_QUALITY_BOUND: u8 = 1;
pub const MAX_QUALITY_BOUND: u8 = 100;

/// Output encodings the pipeline can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(CompressionError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Immutable compression settings, built once and shared across calls.
///
/// Fields are private so a constructed config always satisfies
/// `1 <= min_quality <= initial_quality <= 100`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    enabled: bool,
    target_size_kb: f64,
    initial_quality: u8,
    min_quality: u8,
    format: OutputFormat,
    max_iterations: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
    timeout: Option<Duration>,
}

impl CompressionConfig {
    pub fn builder() -> CompressionConfigBuilder {
        CompressionConfigBuilder::default()
    }

    /// Load from the process environment. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source. Missing keys fall back to defaults,
    /// present but malformed values are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = Self::builder();

        if let Some(v) = get("COMPRESSION_ENABLED") {
            builder = builder.enabled(parse_bool("COMPRESSION_ENABLED", &v)?);
        }
        if let Some(v) = get("COMPRESSION_TARGET_SIZE_KB") {
            builder = builder.target_size_kb(parse_number("COMPRESSION_TARGET_SIZE_KB", &v)?);
        }
        if let Some(v) = get("COMPRESSION_INITIAL_QUALITY") {
            builder = builder.initial_quality(parse_number("COMPRESSION_INITIAL_QUALITY", &v)?);
        }
        if let Some(v) = get("COMPRESSION_MIN_QUALITY") {
            builder = builder.min_quality(parse_number("COMPRESSION_MIN_QUALITY", &v)?);
        }
        if let Some(v) = get("COMPRESSION_FORMAT") {
            builder = builder.format(v.parse()?);
        }
        if let Some(v) = get("COMPRESSION_MAX_ITERATIONS") {
            builder = builder.max_iterations(parse_number("COMPRESSION_MAX_ITERATIONS", &v)?);
        }
        if let Some(v) = get("COMPRESSION_TIMEOUT_MS") {
            let ms: u64 = parse_number("COMPRESSION_TIMEOUT_MS", &v)?;
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(v) = get("DISPLAY_WIDTH") {
            builder = builder.max_width(parse_number("DISPLAY_WIDTH", &v)?);
        }
        if let Some(v) = get("DISPLAY_HEIGHT") {
            builder = builder.max_height(parse_number("DISPLAY_HEIGHT", &v)?);
        }

        builder.build()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn target_size_kb(&self) -> f64 {
        self.target_size_kb
    }

    pub fn initial_quality(&self) -> u8 {
        self.initial_quality
    }

    pub fn min_quality(&self) -> u8 {
        self.min_quality
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn max_width(&self) -> Option<u32> {
        self.max_width
    }

    pub fn max_height(&self) -> Option<u32> {
        self.max_height
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        CompressionConfig {
            enabled: true,
            target_size_kb: 512.0,
            initial_quality: 95,
            min_quality: 40,
            format: OutputFormat::Png,
            max_iterations: 10,
            max_width: None,
            max_height: None,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompressionConfigBuilder {
    enabled: Option<bool>,
    target_size_kb: Option<f64>,
    initial_quality: Option<u8>,
    min_quality: Option<u8>,
    format: Option<OutputFormat>,
    max_iterations: Option<u32>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    timeout: Option<Duration>,
}

impl CompressionConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn target_size_kb(mut self, kb: f64) -> Self {
        self.target_size_kb = Some(kb);
        self
    }

    pub fn initial_quality(mut self, quality: u8) -> Self {
        self.initial_quality = Some(quality);
        self
    }

    pub fn min_quality(mut self, quality: u8) -> Self {
        self.min_quality = Some(quality);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn max_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    pub fn max_width(mut self, width: u32) -> Self {
        self.max_width = Some(width);
        self
    }

    pub fn max_height(mut self, height: u32) -> Self {
        self.max_height = Some(height);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate and freeze. Qualities are clamped into 1..=100; everything
    /// else that is out of range is rejected.
    pub fn build(self) -> Result<CompressionConfig> {
        let defaults = CompressionConfig::default();

        let initial_quality = clamp_quality(self.initial_quality.unwrap_or(defaults.initial_quality));
        let min_quality = clamp_quality(self.min_quality.unwrap_or(defaults.min_quality));
        if min_quality > initial_quality {
            return Err(CompressionError::InvalidConfig(format!(
                "min quality {} exceeds initial quality {}",
                min_quality, initial_quality
            )));
        }

        let target_size_kb = self.target_size_kb.unwrap_or(defaults.target_size_kb);
        if !target_size_kb.is_finite() || target_size_kb <= 0.0 {
            return Err(CompressionError::InvalidConfig(format!(
                "target size must be a positive number of KB, got {}",
                target_size_kb
            )));
        }

        let max_iterations = self.max_iterations.unwrap_or(defaults.max_iterations);
        if max_iterations == 0 {
            return Err(CompressionError::InvalidConfig(
                "max iterations must be at least 1".to_string(),
            ));
        }

        if self.max_width == Some(0) || self.max_height == Some(0) {
            return Err(CompressionError::InvalidConfig(
                "max width/height must be positive".to_string(),
            ));
        }

        Ok(CompressionConfig {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            target_size_kb,
            initial_quality,
            min_quality,
            format: self.format.unwrap_or(defaults.format),
            max_iterations,
            max_width: self.max_width,
            max_height: self.max_height,
            timeout: self.timeout,
        })
    }
}

fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_QUALITY_BOUND, MAX_QUALITY_BOUND)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CompressionError::InvalidConfig(format!(
            "{}: expected a boolean, got {:?}",
            key, value
        ))),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CompressionError::InvalidConfig(format!("{}: expected a number, got {:?}", key, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CompressionConfig::builder().build().unwrap();
        assert_eq!(config, CompressionConfig::default());
        assert!(config.enabled());
        assert_eq!(config.format(), OutputFormat::Png);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!(" webp ".parse::<OutputFormat>().unwrap(), OutputFormat::Webp);
        assert!(matches!(
            "avif".parse::<OutputFormat>(),
            Err(CompressionError::UnsupportedFormat(f)) if f == "avif"
        ));
    }

    #[test]
    fn test_quality_is_clamped() {
        let config = CompressionConfig::builder()
            .initial_quality(250)
            .min_quality(0)
            .build()
            .unwrap();
        assert_eq!(config.initial_quality(), 100);
        assert_eq!(config.min_quality(), 1);
    }

    #[test]
    fn test_inverted_quality_range_is_rejected() {
        let err = CompressionConfig::builder()
            .initial_quality(30)
            .min_quality(60)
            .build()
            .unwrap_err();
        assert!(matches!(err, CompressionError::InvalidConfig(_)));
    }

    #[test]
    fn test_bad_bounds_are_rejected() {
        assert!(CompressionConfig::builder().target_size_kb(0.0).build().is_err());
        assert!(CompressionConfig::builder().target_size_kb(f64::NAN).build().is_err());
        assert!(CompressionConfig::builder().max_iterations(0).build().is_err());
        assert!(CompressionConfig::builder().max_width(0).build().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = CompressionConfig::from_lookup(lookup(&[
            ("COMPRESSION_ENABLED", "false"),
            ("COMPRESSION_TARGET_SIZE_KB", "256.5"),
            ("COMPRESSION_INITIAL_QUALITY", "90"),
            ("COMPRESSION_MIN_QUALITY", "20"),
            ("COMPRESSION_FORMAT", "webp"),
            ("COMPRESSION_MAX_ITERATIONS", "6"),
            ("COMPRESSION_TIMEOUT_MS", "1500"),
            ("DISPLAY_WIDTH", "1280"),
            ("DISPLAY_HEIGHT", "960"),
        ]))
        .unwrap();

        assert!(!config.enabled());
        assert_eq!(config.target_size_kb(), 256.5);
        assert_eq!(config.initial_quality(), 90);
        assert_eq!(config.min_quality(), 20);
        assert_eq!(config.format(), OutputFormat::Webp);
        assert_eq!(config.max_iterations(), 6);
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.max_width(), Some(1280));
        assert_eq!(config.max_height(), Some(960));
    }

    #[test]
    fn test_from_lookup_empty_values_use_defaults() {
        let config = CompressionConfig::from_lookup(lookup(&[("DISPLAY_WIDTH", "  ")])).unwrap();
        assert_eq!(config, CompressionConfig::default());
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = CompressionConfig::from_lookup(lookup(&[("COMPRESSION_MIN_QUALITY", "low")]))
            .unwrap_err();
        assert!(matches!(err, CompressionError::InvalidConfig(_)));

        let err = CompressionConfig::from_lookup(lookup(&[("COMPRESSION_FORMAT", "gif")]))
            .unwrap_err();
        assert!(matches!(err, CompressionError::UnsupportedFormat(_)));

        let err = CompressionConfig::from_lookup(lookup(&[("COMPRESSION_ENABLED", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, CompressionError::InvalidConfig(_)));
    }
}
