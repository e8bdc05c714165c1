//! Adaptive screenshot compression.
//!
//! Takes a captured desktop frame (base64 or `data:image/...;base64,` URL)
//! and produces an encoding that fits a target size: a bounded binary search
//! over the encoder quality, then progressive downscaling when quality alone
//! is not enough.
//!
//! ```no_run
//! use std::sync::Arc;
//! use screenshot_squeeze::{CompressionConfig, Compressor};
//!
//! # fn main() -> Result<(), screenshot_squeeze::CompressionError> {
//! let config = Arc::new(CompressionConfig::from_env()?);
//! let compressor = Compressor::new(config);
//! let outcome = compressor.compress_to_fit("data:image/png;base64,...")?;
//! println!("{} base64 chars", outcome.base64().len());
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod codec;
pub mod compress;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod logger;
pub mod payload;
pub mod resize;
pub mod screenshot;
pub mod search;
pub mod size;

pub use cancel::CancelToken;
pub use codec::{Codec, ImageCodec, RawFrame};
pub use compress::{compress_to_fit, CompressionOutcome, CompressionResult, Compressor};
pub use config::{CompressionConfig, CompressionConfigBuilder, OutputFormat};
pub use error::CompressionError;
pub use logger::Logger;
pub use screenshot::{prepare_screenshot, prepare_screenshot_async, ImageContentBlock, PreparedScreenshot};
pub use size::{inspect, SizeInfo};
