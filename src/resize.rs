// resize.rs - Progressive downscaling when quality alone cannot hit the target

use crate::cancel::CancelToken;
use crate::codec::{Codec, RawFrame};
use crate::config::{CompressionConfig, OutputFormat};
use crate::error::{CompressionError, Result};
use crate::search::{search, SearchOutcome};

/// First scale tried, in tenths of the input dimensions.
pub const START_SCALE_TENTHS: u32 = 9;
/// Smallest scale tried, in tenths. The loop runs at most 7 times.
pub const MIN_SCALE_TENTHS: u32 = 3;

/// A search outcome together with the frame size it was encoded at.
#[derive(Debug, Clone)]
pub struct ScaledOutcome {
    pub outcome: SearchOutcome,
    pub width: u32,
    pub height: u32,
}

/// Dimensions for `scale_tenths / 10` of the input, floored, min 1px.
pub fn scaled_dimensions(width: u32, height: u32, scale_tenths: u32) -> (u32, u32) {
    let scale = |side: u32| ((side as u64 * scale_tenths as u64) / 10).min(side as u64).max(1) as u32;
    (scale(width), scale(height))
}

/// Shrink `frame` to 90%, 80% ... 30% of its size, re-running the quality
/// search at each step, until an encoding fits.
///
/// `first` is the over-target result at full size. Best effort: when no step
/// fits, the smallest encoding observed is returned instead of an error.
pub fn resize_until_fits(
    codec: &dyn Codec,
    frame: &RawFrame,
    format: OutputFormat,
    config: &CompressionConfig,
    first: ScaledOutcome,
    cancel: &CancelToken,
) -> Result<ScaledOutcome> {
    let (width, height) = frame.dimensions();
    let mut smallest = first;

    for scale_tenths in (MIN_SCALE_TENTHS..=START_SCALE_TENTHS).rev() {
        if smallest.outcome.fits || cancel.is_cancelled() {
            break;
        }

        let (new_width, new_height) = scaled_dimensions(width, height, scale_tenths);
        let resized = codec.resize(frame, new_width, new_height)?;
        let outcome = match search(codec, &resized, format, config, cancel) {
            Ok(outcome) => outcome,
            // cancelled before this step encoded anything; keep what we have
            Err(CompressionError::Cancelled) => break,
            Err(e) => return Err(e),
        };

        log::debug!(
            "resize step {}0%: {}x{} q={} -> {:.2} KB in {} encodes",
            scale_tenths,
            new_width,
            new_height,
            outcome.quality,
            outcome.size_kb(),
            outcome.iterations
        );

        if outcome.fits || outcome.buffer.len() <= smallest.outcome.buffer.len() {
            smallest = ScaledOutcome {
                outcome,
                width: new_width,
                height: new_height,
            };
        }
    }

    Ok(smallest)
}
