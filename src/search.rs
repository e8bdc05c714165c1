// search.rs - Bounded binary search over the encoder quality parameter

use crate::cancel::CancelToken;
use crate::codec::{Codec, RawFrame};
use crate::config::{CompressionConfig, OutputFormat};
use crate::error::{CompressionError, Result};
use crate::size::kilobytes;

/// Encoding chosen by a quality search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub buffer: Vec<u8>,
    pub quality: u8,
    /// Encode attempts made by the binary search, at most `max_iterations`.
    pub iterations: u32,
    /// Whether `buffer` is within the target size.
    pub fits: bool,
}

impl SearchOutcome {
    pub fn size_kb(&self) -> f64 {
        kilobytes(self.buffer.len())
    }
}

/// Find the highest quality in `[min_quality, initial_quality]` whose encoding
/// fits `target_size_kb`.
///
/// Assumes output size grows with quality, which holds for common codecs but
/// is not guaranteed for every image. When nothing fits the encoding at
/// `min_quality` is returned with `fits == false`; an unreachable target is
/// not an error.
pub fn search(
    codec: &dyn Codec,
    frame: &RawFrame,
    format: OutputFormat,
    config: &CompressionConfig,
    cancel: &CancelToken,
) -> Result<SearchOutcome> {
    let target_kb = config.target_size_kb();
    let mut low = config.min_quality() as i32;
    let mut high = config.initial_quality() as i32;
    let mut iterations = 0u32;
    let mut best: Option<(Vec<u8>, u8)> = None;
    // lowest-quality candidate seen, reused as the fallback
    let mut lowest: Option<(Vec<u8>, u8)> = None;
    let mut cancelled = false;

    while low <= high && iterations < config.max_iterations() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let mid = ((low + high) / 2) as u8;
        let candidate = codec.encode(frame, format, mid)?;
        iterations += 1;

        let candidate_kb = kilobytes(candidate.len());
        let fits = candidate_kb <= target_kb;
        log::debug!(
            "quality search #{}: q={} -> {:.2} KB (target {:.2} KB, {})",
            iterations,
            mid,
            candidate_kb,
            target_kb,
            if fits { "fits" } else { "too big" }
        );

        if fits {
            best = Some((candidate, mid));
            low = mid as i32 + 1;
        } else {
            if lowest.as_ref().map_or(true, |(_, q)| mid < *q) {
                lowest = Some((candidate, mid));
            }
            high = mid as i32 - 1;
        }
    }

    if let Some((buffer, quality)) = best {
        return Ok(SearchOutcome {
            buffer,
            quality,
            iterations,
            fits: true,
        });
    }

    match lowest {
        Some((buffer, quality)) if quality == config.min_quality() || cancelled => {
            Ok(SearchOutcome {
                buffer,
                quality,
                iterations,
                fits: false,
            })
        }
        None if cancelled => Err(CompressionError::Cancelled),
        _ => {
            // search budget ran out above min_quality
            let buffer = codec.encode(frame, format, config.min_quality())?;
            let fits = kilobytes(buffer.len()) <= target_kb;
            Ok(SearchOutcome {
                buffer,
                quality: config.min_quality(),
                iterations,
                fits,
            })
        }
    }
}
