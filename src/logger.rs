// logger.rs - Structured logging module with modern display

use log::{debug, error, info, warn, LevelFilter};
use serde::Serialize;
use std::sync::Once;

use crate::compress::CompressionResult;
use crate::error::CompressionError;
use crate::size::format_size;

static INIT: Once = Once::new();

/// ANSI color codes for modern terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const WHITE: &str = "\x1b[37m";
    pub const BG_BLUE: &str = "\x1b[44m";
    pub const BG_GREEN: &str = "\x1b[42m";
    pub const BG_YELLOW: &str = "\x1b[43m";
    pub const BG_RED: &str = "\x1b[41m";
    pub const BG_MAGENTA: &str = "\x1b[45m";
}

fn parse_level(level: &str) -> LevelFilter {
    match level.to_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        "WARN" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        "OFF" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

#[derive(Debug, Clone)]
pub struct Logger {
    enabled: bool,
}

impl Logger {
    /// Install the `env_logger` backend once per process.
    pub fn init(level: &str, enabled: bool) {
        INIT.call_once(|| {
            let level_filter = if enabled { parse_level(level) } else { LevelFilter::Off };

            // tests and embedding hosts may already have installed a logger
            let _ = env_logger::Builder::new()
                .filter_level(level_filter)
                .format_timestamp(None)
                .format_module_path(false)
                .format_target(false)
                .try_init();
        });
    }

    pub fn new(enabled: bool) -> Self {
        Logger { enabled }
    }

    /// A logger that swallows everything; used by library callers that do
    /// not want pipeline output.
    pub fn silent() -> Self {
        Self::new(false)
    }

    pub fn log_compression(&self, original_bytes: usize, result: &CompressionResult, resized: bool) {
        use colors::*;

        if !self.enabled {
            return;
        }

        let percent = if original_bytes > 0 {
            (1.0 - result.size_bytes as f64 / original_bytes as f64) * 100.0
        } else {
            0.0
        };

        let format_badge = match result.format.as_str() {
            "jpeg" => String::new() + BG_YELLOW + WHITE + BOLD + " JPEG " + RESET,
            "webp" => String::new() + BG_GREEN + WHITE + BOLD + " WEBP " + RESET,
            other => String::new() + BG_BLUE + WHITE + BOLD + " " + &other.to_uppercase() + " " + RESET,
        };

        let resized_tag = if resized {
            String::new() + " " + MAGENTA + "resized" + RESET
        } else {
            String::new()
        };

        let msg = format_badge
            + " " + DIM + "compress" + RESET
            + " " + WHITE + &format_size(original_bytes) + RESET
            + " " + DIM + "→" + RESET
            + " " + GREEN + &format_size(result.size_bytes) + RESET
            + " " + CYAN + &format!("(-{:.1}%)", percent) + RESET
            + " " + DIM + &format!("Q:{} iter:{} {}x{}", result.quality, result.iterations, result.width, result.height) + RESET
            + &resized_tag;
        info!("{}", msg);
    }

    /// Target could not be met even at the smallest scale. Not an error.
    pub fn log_over_target(&self, result: &CompressionResult, target_kb: f64) {
        use colors::*;

        if !self.enabled {
            return;
        }

        let msg = String::new()
            + BG_YELLOW + WHITE + BOLD + " OVER " + RESET
            + " " + DIM + "best effort" + RESET
            + " " + YELLOW + &format!("{:.2} KB > {:.2} KB", result.size_kb, target_kb) + RESET;
        warn!("{}", msg);
    }

    pub fn log_bypass(&self, size: usize, reason: &str) {
        use colors::*;

        if !self.enabled {
            return;
        }

        let reason_badge = match reason {
            "disabled" => String::new() + BG_BLUE + WHITE + BOLD + " OFF " + RESET,
            _ => String::new() + BG_BLUE + WHITE + BOLD + " " + &reason.to_uppercase() + " " + RESET,
        };

        let msg = reason_badge
            + " " + DIM + "bypass" + RESET
            + " " + WHITE + &format_size(size) + RESET;
        info!("{}", msg);
    }

    /// Compression failed and the original frame is being sent instead.
    pub fn log_fallback(&self, size: usize, err: &CompressionError) {
        use colors::*;

        if !self.enabled {
            return;
        }

        let msg = String::new()
            + BG_RED + WHITE + BOLD + " ✗ FALLBACK " + RESET
            + " " + RED + &format!("[{}] {}", err.kind(), err) + RESET
            + " " + DIM + "sending original" + RESET
            + " " + WHITE + &format_size(size) + RESET;
        warn!("{}", msg);
    }

    pub fn error<T: Serialize>(&self, message: &str, metadata: &T) {
        use colors::*;
        if !self.enabled {
            return;
        }
        let meta = serde_json::to_string(metadata).unwrap_or_default();
        let msg = String::new()
            + BG_RED + WHITE + BOLD + " ✗ ERROR " + RESET
            + " " + RED + &format!("{} | {}", message, meta) + RESET;
        error!("{}", msg);
    }

    pub fn debug<T: Serialize>(&self, message: &str, metadata: &T) {
        use colors::*;
        if !self.enabled {
            return;
        }
        let meta = serde_json::to_string(metadata).unwrap_or_default();
        let msg = String::new()
            + BG_MAGENTA + WHITE + BOLD + " ⋯ DEBUG " + RESET
            + " " + MAGENTA + &format!("{} | {}", message, meta) + RESET;
        debug!("{}", msg);
    }

    /// Log server startup with style
    pub fn log_startup(&self, version: &str, address: &str, summary: &str) {
        use colors::*;

        let box_style = String::new() + BOLD + BG_BLUE + WHITE;
        let r = RESET;

        eprintln!();
        eprintln!("{box_style} ════════════════════════════════════════════════════ {r}");
        eprintln!("{box_style} ║  {BOLD}{WHITE} SCREENSHOT SQUEEZE {r}");
        eprintln!("{box_style} ║  {WHITE}Version: {CYAN}{version}{r}");
        eprintln!("{box_style} ║  {WHITE}Address: {GREEN}{address}{r}");
        eprintln!("{box_style} ║  {WHITE}Pipeline: {YELLOW}{summary}{r}");
        eprintln!("{box_style} ════════════════════════════════════════════════════ {r}");
        eprintln!();
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("whatever"), LevelFilter::Info);
    }

    #[test]
    fn test_init_is_idempotent() {
        Logger::init("DEBUG", true);
        Logger::init("ERROR", true);
        Logger::silent().debug("quiet", &serde_json::json!({ "ok": true }));
    }
}
