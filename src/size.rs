// size.rs - Payload size inspection

use serde::Serialize;

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Size of an encoded payload in the units the pipeline reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeInfo {
    pub bytes: usize,
    pub kb: f64,
    pub mb: f64,
    pub formatted: String,
}

/// Measure a payload. `kb` and `mb` are exact quotients, never rounded.
pub fn inspect(payload: &[u8]) -> SizeInfo {
    let bytes = payload.len();
    let kb = bytes as f64 / KIB;
    let mb = bytes as f64 / MIB;

    SizeInfo {
        bytes,
        kb,
        mb,
        formatted: format_size(bytes),
    }
}

/// Kilobytes for a byte count, same unit as `SizeInfo::kb`.
pub fn kilobytes(bytes: usize) -> f64 {
    bytes as f64 / KIB
}

/// Human readable label: `"1.50 MB"`, `"12.00 KB"` or `"512 bytes"`.
pub fn format_size(bytes: usize) -> String {
    let kb = bytes as f64 / KIB;
    let mb = bytes as f64 / MIB;

    if mb >= 1.0 {
        format!("{:.2} MB", mb)
    } else if kb >= 1.0 {
        format!("{:.2} KB", kb)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_units_are_consistent() {
        let payload = vec![0u8; 3 * 1024 + 512];
        let info = inspect(&payload);

        assert_eq!(info.bytes, 3584);
        assert_eq!(info.kb, 3584.0 / 1024.0);
        assert_eq!(info.mb, 3584.0 / (1024.0 * 1024.0));
        assert_eq!(info.formatted, "3.50 KB");
    }

    #[test]
    fn test_format_size_thresholds() {
        assert_eq!(format_size(0), "0 bytes");
        assert_eq!(format_size(1023), "1023 bytes");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1024 * 1024 - 1), "1024.00 KB");
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_size(5 * 1024 * 1024 / 2), "2.50 MB");
    }

    #[test]
    fn test_kilobytes_matches_inspect() {
        let payload = vec![1u8; 777];
        assert_eq!(kilobytes(payload.len()), inspect(&payload).kb);
    }
}
