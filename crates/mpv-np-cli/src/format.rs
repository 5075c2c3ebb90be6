//! Human-readable sizes and bitrates for the announcement line

/// Decimal size prefixes, stepping by 1000
const SIZE_UNITS: [&str; 8] = ["", "K", "M", "G", "T", "P", "E", "Z"];

/// Bitrate units, stepping by 1000
const RATE_UNITS: [&str; 4] = ["bps", "Kbps", "Mbps", "Gbps"];

/// `35_000_000` → `"35.0MB"`
pub fn pretty_size(bytes: f64) -> String {
    let mut value = bytes;
    for unit in SIZE_UNITS {
        if value.abs() < 1000.0 {
            return format!("{:.1}{}B", value, unit);
        }
        value /= 1000.0;
    }
    format!("{:.1}YB", value)
}

/// `1_098_000` → `"1098.0Kbps"`; a unit only steps up past 9999.
pub fn pretty_bitrate(bits_per_second: f64) -> String {
    let mut value = bits_per_second;
    for unit in RATE_UNITS {
        if value.abs() < 10000.0 {
            return format!("{:.1}{}", value, unit);
        }
        value /= 1000.0;
    }
    format!("{:.1}Tbps", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_size() {
        assert_eq!(pretty_size(0.0), "0.0B");
        assert_eq!(pretty_size(999.0), "999.0B");
        assert_eq!(pretty_size(1000.0), "1.0KB");
        assert_eq!(pretty_size(35_000_000.0), "35.0MB");
        assert_eq!(pretty_size(36_700_160.0), "36.7MB");
        assert_eq!(pretty_size(4_500_000_000.0), "4.5GB");
    }

    #[test]
    fn test_pretty_size_beyond_units() {
        assert_eq!(pretty_size(2e24), "2.0YB");
    }

    #[test]
    fn test_pretty_bitrate() {
        assert_eq!(pretty_bitrate(320.0), "320.0bps");
        assert_eq!(pretty_bitrate(9999.0), "9999.0bps");
        assert_eq!(pretty_bitrate(1_098_000.0), "1098.0Kbps");
        assert_eq!(pretty_bitrate(25_000_000.0), "25.0Mbps");
    }
}
