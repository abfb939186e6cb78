//! Formatting helpers for speeds, percentages and elapsed time.

use std::time::Duration;

/// Formats a speed in bytes per second, e.g. "1.50 MB/s".
///
/// Non-finite or negative speeds show as zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if !(bytes_per_sec.is_finite() && bytes_per_sec > 0.0) {
        return "0 B/s".to_string();
    }
    let mut value = bytes_per_sec;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B/s", value as u64)
    } else {
        format!("{value:.2} {}/s", UNITS[unit])
    }
}

/// Formats a percentage already in `0..=100`, e.g. "33.3%".
#[must_use]
pub fn format_percent(percent: f64) -> String {
    if percent.is_finite() {
        format!("{:.1}%", percent.clamp(0.0, 100.0))
    } else {
        "0.0%".to_string()
    }
}

/// Formats elapsed time, e.g. "5.0s", "1m 05s" or "1h 01m 05s".
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, secs / 60 % 60, secs % 60);
    match (hours, minutes) {
        (0, 0) => format!("{seconds}.{}s", d.subsec_millis() / 100),
        (0, _) => format!("{minutes}m {seconds:02}s"),
        _ => format!("{hours}h {minutes:02}m {seconds:02}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_speed_units() {
        assert_eq!(format_speed(0.0), "0 B/s");
        assert_eq!(format_speed(1024.0), "1.00 KB/s");
        assert_eq!(format_speed(500.7), "500 B/s");
        assert_eq!(format_speed(1536.0), "1.50 KB/s");
        assert_eq!(format_speed(1.5 * 1024.0 * 1024.0), "1.50 MB/s");
        assert_eq!(format_speed(1024.0 * 1024.0 * 1024.0), "1.00 GB/s");
    }

    #[test]
    fn format_speed_rejects_garbage() {
        assert_eq!(format_speed(f64::NAN), "0 B/s");
        assert_eq!(format_speed(-5.0), "0 B/s");
        assert_eq!(format_speed(f64::INFINITY), "0 B/s");
    }

    #[test]
    fn format_percent_values() {
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_percent(33.33), "33.3%");
        assert_eq!(format_percent(100.0), "100.0%");
        assert_eq!(format_percent(f64::NAN), "0.0%");
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h 01m 05s");
        assert_eq!(format_duration(Duration::from_millis(500)), "0.5s");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn format_speed_never_panics(speed in proptest::num::f64::ANY) {
                prop_assert!(format_speed(speed).ends_with("/s"));
            }

            #[test]
            fn format_percent_never_panics(percent in proptest::num::f64::ANY) {
                prop_assert!(format_percent(percent).ends_with('%'));
            }
        }
    }
}
