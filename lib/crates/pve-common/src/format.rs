//! Human-readable rendering of byte counts, durations and ratios.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Render a byte count with base-1024 scaling and two decimals.
///
/// The unit is the largest one in `B..TB` that keeps the value at or above 1.
/// Values past 1024 TB stay in TB.
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.2} {}", UNITS[unit])
}

/// Render seconds as `<d>d <h>h <m>m`; leftover seconds are dropped.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    format!("{days}d {hours}h {minutes}m")
}

/// `used / total` as a percentage with two decimals, or `None` when total is 0.
#[allow(clippy::cast_precision_loss)]
pub fn format_percent(used: u64, total: u64) -> Option<String> {
    if total == 0 {
        return None;
    }
    Some(format!("{:.2}%", used as f64 / total as f64 * 100.0))
}
