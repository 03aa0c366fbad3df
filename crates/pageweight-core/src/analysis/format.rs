const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable byte count, e.g. `"12.34 KB"`.
///
/// Picks the largest binary unit the value reaches (capped at GB) and
/// always prints two decimals, so `1024` renders as `"1.00 KB"`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let unit = (bytes.ilog(1024) as usize).min(UNITS.len() - 1);
    let scaled = bytes as f64 / 1024f64.powi(unit as i32);

    format!("{:.2} {}", scaled, UNITS[unit])
}

/// Human-readable duration given in milliseconds
pub fn format_duration_ms(ms: f64) -> String {
    if !ms.is_finite() || ms < 0.0 {
        return "unknown".to_string();
    }

    if ms < 1000.0 {
        format!("{:.0} ms", ms)
    } else if ms < 60_000.0 {
        format!("{:.2} s", ms / 1000.0)
    } else {
        let secs = (ms / 1000.0) as u64;
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
