//! Human-readable sizes, durations and counts for terminal output

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Formats bytes with a 1024 base, e.g. "1.5 MB".
///
/// Up to two decimals, trailing zeros dropped. Zero or negative is "0 B".
pub fn format_bytes(bytes: f64) -> String {
    if !bytes.is_finite() || bytes <= 0.0 {
        return "0 B".to_string();
    }

    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut text = format!("{:.2}", value);
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{} {}", text, UNITS[unit])
}

/// Formats a duration as m:ss or h:mm:ss; "--:--" when unknown.
pub fn format_duration(seconds: Option<f64>) -> String {
    let total = match seconds {
        Some(s) if s >= 1.0 => s as u64,
        _ => return "--:--".to_string(),
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Formats remaining time, rounding up: "12s", "4m", "1h 5m"; "--" when unknown.
pub fn format_eta(seconds: Option<f64>) -> String {
    let secs = match seconds {
        Some(s) if s > 0.0 => s,
        _ => return "--".to_string(),
    };

    if secs < 60.0 {
        format!("{}s", secs.ceil() as u64)
    } else if secs < 3600.0 {
        format!("{}m", (secs / 60.0).ceil() as u64)
    } else {
        let hours = (secs / 3600.0).floor() as u64;
        let minutes = ((secs % 3600.0) / 60.0).ceil() as u64;
        format!("{}h {}m", hours, minutes)
    }
}

/// Formats a view count: "950", "12.3K", "4.5M"; "unknown" when absent.
pub fn format_views(count: Option<u64>) -> String {
    match count {
        None | Some(0) => "unknown".to_string(),
        Some(n) if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1_000_000.0),
        Some(n) if n >= 1_000 => format!("{:.1}K", n as f64 / 1_000.0),
        Some(n) => n.to_string(),
    }
}
