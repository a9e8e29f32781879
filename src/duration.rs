//! Human-friendly duration parsing for CLI and environment values.

use anyhow::{Context, Result};
use std::time::Duration;

/// Parse `500ms`, `30s`, `5m`, `1h`, or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration");
    }

    let (num_str, suffix) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else {
        // Assume seconds if no suffix
        (s, "s")
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration: {s}"))?;

    let secs = match suffix {
        "ms" => return Ok(Duration::from_millis(num)),
        "h" => num.checked_mul(3600),
        "m" => num.checked_mul(60),
        _ => Some(num),
    };
    let secs = secs.with_context(|| format!("Invalid duration: {s} is too large"))?;

    Ok(Duration::from_secs(secs))
}
