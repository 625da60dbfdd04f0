//! Argument parsers for durations, phases and due dates.

use chrono::{DateTime, Duration, Utc};

/// Parse `90`, `90s`, `25m` or `1h` into seconds.
pub fn duration_secs(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((i, _)) => raw.split_at(i),
        None => (raw, ""),
    };
    let n: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{raw}'"))?;
    let secs = match unit {
        "" | "s" => n,
        "m" => n.saturating_mul(60),
        "h" => n.saturating_mul(3600),
        _ => return Err(format!("unknown duration unit in '{raw}' (use s, m or h)")),
    };
    Ok(secs)
}

/// Parse a `NAME=DURATION` phase spec, e.g. `Focus=25m`.
pub fn phase(raw: &str) -> Result<(String, u64), String> {
    let (name, duration) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=DURATION, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing phase name in '{raw}'"));
    }
    Ok((name.to_string(), duration_secs(duration)?))
}

/// RFC 3339 timestamp for `--due`.
pub fn timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}

/// Resolve `--due` / `--in` into one due date.
pub fn due_date(
    due: Option<DateTime<Utc>>,
    due_in: Option<u64>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    due.or_else(|| {
        due_in.map(|secs| now + Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000)))
    })
}
