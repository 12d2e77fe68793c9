/// Utility functions
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Placeholder rendered for absent values
pub const PLACEHOLDER: &str = "—";

/// Extract number from JSON value
pub fn num(v: &Value) -> Option<f64> {
    if let Some(x) = v.as_f64() {
        return Some(x);
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<f64>().ok();
    }
    None
}

/// Pick number value from a JSON object by trying multiple keys
pub fn n_pick(v: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| v.get(*k).and_then(num))
}

/// Parse a timestamp in RFC 3339 or `YYYY-MM-DD HH:MM:SS` (assumed UTC)
pub fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Wire format used by the forecast service for timestamps
pub fn iso_utc(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Chart axis label, `2025-04-06T21:00:00Z` -> `2025-04-06 21:00:00`
pub fn chart_label(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render an optional value or the placeholder
pub fn or_placeholder<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Exponent notation with two fractional digits, e.g. `3.21e15`
pub fn exponential(v: f64) -> String {
    format!("{:.2e}", v)
}
