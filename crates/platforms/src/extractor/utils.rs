use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[inline]
pub fn capture_group_1_owned(re: &Regex, input: &str) -> Option<String> {
    capture_group_1(re, input).map(ToOwned::to_owned)
}

#[inline]
pub fn trim_trailing_slashes(input: &str) -> &str {
    input.trim_end_matches('/')
}

/// Read a text field that may be a plain string, a `{"simpleText": ..}`
/// wrapper or a `{"runs": [{"text": ..}, ..]}` array.
pub fn extract_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("simpleText") {
                return Some(s.clone());
            }
            map.get("runs").and_then(Value::as_array).map(|runs| join_runs(runs))
        }
        _ => None,
    }
}

fn join_runs(runs: &[Value]) -> String {
    runs.iter()
        .filter_map(|run| run.get("text").and_then(Value::as_str))
        .collect()
}

/// Reduce a viewer count in any of its observed shapes to a plain integer.
///
/// Accepts numbers, digit-bearing strings ("1,234 watching"), text wrappers
/// and `viewCountText` objects.
pub fn parse_viewer_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
        }),
        Value::String(s) => parse_digits(s),
        Value::Object(map) => {
            if let Some(inner) = map.get("simpleText") {
                return parse_viewer_count(inner);
            }
            if let Some(runs) = map.get("runs").and_then(Value::as_array) {
                return parse_digits(&join_runs(runs));
            }
            map.get("viewCountText").and_then(parse_viewer_count)
        }
        _ => None,
    }
}

fn parse_digits(input: &str) -> Option<u64> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}

/// Parse a timestamp in any of the formats seen on the platforms.
///
/// Offsets are honoured; naive date-times and bare dates are taken as UTC.
/// Anything unparsable yields `None`.
pub fn normalize_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}
