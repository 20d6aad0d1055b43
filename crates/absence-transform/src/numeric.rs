//! Lenient numeric coercion for survey codes.

/// Parses a survey code, returning None for empty or unparseable values.
///
/// Accepts integral float spellings such as `"10.0"` so that extracts written
/// through a float column keep their codes.
///
/// ```
/// use absence_transform::numeric::parse_code;
///
/// assert_eq!(parse_code(" 12 "), Some(12));
/// assert_eq!(parse_code("10.0"), Some(10));
/// assert_eq!(parse_code("10.5"), None);
/// assert_eq!(parse_code("NIU"), None);
/// ```
pub fn parse_code(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(code) = trimmed.parse::<i64>() {
        return Some(code);
    }
    trimmed.parse::<f64>().ok().and_then(integral)
}

/// Converts a float to an integer code when it is finite and has no
/// fractional part.
pub fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Some(value as i64)
    } else {
        None
    }
}
