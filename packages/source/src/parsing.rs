//! Shared parsing utilities for Socrata text values.

use chrono::NaiveDateTime;

/// Parses a Socrata floating timestamp (ISO 8601 without zone, with optional
/// fractional seconds).
#[must_use]
pub fn parse_socrata_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Parses a non-negative whole number. Accepts `"3"` and `"3.0"`, which
/// Socrata produces for integer columns stored as numbers.
#[must_use]
pub fn parse_count(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u32>() {
        return Some(n);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return Some(f as u32);
    }
    None
}

/// Parses a finite coordinate.
#[must_use]
pub fn parse_coordinate(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timestamp_with_fractional() {
        let dt = parse_socrata_timestamp("2024-01-15T14:30:00.000").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00");
    }

    #[test]
    fn parses_timestamp_without_fractional() {
        let dt = parse_socrata_timestamp("2024-01-15T14:30:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00");
    }

    #[test]
    fn rejects_invalid_timestamp() {
        assert!(parse_socrata_timestamp("01/15/2024").is_none());
    }

    #[test]
    fn parses_counts() {
        assert_eq!(parse_count("2"), Some(2));
        assert_eq!(parse_count("2.0"), Some(2));
        assert_eq!(parse_count(" 0 "), Some(0));
        assert_eq!(parse_count("2.5"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn parses_coordinates() {
        let lat = parse_coordinate("41.8781").unwrap();
        assert!((lat - 41.8781).abs() < f64::EPSILON);
        assert!(parse_coordinate("NaN").is_none());
        assert!(parse_coordinate("north").is_none());
    }
}
