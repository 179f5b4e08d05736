//! Timestamp token parsing and formatting utilities

use crate::error::{PipelineError, PipelineResult};

/// Parser for caption timestamp tokens
pub struct TimeParser;

impl TimeParser {
    /// Create a new time parser
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeParser {
    /// Parse `HH:MM:SS[.fff]` or `MM:SS[.fff]` to seconds.
    ///
    /// Both `.` and `,` are accepted as the fractional separator.
    pub fn parse_timestamp(&self, token: &str) -> PipelineResult<f64> {
        let token = token.trim();
        let normalized = token.replace(',', ".");
        let parts: Vec<&str> = normalized.split(':').collect();

        let invalid = || PipelineError::parse(format!("Invalid timestamp: {}", token));

        let (hours, minutes, seconds) = match parts.as_slice() {
            [h, m, s] => (
                Self::parse_whole(h).ok_or_else(invalid)?,
                Self::parse_whole(m).ok_or_else(invalid)?,
                Self::parse_seconds(s).ok_or_else(invalid)?,
            ),
            [m, s] => (
                0,
                Self::parse_whole(m).ok_or_else(invalid)?,
                Self::parse_seconds(s).ok_or_else(invalid)?,
            ),
            _ => return Err(invalid()),
        };

        Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
    }

    fn parse_whole(field: &str) -> Option<u64> {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        field.parse().ok()
    }

    fn parse_seconds(field: &str) -> Option<f64> {
        let (whole, fraction) = match field.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (field, None),
        };
        Self::parse_whole(whole)?;
        if let Some(fraction) = fraction {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
        }
        field.parse().ok()
    }

    /// Format seconds as `HH:MM:SS` (or `MM:SS` under an hour) for display
    pub fn format_time(&self, seconds: f64) -> String {
        let total = if seconds.is_finite() && seconds > 0.0 {
            seconds as u64
        } else {
            0
        };
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let secs = total % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{:02}:{:02}", minutes, secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_fields() {
        let parser = TimeParser::new();
        assert_eq!(parser.parse_timestamp("00:00:01.000").unwrap(), 1.0);
        assert_eq!(parser.parse_timestamp("01:02:03.5").unwrap(), 3723.5);
    }

    #[test]
    fn test_parse_two_fields() {
        let parser = TimeParser::new();
        assert_eq!(parser.parse_timestamp("02:03.250").unwrap(), 123.25);
        assert_eq!(parser.parse_timestamp("00:07").unwrap(), 7.0);
    }

    #[test]
    fn test_parse_comma_fraction() {
        let parser = TimeParser::new();
        assert_eq!(parser.parse_timestamp("00:00:03,500").unwrap(), 3.5);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let parser = TimeParser::new();
        assert!(parser.parse_timestamp("12").is_err());
        assert!(parser.parse_timestamp("a:b:c").is_err());
        assert!(parser.parse_timestamp("1:2:3:4").is_err());
        assert!(parser.parse_timestamp("00:-1:00").is_err());
        assert!(parser.parse_timestamp("00:01.").is_err());
    }

    #[test]
    fn test_format_time() {
        let parser = TimeParser::new();
        assert_eq!(parser.format_time(65.9), "01:05");
        assert_eq!(parser.format_time(3725.0), "01:02:05");
        assert_eq!(parser.format_time(-3.0), "00:00");
    }
}
