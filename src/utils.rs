/// Utility functions for formatting and timestamps
use time::{format_description, OffsetDateTime};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Format a unix timestamp (seconds) the same way as `format_datetime`
pub fn format_unix(timestamp: i64) -> String {
    match OffsetDateTime::from_unix_timestamp(timestamp) {
        Ok(dt) => format_datetime(&dt),
        Err(_) => timestamp.to_string(),
    }
}

/// Current time as whole seconds since the unix epoch
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Prettyprint raw payload bytes as space-separated hex
pub fn format_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(&[0x5a, 0x00, 0x32]), "5a 00 32");
        assert_eq!(format_bytes(&[]), "");
    }

    #[test]
    fn test_format_unix() {
        assert_eq!(format_unix(0), "01.01.1970 - 00:00:00");
        assert_eq!(format_unix(1_700_000_000), "14.11.2023 - 22:13:20");
    }
}
