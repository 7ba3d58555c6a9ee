//! Clock times as they appear in run files, catalogs and templates.

use chrono::NaiveTime;

const CLOCK_FORMATS: [&str; 3] = ["%I:%M %p", "%I:%M%p", "%H:%M"];

/// Parse a wall-clock time such as `5:05 PM`, `5:05pm` or `17:05`.
#[must_use]
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    CLOCK_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
}

/// Parse the compact suffix used by threshold references, e.g. `545PM` or `7PM`.
#[must_use]
pub fn parse_compact_clock(raw: &str) -> Option<NaiveTime> {
    let upper = raw.trim().to_ascii_uppercase();
    let (digits, afternoon) = if let Some(digits) = upper.strip_suffix("PM") {
        (digits, true)
    } else if let Some(digits) = upper.strip_suffix("AM") {
        (digits, false)
    } else {
        return None;
    };
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    let value: u32 = digits.parse().ok()?;
    let (hour, minute) = if digits.len() <= 2 {
        (value, 0)
    } else {
        (value / 100, value % 100)
    };
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (hour, afternoon) {
        (12, false) => 0,
        (12, true) => 12,
        (hour, true) => hour + 12,
        (hour, false) => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Format a time the way announcements print it, e.g. `4:55 PM`.
#[must_use]
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Build a time from hour and minute, for constants known to be valid.
#[must_use]
pub fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_clock_spellings() {
        assert_eq!(parse_clock("5:05 PM"), Some(hm(17, 5)));
        assert_eq!(parse_clock(" 5:05pm "), Some(hm(17, 5)));
        assert_eq!(parse_clock("11:30 AM"), Some(hm(11, 30)));
        assert_eq!(parse_clock("17:45"), Some(hm(17, 45)));
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("soonish"), None);
    }

    #[test]
    fn parses_compact_thresholds() {
        assert_eq!(parse_compact_clock("545PM"), Some(hm(17, 45)));
        assert_eq!(parse_compact_clock("7PM"), Some(hm(19, 0)));
        assert_eq!(parse_compact_clock("1130AM"), Some(hm(11, 30)));
        assert_eq!(parse_compact_clock("12PM"), Some(hm(12, 0)));
        assert_eq!(parse_compact_clock("13PM"), None);
        assert_eq!(parse_compact_clock("545"), None);
    }

    #[test]
    fn formats_without_leading_zero() {
        assert_eq!(format_clock(hm(16, 55)), "4:55 PM");
        assert_eq!(format_clock(hm(9, 5)), "9:05 AM");
    }
}
