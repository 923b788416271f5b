//! Human-friendly durations for reminder delays.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use std::time::Duration;

/// Parse a duration string like "30s", "2h", "1d", "2w", "1h30m"
pub fn parse_duration(time_str: &str) -> Option<Duration> {
    let time_str = time_str.trim().to_lowercase();
    let mut total_seconds: u64 = 0;
    let mut current_number = String::new();

    for c in time_str.chars() {
        if c.is_ascii_digit() {
            current_number.push(c);
        } else if !current_number.is_empty() {
            let value: u64 = current_number.parse().ok()?;
            current_number.clear();

            let unit: u64 = match c {
                's' => 1,
                'm' => 60,
                'h' => 60 * 60,
                'd' => 60 * 60 * 24,
                'w' => 60 * 60 * 24 * 7,
                _ => return None,
            };
            total_seconds = total_seconds.checked_add(value.checked_mul(unit)?)?;
        } else {
            return None;
        }
    }

    // Trailing digits without a unit
    if !current_number.is_empty() {
        return None;
    }

    if total_seconds > 0 {
        Some(Duration::from_secs(total_seconds))
    } else {
        None
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Format a duration for reminder confirmation copy
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    if seconds < 60 {
        format!("{} second{}", seconds, plural(seconds))
    } else if seconds < 3600 {
        let mins = seconds / 60;
        format!("{} minute{}", mins, plural(mins))
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        if mins > 0 {
            format!(
                "{} hour{} {} minute{}",
                hours,
                plural(hours),
                mins,
                plural(mins)
            )
        } else {
            format!("{} hour{}", hours, plural(hours))
        }
    } else {
        let days = seconds / 86400;
        let hours = (seconds % 86400) / 3600;
        if hours == 0 && days % 7 == 0 {
            let weeks = days / 7;
            format!("{} week{}", weeks, plural(weeks))
        } else if hours > 0 {
            format!(
                "{} day{} {} hour{}",
                days,
                plural(days),
                hours,
                plural(hours)
            )
        } else {
            format!("{} day{}", days, plural(days))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let secs = |s| Some(Duration::from_secs(s));
        assert_eq!(parse_duration("5s"), secs(5));
        assert_eq!(parse_duration("30m"), secs(1800));
        assert_eq!(parse_duration("2h"), secs(7200));
        assert_eq!(parse_duration("1d"), secs(86400));
        assert_eq!(parse_duration("2w"), secs(1209600));
        assert_eq!(parse_duration("1h30m"), secs(5400));
        assert_eq!(parse_duration(" 3D "), secs(259200));
        assert_eq!(parse_duration("invalid"), None);
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("0s"), None);
        assert_eq!(parse_duration(""), None);
        // Overflow is rejected rather than wrapped
        assert_eq!(parse_duration("99999999999999999w"), None);
        assert_eq!(parse_duration("18446744073709551615s1s"), None);
        assert_eq!(parse_duration("99999999999999999999999s"), None);
    }

    #[test]
    fn test_format_duration() {
        let fmt = |s| format_duration(Duration::from_secs(s));
        assert_eq!(fmt(1), "1 second");
        assert_eq!(fmt(5), "5 seconds");
        assert_eq!(fmt(120), "2 minutes");
        assert_eq!(fmt(3660), "1 hour 1 minute");
        assert_eq!(fmt(86400), "1 day");
        assert_eq!(fmt(90000), "1 day 1 hour");
        assert_eq!(fmt(259200), "3 days");
        assert_eq!(fmt(604800), "1 week");
        assert_eq!(fmt(1209600), "2 weeks");
        assert_eq!(fmt(2592000), "30 days");
    }
}
