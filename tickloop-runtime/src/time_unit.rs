use std::time::Duration;

/// Time unit used when parsing interval settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Convert `value` in this unit to a `Duration`, `None` on overflow.
    pub fn to_duration(self, value: u64) -> Option<Duration> {
        let millis = match self {
            TimeUnit::Milliseconds => Some(value),
            TimeUnit::Seconds => value.checked_mul(1_000),
            TimeUnit::Minutes => value.checked_mul(60_000),
            TimeUnit::Hours => value.checked_mul(3_600_000),
        }?;
        Some(Duration::from_millis(millis))
    }

    /// Parse a duration string like "500ms", "1s", "2m", "1h".
    ///
    /// Only lowercase suffixes are accepted and no whitespace may separate
    /// the number from its suffix.
    pub fn parse_duration(s: &str) -> Option<(u64, TimeUnit)> {
        let s = s.trim();
        let split_pos = s.find(|c: char| !c.is_ascii_digit())?;
        if split_pos == 0 {
            return None;
        }

        let (num_str, unit_str) = s.split_at(split_pos);
        let value = num_str.parse::<u64>().ok()?;

        let time_unit = match unit_str {
            "ms" => TimeUnit::Milliseconds,
            "s" => TimeUnit::Seconds,
            "m" => TimeUnit::Minutes,
            "h" => TimeUnit::Hours,
            _ => return None,
        };

        Some((value, time_unit))
    }

    /// Parse an interval setting: shorthand ("250ms", "1s") or a bare
    /// number interpreted as milliseconds.
    pub fn parse_interval(s: &str) -> Option<Duration> {
        match Self::parse_duration(s) {
            Some((value, unit)) => unit.to_duration(value),
            None => s.trim().parse::<u64>().ok().map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shorthand_suffixes() {
        assert_eq!(TimeUnit::parse_duration("250ms"), Some((250, TimeUnit::Milliseconds)));
        assert_eq!(TimeUnit::parse_duration(" 5s "), Some((5, TimeUnit::Seconds)));
        assert_eq!(TimeUnit::parse_duration("2m"), Some((2, TimeUnit::Minutes)));
        assert_eq!(TimeUnit::parse_duration("1h"), Some((1, TimeUnit::Hours)));
    }

    #[test]
    fn rejects_malformed_shorthand() {
        assert_eq!(TimeUnit::parse_duration("5S"), None);
        assert_eq!(TimeUnit::parse_duration("5 s"), None);
        assert_eq!(TimeUnit::parse_duration("ms"), None);
        assert_eq!(TimeUnit::parse_duration("100"), None);
    }

    #[test]
    fn bare_numbers_are_milliseconds() {
        assert_eq!(TimeUnit::parse_interval("100"), Some(Duration::from_millis(100)));
        assert_eq!(TimeUnit::parse_interval("1s"), Some(Duration::from_secs(1)));
        assert_eq!(TimeUnit::parse_interval("soon"), None);
    }

    #[test]
    fn overflow_is_none() {
        assert_eq!(TimeUnit::Hours.to_duration(u64::MAX), None);
    }
}
