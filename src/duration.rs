//! ISO-8601 duration parsing and calendar-aware subtraction.
//!
//! Handles the `PnYnMnWnDTnHnMnS` grammar, including the week form and
//! fractional seconds. Year and month components are kept as calendar months
//! (applied via [`chrono::Months`], so `P1M` back from March 31st lands on
//! the end of February); the remaining components collapse into an exact
//! [`chrono::Duration`].

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Months, TimeZone};
use regex::Regex;
use thiserror::Error;

/// The input was not a valid duration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration '{0}'")]
pub struct DurationError(String);

/// A parsed ISO-8601 duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoDuration {
    months: u32,
    time: Duration,
}

impl IsoDuration {
    /// Duration of an exact number of seconds (no calendar component).
    ///
    /// # Errors
    ///
    /// Returns [`DurationError`] for negative or non-finite values; an age
    /// threshold in the future would select every file.
    pub fn from_seconds(seconds: f64) -> Result<Self, DurationError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(DurationError(seconds.to_string()));
        }
        Ok(Self {
            months: 0,
            time: Duration::nanoseconds((seconds * 1e9).round() as i64),
        })
    }

    /// Parse an ISO-8601 duration string such as `P7D`, `PT1H30M` or `P1Y2M`.
    ///
    /// # Errors
    ///
    /// Returns [`DurationError`] for anything outside the grammar, including
    /// the empty designators `P` and `P1DT`.
    pub fn parse(input: &str) -> Result<Self, DurationError> {
        static GRAMMAR_RE: OnceLock<Regex> = OnceLock::new();
        let re = GRAMMAR_RE.get_or_init(|| {
            Regex::new(
                r"(?x)^P
                  (?:(\d+)Y)?
                  (?:(\d+)M)?
                  (?:(\d+)W)?
                  (?:(\d+)D)?
                  (?:T
                    (?:(\d+)H)?
                    (?:(\d+)M)?
                    (?:(\d+(?:[.,]\d+)?)S)?
                  )?$",
            )
            .unwrap()
        });

        let err = || DurationError(input.to_string());
        let caps = re.captures(input).ok_or_else(err)?;
        if caps.iter().skip(1).all(|c| c.is_none()) {
            return Err(err());
        }
        // A trailing 'T' with no time components is malformed ("P1DT").
        if input.contains('T') && caps.get(5).is_none() && caps.get(6).is_none() && caps.get(7).is_none() {
            return Err(err());
        }

        let uint = |idx: usize| -> Result<u32, DurationError> {
            caps.get(idx)
                .map_or(Ok(0), |m| m.as_str().parse().map_err(|_| err()))
        };
        let years = uint(1)?;
        let months = uint(2)?;
        let weeks = i64::from(uint(3)?);
        let days = i64::from(uint(4)?);
        let hours = i64::from(uint(5)?);
        let minutes = i64::from(uint(6)?);
        let seconds: f64 = caps
            .get(7)
            .map_or(Ok(0.0), |m| m.as_str().replace(',', ".").parse().map_err(|_| err()))?;

        let time = Duration::days(weeks * 7 + days)
            + Duration::hours(hours)
            + Duration::minutes(minutes)
            + Duration::nanoseconds((seconds * 1e9).round() as i64);
        Ok(Self {
            months: years * 12 + months,
            time,
        })
    }

    /// `now` minus this duration, applying calendar months first.
    pub fn subtract_from<Tz: TimeZone>(&self, now: DateTime<Tz>) -> DateTime<Tz> {
        let base = now
            .clone()
            .checked_sub_months(Months::new(self.months))
            .unwrap_or(now);
        base - self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_days() {
        let d = IsoDuration::parse("P7D").unwrap();
        assert_eq!(d.months, 0);
        assert_eq!(d.time, Duration::days(7));
    }

    #[test]
    fn test_parse_time_components() {
        let d = IsoDuration::parse("PT1H30M").unwrap();
        assert_eq!(d.time, Duration::minutes(90));
    }

    #[test]
    fn test_parse_weeks() {
        let d = IsoDuration::parse("P2W").unwrap();
        assert_eq!(d.time, Duration::days(14));
    }

    #[test]
    fn test_parse_calendar_components() {
        let d = IsoDuration::parse("P1Y2M").unwrap();
        assert_eq!(d.months, 14);
        assert_eq!(d.time, Duration::zero());
    }

    #[test]
    fn test_parse_mixed() {
        let d = IsoDuration::parse("P1DT12H").unwrap();
        assert_eq!(d.time, Duration::hours(36));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let d = IsoDuration::parse("PT0.5S").unwrap();
        assert_eq!(d.time, Duration::milliseconds(500));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "P", "PT", "P1DT", "7D", "P7d", "P7D extra", "1Y"] {
            assert!(IsoDuration::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_subtract_exact() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let cutoff = IsoDuration::parse("P7D").unwrap().subtract_from(now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_subtract_calendar_month_clamps() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let cutoff = IsoDuration::parse("P1M").unwrap().subtract_from(now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_from_seconds() {
        let d = IsoDuration::from_seconds(90.0).unwrap();
        assert_eq!(d, IsoDuration::parse("PT1M30S").unwrap());
    }

    #[test]
    fn test_from_seconds_rejects_negative_and_non_finite() {
        assert!(IsoDuration::from_seconds(-5.0).is_err());
        assert!(IsoDuration::from_seconds(f64::NAN).is_err());
        assert!(IsoDuration::from_seconds(f64::INFINITY).is_err());
    }
}
