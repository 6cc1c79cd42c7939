//! Relative and absolute time windows for match queries

use crate::error::{CollectionError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// `"24h"`, `"7d"`, `"2w"` or `"3m"` before `now` (a month is 30 days)
pub fn parse_relative_time_from(relative: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let invalid = || {
        CollectionError::InvalidTime(format!(
            "invalid relative time '{}', use a form like 24h, 7d, 2w or 3m",
            relative
        ))
    };
    let trimmed = relative.trim();
    let unit = trimmed.chars().last().ok_or_else(invalid)?;
    let amount: i64 = trimmed[..trimmed.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }

    let span = match unit {
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        'w' => Duration::try_weeks(amount),
        'm' => Duration::try_days(amount.saturating_mul(30)),
        _ => None,
    }
    .ok_or_else(invalid)?;
    now.checked_sub_signed(span).ok_or_else(invalid)
}

pub fn parse_relative_time(relative: &str) -> Result<DateTime<Utc>> {
    parse_relative_time_from(relative, Utc::now())
}

/// RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC) or `YYYY-MM-DD` (midnight UTC)
pub fn parse_date(date: &str) -> Result<DateTime<Utc>> {
    let date = date.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(date, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(CollectionError::InvalidTime(format!(
        "invalid date '{}', use YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS",
        date
    )))
}

/// Inclusive window; open ends are unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeFilter {
    /// `since` takes precedence over `from`
    pub fn from_options(since: Option<&str>, from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let from = match (since, from) {
            (Some(since), _) => Some(parse_relative_time(since)?),
            (None, Some(from)) => Some(parse_date(from)?),
            (None, None) => None,
        };
        let to = to.map(parse_date).transpose()?;
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn describe(&self) -> String {
        if self.is_unbounded() {
            return "all time".to_string();
        }
        let mut parts = Vec::new();
        if let Some(from) = self.from {
            parts.push(format!("from {}", from.to_rfc3339()));
        }
        if let Some(to) = self.to {
            parts.push(format!("to {}", to.to_rfc3339()));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn relative_units() {
        assert_eq!(
            parse_relative_time_from("24h", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 7, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_relative_time_from("2w", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 24, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_relative_time_from("1m", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 8, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_bad_relative_times() {
        for bad in ["", "d", "7", "7y", "-1d", "1.5h"] {
            assert!(
                matches!(
                    parse_relative_time_from(bad, now()),
                    Err(CollectionError::InvalidTime(_))
                ),
                "{} should fail",
                bad
            );
        }
    }

    #[test]
    fn parses_date_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2025-10-01").unwrap(), expected);
        assert_eq!(parse_date("2025-10-01T00:00:00").unwrap(), expected);
        assert_eq!(parse_date("2025-10-01T02:00:00+02:00").unwrap(), expected);
        assert!(parse_date("October 1st").is_err());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let filter =
            TimeFilter::from_options(None, Some("2025-10-01"), Some("2025-10-02")).unwrap();
        assert!(filter.contains(Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap()));
        assert!(filter.contains(Utc.with_ymd_and_hms(2025, 10, 2, 0, 0, 0).unwrap()));
        assert!(!filter.contains(Utc.with_ymd_and_hms(2025, 10, 2, 0, 0, 1).unwrap()));
        assert!(filter.describe().starts_with("from 2025-10-01T00:00:00"));
    }

    #[test]
    fn since_wins_over_from() {
        let filter = TimeFilter::from_options(Some("1h"), Some("2000-01-01"), None).unwrap();
        assert!(filter.from.unwrap() > Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(TimeFilter::default().describe(), "all time");
    }
}
