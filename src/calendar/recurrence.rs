use time::{Duration, OffsetDateTime, Time, Weekday};

use crate::error::ApiError;

/// Two-letter weekday codes as used in weekly RRULEs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekdayCode {
    Mo,
    Tu,
    We,
    Th,
    Fr,
    Sa,
    Su,
}

impl WeekdayCode {
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "MO" => Some(Self::Mo),
            "TU" => Some(Self::Tu),
            "WE" => Some(Self::We),
            "TH" => Some(Self::Th),
            "FR" => Some(Self::Fr),
            "SA" => Some(Self::Sa),
            "SU" => Some(Self::Su),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mo => "MO",
            Self::Tu => "TU",
            Self::We => "WE",
            Self::Th => "TH",
            Self::Fr => "FR",
            Self::Sa => "SA",
            Self::Su => "SU",
        }
    }

    pub fn weekday(self) -> Weekday {
        match self {
            Self::Mo => Weekday::Monday,
            Self::Tu => Weekday::Tuesday,
            Self::We => Weekday::Wednesday,
            Self::Th => Weekday::Thursday,
            Self::Fr => Weekday::Friday,
            Self::Sa => Weekday::Saturday,
            Self::Su => Weekday::Sunday,
        }
    }
}

/// Parse a non-empty list of weekday codes from request input.
pub fn parse_days(days: &[String]) -> Result<Vec<WeekdayCode>, ApiError> {
    if days.is_empty() {
        return Err(ApiError::Validation("days must be non-empty".into()));
    }
    days.iter()
        .map(|d| {
            WeekdayCode::parse(d)
                .ok_or_else(|| ApiError::Validation(format!("invalid weekday code: {d}")))
        })
        .collect()
}

/// `"10:00"` → `Time`. Seconds are always zero.
pub fn parse_clock(input: &str) -> Option<Time> {
    let (hour, minute) = input.split_once(':')?;
    Time::from_hms(hour.parse().ok()?, minute.parse().ok()?, 0).ok()
}

/// Weekly recurrence over the selected weekdays,
/// e.g. `RRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR`.
pub fn weekly_rrule(days: &[WeekdayCode]) -> String {
    let byday = days
        .iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(",");
    format!("RRULE:FREQ=WEEKLY;BYDAY={byday}")
}

/// Next date-time at or after `now` that falls on `day` at `at`. If the
/// candidate on the current week has already passed, it slides a week out.
pub fn next_occurrence(now: OffsetDateTime, day: WeekdayCode, at: Time) -> OffsetDateTime {
    let target = day.weekday().number_days_from_sunday() as i64;
    let current = now.weekday().number_days_from_sunday() as i64;
    let days_ahead = (target - current).rem_euclid(7);

    let date = now.date() + Duration::days(days_ahead);
    let mut candidate = date.with_time(at).assume_offset(now.offset());
    if candidate < now {
        candidate += Duration::days(7);
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, time};

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!(WeekdayCode::parse("mo"), Some(WeekdayCode::Mo));
        assert_eq!(WeekdayCode::parse("SU"), Some(WeekdayCode::Su));
        assert_eq!(WeekdayCode::parse("XX"), None);
    }

    #[test]
    fn parse_days_rejects_empty_and_unknown() {
        assert!(parse_days(&[]).is_err());
        assert!(parse_days(&["MO".into(), "FUNDAY".into()]).is_err());
        let parsed = parse_days(&["MO".into(), "WE".into()]).unwrap();
        assert_eq!(parsed, vec![WeekdayCode::Mo, WeekdayCode::We]);
    }

    #[test]
    fn clock_parsing() {
        assert_eq!(parse_clock("10:00"), Some(time!(10:00)));
        assert_eq!(parse_clock("23:59"), Some(time!(23:59)));
        assert_eq!(parse_clock("24:00"), None);
        assert_eq!(parse_clock("10"), None);
        assert_eq!(parse_clock("ten:00"), None);
    }

    #[test]
    fn rrule_selects_all_requested_days() {
        let rule = weekly_rrule(&[WeekdayCode::Mo, WeekdayCode::We]);
        assert_eq!(rule, "RRULE:FREQ=WEEKLY;BYDAY=MO,WE");
    }

    #[test]
    fn first_occurrence_is_never_in_the_past() {
        // a Monday at noon
        let now = datetime!(2025 - 03 - 10 12:00 UTC);
        assert_eq!(now.weekday(), Weekday::Monday);

        // Monday 10:00 has already passed, so it slides to next Monday
        let occurrence = next_occurrence(now, WeekdayCode::Mo, time!(10:00));
        assert_eq!(occurrence, datetime!(2025 - 03 - 17 10:00 UTC));
        assert!(occurrence >= now);

        // Monday 14:00 is still ahead today
        let occurrence = next_occurrence(now, WeekdayCode::Mo, time!(14:00));
        assert_eq!(occurrence, datetime!(2025 - 03 - 10 14:00 UTC));
    }

    #[test]
    fn first_occurrence_lands_on_the_requested_weekday() {
        let now = datetime!(2025 - 03 - 10 12:00 UTC); // Monday
        let occurrence = next_occurrence(now, WeekdayCode::We, time!(10:00));
        assert_eq!(occurrence, datetime!(2025 - 03 - 12 10:00 UTC));
        assert_eq!(occurrence.weekday(), Weekday::Wednesday);

        // wrapping across the week boundary: Sunday from a Monday
        let occurrence = next_occurrence(now, WeekdayCode::Su, time!(09:30));
        assert_eq!(occurrence, datetime!(2025 - 03 - 16 09:30 UTC));
    }

    #[test]
    fn first_occurrence_keeps_the_offset() {
        let now = datetime!(2025 - 03 - 10 12:00 +5:30);
        let occurrence = next_occurrence(now, WeekdayCode::Tu, time!(08:00));
        assert_eq!(occurrence.offset(), now.offset());
        assert!(occurrence >= now);
    }
}
