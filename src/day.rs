use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};

/// The server's local UTC offset, falling back to UTC when the platform
/// cannot determine it (common in multi-threaded processes on Unix).
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Current instant expressed in the server's local offset.
pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

/// Today's calendar day in the server's local offset.
pub fn today() -> Date {
    now_local().date()
}

/// Half-open window [00:00, 24:00) covering `day` at the given offset.
pub fn day_bounds(day: Date, offset: UtcOffset) -> (OffsetDateTime, OffsetDateTime) {
    let start = day.with_time(Time::MIDNIGHT).assume_offset(offset);
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let (start, end) = day_bounds(date!(2025 - 03 - 10), UtcOffset::UTC);
        assert_eq!(start, datetime!(2025 - 03 - 10 00:00 UTC));
        assert_eq!(end, datetime!(2025 - 03 - 11 00:00 UTC));
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn window_is_half_open() {
        let (start, end) = day_bounds(date!(2025 - 03 - 10), UtcOffset::UTC);
        let last_instant = datetime!(2025 - 03 - 10 23:59:59.999 UTC);
        assert!(last_instant >= start && last_instant < end);
        // the next midnight itself falls outside the window
        let next_midnight = datetime!(2025 - 03 - 11 00:00 UTC);
        assert!(!(next_midnight < end));
    }

    #[test]
    fn bounds_respect_the_offset() {
        let offset = UtcOffset::from_hms(5, 30, 0).unwrap();
        let (start, _) = day_bounds(date!(2025 - 03 - 10), offset);
        assert_eq!(start.offset(), offset);
        // local midnight is 18:30 UTC the previous day
        assert_eq!(
            start.to_offset(UtcOffset::UTC),
            datetime!(2025 - 03 - 09 18:30 UTC)
        );
    }
}
