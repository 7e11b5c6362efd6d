use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::errors::EventError;

const OFFSET_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");
const TIME_HMS: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]:[second]");
const TIME_HM: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]");
const LOCAL_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Converts between absolute UTC instants and the venue's fixed civil
/// timezone. Every instant crossing this boundary is unambiguous UTC; all
/// which-day-is-today reasoning happens after conversion to local time.
#[derive(Debug, Clone, Copy)]
pub struct CalendarService {
    offset: UtcOffset,
}

impl CalendarService {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Parse a configured offset such as "+02:00" or "-05:30".
    pub fn from_offset_str(offset: &str) -> Result<Self, EventError> {
        let offset = UtcOffset::parse(offset, OFFSET_FORMAT)
            .map_err(|_| EventError::InvalidTimeFormat)?;

        Ok(Self::new(offset))
    }

    pub fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    /// Current instant expressed in the venue timezone.
    pub fn local_now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    /// Combine a local calendar date and local time-of-day into a UTC instant.
    pub fn local_date_time_to_utc(&self, date: Date, time: Time) -> OffsetDateTime {
        PrimitiveDateTime::new(date, time)
            .assume_offset(self.offset)
            .to_offset(UtcOffset::UTC)
    }

    /// UTC bounds `[midnight, next midnight)` of a local calendar day.
    pub fn local_day_bounds(&self, date: Date) -> (OffsetDateTime, OffsetDateTime) {
        let start = self.local_date_time_to_utc(date, Time::MIDNIGHT);

        (start, start + time::Duration::days(1))
    }

    pub fn format_local(&self, instant: OffsetDateTime) -> String {
        instant
            .to_offset(self.offset)
            .format(LOCAL_FORMAT)
            .unwrap_or_else(|_| instant.to_string())
    }

    /// Parse an `HH:MM` or `HH:MM:SS` wall-clock string.
    pub fn parse_time_of_day(value: &str) -> Result<Time, EventError> {
        Time::parse(value, TIME_HMS)
            .or_else(|_| Time::parse(value, TIME_HM))
            .map_err(|_| EventError::InvalidTimeFormat)
    }

    /// Weekday index with 0 = Sunday, matching the stored day set.
    pub fn weekday_index(date: Date) -> u8 {
        date.weekday().number_days_from_sunday()
    }

    /// Earliest date in `[start, end]` whose weekday is in `days`.
    pub fn first_occurrence(start: Date, days: &[u8], end: Date) -> Option<Date> {
        let mut candidate = start;

        while candidate <= end {
            if days.contains(&Self::weekday_index(candidate)) {
                return Some(candidate);
            }
            candidate = candidate.next_day()?;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, time};

    use super::*;

    #[test]
    fn rejects_malformed_offsets() {
        assert!(CalendarService::from_offset_str("+02:00").is_ok());
        assert!(CalendarService::from_offset_str("-05:30").is_ok());
        assert!(CalendarService::from_offset_str("02:00").is_err());
        assert!(CalendarService::from_offset_str("UTC+2").is_err());
    }

    #[test]
    fn local_noon_converts_to_utc_morning() {
        let calendar = CalendarService::from_offset_str("+02:00").unwrap();

        let instant = calendar.local_date_time_to_utc(date!(2026 - 03 - 02), time!(12:00));

        assert_eq!(instant, datetime!(2026-03-02 10:00 UTC));
    }

    #[test]
    fn day_bounds_cover_twenty_four_hours() {
        let calendar = CalendarService::from_offset_str("-05:00").unwrap();

        let (start, end) = calendar.local_day_bounds(date!(2026 - 03 - 02));

        assert_eq!(start, datetime!(2026-03-02 05:00 UTC));
        assert_eq!(end - start, time::Duration::days(1));
    }

    #[test]
    fn parses_both_time_of_day_forms() {
        assert_eq!(
            CalendarService::parse_time_of_day("10:00").unwrap(),
            time!(10:00)
        );
        assert_eq!(
            CalendarService::parse_time_of_day("18:30:15").unwrap(),
            time!(18:30:15)
        );
        assert!(CalendarService::parse_time_of_day("25:00").is_err());
        assert!(CalendarService::parse_time_of_day("10h00").is_err());
    }

    #[test]
    fn first_occurrence_scans_forward_within_range() {
        // 2026-03-02 is a Monday (weekday index 1).
        let start = date!(2026 - 03 - 02);
        let end = date!(2026 - 03 - 08);

        assert_eq!(
            CalendarService::first_occurrence(start, &[1], end),
            Some(start)
        );
        // Sunday = 0 only occurs at the end of that week.
        assert_eq!(
            CalendarService::first_occurrence(start, &[0], end),
            Some(date!(2026 - 03 - 08))
        );
        // Range too short to reach a Sunday.
        assert_eq!(
            CalendarService::first_occurrence(start, &[0], date!(2026 - 03 - 07)),
            None
        );
    }

    #[test]
    fn format_local_renders_venue_time() {
        let calendar = CalendarService::from_offset_str("+02:00").unwrap();

        assert_eq!(
            calendar.format_local(datetime!(2026-03-02 10:00 UTC)),
            "2026-03-02 12:00:00"
        );
    }
}
