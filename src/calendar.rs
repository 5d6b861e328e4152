//! Day/week/month/year bucket derivation for the activity rollup databases.
//!
//! Bucket naming and date ranges are pure functions of the calendar date;
//! resolving them into Notion pages happens in [`crate::notion::session`].
//! All computation uses the fixed Asia/Shanghai offset.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Fixed destination timezone (Asia/Shanghai, no DST).
pub fn shanghai() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("UTC+8 is a valid offset")
}

/// Converts a Unix timestamp to its local calendar date at UTC+8.
pub fn local_date(timestamp: i64) -> Option<NaiveDate> {
    let utc = Utc.timestamp_opt(timestamp, 0).single()?;
    Some(utc.with_timezone(&shanghai()).date_naive())
}

/// One rollup bucket: its display name plus the date range it covers.
/// `end` is `None` for point-in-time buckets (days).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight exists")
}

/// Year bucket: "2024", spanning Jan 1 to Dec 31 at midnight.
pub fn year_bucket(date: NaiveDate) -> Bucket {
    let first = NaiveDate::from_ymd_opt(date.year(), 1, 1).expect("Jan 1 exists");
    let last = NaiveDate::from_ymd_opt(date.year(), 12, 31).expect("Dec 31 exists");
    Bucket {
        name: format!("{}", date.year()),
        start: midnight(first),
        end: Some(midnight(last)),
    }
}

/// Month bucket: "2024年1月" (month not zero-padded), spanning the 1st to the
/// last calendar day of the month at midnight.
pub fn month_bucket(date: NaiveDate) -> Bucket {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).expect("first of month");
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
    .expect("first of next month");
    let last = next_month - Duration::days(1);
    Bucket {
        name: format!("{}年{}月", date.year(), date.month()),
        start: midnight(first),
        end: Some(midnight(last)),
    }
}

/// Week bucket: "2024年第1周" under ISO 8601 week semantics (weeks start on
/// Monday and belong to the year owning the majority of their days), spanning
/// Monday to Sunday at midnight.
pub fn week_bucket(date: NaiveDate) -> Bucket {
    let iso = date.iso_week();
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    let sunday = monday + Duration::days(6);
    Bucket {
        name: format!("{}年第{}周", iso.year(), iso.week()),
        start: midnight(monday),
        end: Some(midnight(sunday)),
    }
}

/// Day bucket: "2024年01月01日" (zero-padded), a single point at midnight.
pub fn day_bucket(date: NaiveDate) -> Bucket {
    Bucket {
        name: date.format("%Y年%m月%d日").to_string(),
        start: midnight(date),
        end: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn buckets_for_first_monday_of_2024() {
        let date = d(2024, 1, 1);

        assert_eq!(day_bucket(date).name, "2024年01月01日");
        assert_eq!(week_bucket(date).name, "2024年第1周");
        assert_eq!(month_bucket(date).name, "2024年1月");
        assert_eq!(year_bucket(date).name, "2024");
    }

    #[test]
    fn year_range_spans_jan_1_to_dec_31() {
        let bucket = year_bucket(d(2024, 7, 15));
        assert_eq!(bucket.start, midnight(d(2024, 1, 1)));
        assert_eq!(bucket.end, Some(midnight(d(2024, 12, 31))));
    }

    #[test]
    fn month_range_handles_leap_february_and_december() {
        let feb = month_bucket(d(2024, 2, 10));
        assert_eq!(feb.end, Some(midnight(d(2024, 2, 29))));

        let dec = month_bucket(d(2023, 12, 5));
        assert_eq!(dec.name, "2023年12月");
        assert_eq!(dec.end, Some(midnight(d(2023, 12, 31))));
    }

    #[test]
    fn week_belongs_to_the_iso_year_owning_it() {
        // 2023-12-31 is a Sunday belonging to ISO week 52 of 2023.
        let last = week_bucket(d(2023, 12, 31));
        assert_eq!(last.name, "2023年第52周");
        assert_eq!(last.start, midnight(d(2023, 12, 25)));
        assert_eq!(last.end, Some(midnight(d(2023, 12, 31))));

        // 2026-01-01 is a Thursday; its week is the first ISO week of 2026
        // and starts the previous Monday.
        let first = week_bucket(d(2026, 1, 1));
        assert_eq!(first.name, "2026年第1周");
        assert_eq!(first.start, midnight(d(2025, 12, 29)));
    }

    #[test]
    fn local_date_shifts_by_utc_plus_8() {
        // 2024-01-01 23:30 UTC is already Jan 2 in Shanghai.
        let ts = Utc
            .with_ymd_and_hms(2024, 1, 1, 23, 30, 0)
            .unwrap()
            .timestamp();
        assert_eq!(local_date(ts), Some(d(2024, 1, 2)));
    }
}
