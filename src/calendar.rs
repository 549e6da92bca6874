//! Exchange calendar helpers. NSE runs on Indian Standard Time (UTC+05:30).

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is within range")
}

/// Calendar date in India at `now`
pub fn ist_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&ist()).date_naive()
}

pub fn today_ist() -> NaiveDate {
    ist_date(Utc::now())
}

/// Kite access tokens are invalidated at 06:00 IST the next morning
pub fn kite_token_expiry(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    let ist = ist();
    let local = issued_at.with_timezone(&ist);
    let six_am = NaiveTime::from_hms_opt(6, 0, 0).expect("06:00 is a valid time");

    let mut expiry_date = local.date_naive();
    if local.time() >= six_am {
        expiry_date += Duration::days(1);
    }

    ist.from_local_datetime(&expiry_date.and_time(six_am))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(issued_at + Duration::hours(24))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ist_date_rolls_over_before_utc() {
        // 2026-02-03 19:00 UTC is already 2026-02-04 00:30 IST
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 19, 0, 0).unwrap();
        assert_eq!(ist_date(now), NaiveDate::from_ymd_opt(2026, 2, 4).unwrap());
    }

    #[test]
    fn test_token_expiry_is_next_six_am_ist() {
        // 2026-02-09 10:00 IST
        let issued = Utc.with_ymd_and_hms(2026, 2, 9, 4, 30, 0).unwrap();
        // 2026-02-10 06:00 IST
        let expected = Utc.with_ymd_and_hms(2026, 2, 10, 0, 30, 0).unwrap();
        assert_eq!(kite_token_expiry(issued), expected);

        // 2026-02-09 05:00 IST, before the cutoff, expires the same morning
        let early = Utc.with_ymd_and_hms(2026, 2, 8, 23, 30, 0).unwrap();
        let same_morning = Utc.with_ymd_and_hms(2026, 2, 9, 0, 30, 0).unwrap();
        assert_eq!(kite_token_expiry(early), same_morning);
    }
}
