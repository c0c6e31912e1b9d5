use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Monday = 0 … Sunday = 6.
pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

pub fn days_in_month(date: NaiveDate) -> usize {
    let (year, month) = (date.year(), date.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|next| next.pred_opt())
        .map(|last| last.day() as usize)
        .unwrap_or(31)
}

/// Monday 00:00 local of the ISO week containing `now`.
pub fn start_of_iso_week(now: DateTime<Local>) -> DateTime<Local> {
    let monday = now.date_naive() - Duration::days(weekday_index(now.date_naive()) as i64);
    let midnight = monday.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        // Midnight can be skipped by a DST jump; the instant itself is a fine bound then.
        .unwrap_or_else(|| Local.from_utc_datetime(&midnight))
}

/// The last `days` calendar days ending at `today`, oldest first.
pub fn trailing_days(today: NaiveDate, days: usize) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .map(|offset| today - Duration::days(offset as i64))
        .collect()
}
