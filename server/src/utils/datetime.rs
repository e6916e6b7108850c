use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::utils::error::AppError;

/// Combines a calendar date and a time of day, both given in the event time
/// zone, into a UTC instant.
pub fn combine_date_time(date: NaiveDate, time: NaiveTime, tz: Tz) -> Result<DateTime<Utc>, AppError> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "{date} {} does not exist in time zone {tz}",
                time.format("%H:%M")
            ))
        })
}

/// Short form used in announcements, e.g. `Thu, 7 Dec at 12:00`.
/// The year is appended when it differs from the current one:
/// `Sat, 6 Jan at 12:00, 2024`.
pub fn format_event_start(start: DateTime<Utc>, tz: Tz, now: DateTime<Utc>) -> String {
    let local = start.with_timezone(&tz);
    let mut formatted = local.format("%a, %-d %b at %H:%M").to_string();
    if local.year() != now.with_timezone(&tz).year() {
        formatted.push_str(&format!(", {}", local.year()));
    }
    formatted
}
