//! Human-readable rendering of due dates.

use chrono::{DateTime, Datelike, TimeZone};
use std::fmt::Display;

/// Relative due-date label, evaluated in the time zone of `now`.
///
/// `Today at 3:04 PM`, `Tomorrow at 9:00 AM`, `Mar 5 at 3:04 PM` within the
/// current year, `Mar 5, 2027 at 3:04 PM` otherwise.
pub fn format_due_date<Tz>(due: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let due = due.with_timezone(&now.timezone());
    let time = due.format("%-I:%M %p");
    let day = due.date_naive();
    let today = now.date_naive();

    if day == today {
        return format!("Today at {}", time);
    }
    if today.succ_opt() == Some(day) {
        return format!("Tomorrow at {}", time);
    }
    if due.year() == now.year() {
        format!("{} at {}", due.format("%b %-d"), time)
    } else {
        format!("{} at {}", due.format("%b %-d, %Y"), time)
    }
}

/// Whether `due` lies in the past.
pub fn is_overdue<Tz: TimeZone>(due: &DateTime<Tz>, now: &DateTime<Tz>) -> bool {
    due < now
}
