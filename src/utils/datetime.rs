//! Date and time formatting helpers
//!
//! Used to show when a task was created in a short, human-readable way
//! ("today", "yesterday", "3 days ago").

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};

/// Default date format for task listings and the generated config header
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a NaiveDate to YYYY-MM-DD string
pub fn format_ymd(d: NaiveDate) -> String {
    d.format(DEFAULT_DATE_FORMAT).to_string()
}

/// Describe a creation timestamp relative to `today` (local calendar date).
///
/// # Arguments
/// * `created_at` - Creation instant of the task
/// * `today` - Reference date, normally `Local::now().date_naive()`
/// * `date_format` - chrono format used once the date is more than a week away
pub fn format_created(created_at: DateTime<Utc>, today: NaiveDate, date_format: &str) -> String {
    let created = created_at.with_timezone(&Local).date_naive();
    let days_ago = (today - created).num_days();

    match days_ago {
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        2..=7 => format!("{} days ago", days_ago),
        _ if created.year() == today.year() && date_format == DEFAULT_DATE_FORMAT => created.format("%b %d").to_string(),
        _ => created.format(date_format).to_string(),
    }
}

/// [`format_created`] against the current local date.
pub fn format_created_now(created_at: DateTime<Utc>, date_format: &str) -> String {
    format_created(created_at, Local::now().date_naive(), date_format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn relative_labels() {
        let now = Local.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let today = now.date_naive();
        let utc = now.with_timezone(&Utc);

        assert_eq!(format_created(utc, today, DEFAULT_DATE_FORMAT), "today");
        assert_eq!(format_created(utc - Duration::days(1), today, DEFAULT_DATE_FORMAT), "yesterday");
        assert_eq!(format_created(utc - Duration::days(3), today, DEFAULT_DATE_FORMAT), "3 days ago");
        assert_eq!(format_created(utc - Duration::days(30), today, DEFAULT_DATE_FORMAT), "May 16");
        assert_eq!(format_created(utc - Duration::days(30), today, "%d/%m/%Y"), "16/05/2025");
    }
}
