//! Time-window and search filtering over a store snapshot.
//!
//! Filtering never reorders: the snapshot already arrives recency-descending
//! and the result is a subsequence of it. The current moment is always passed
//! in so the same inputs give the same output.

use crate::journal_entry::JournalEntry;
use chrono::{DateTime, Months, NaiveDate, TimeDelta, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl TimeWindow {
    pub fn label(self) -> &'static str {
        match self {
            TimeWindow::All => "All Entries",
            TimeWindow::Today => "Today",
            TimeWindow::Week => "This Week",
            TimeWindow::Month => "This Month",
        }
    }

    pub fn next(self) -> TimeWindow {
        match self {
            TimeWindow::All => TimeWindow::Today,
            TimeWindow::Today => TimeWindow::Week,
            TimeWindow::Week => TimeWindow::Month,
            TimeWindow::Month => TimeWindow::All,
        }
    }
}

pub fn filter_entries<'a, Tz: TimeZone>(
    entries: &'a [JournalEntry],
    window: TimeWindow,
    search: &str,
    now: &DateTime<Tz>,
) -> Vec<&'a JournalEntry> {
    let needle = search.to_lowercase();
    let bounds = WindowBounds::new(window, now);
    let tz = now.timezone();

    entries
        .iter()
        .filter(|entry| bounds.contains(entry, &tz))
        .filter(|entry| needle.is_empty() || entry.matches_search(&needle))
        .collect()
}

/// Earliest local calendar day kept by [`TimeWindow::Month`].
///
/// One calendar month back from `today`; when that month is shorter the day
/// clamps to its last valid day (31 March gives 28 or 29 February).
pub fn month_floor(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_months(Months::new(1))
        .unwrap_or(NaiveDate::MIN)
}

enum WindowBounds {
    All,
    OnDay(NaiveDate),
    Since(DateTime<Utc>),
    FromDay(NaiveDate),
}

impl WindowBounds {
    fn new<Tz: TimeZone>(window: TimeWindow, now: &DateTime<Tz>) -> Self {
        match window {
            TimeWindow::All => WindowBounds::All,
            TimeWindow::Today => WindowBounds::OnDay(now.date_naive()),
            TimeWindow::Week => {
                WindowBounds::Since(now.with_timezone(&Utc) - TimeDelta::days(7))
            }
            TimeWindow::Month => WindowBounds::FromDay(month_floor(now.date_naive())),
        }
    }

    fn contains<Tz: TimeZone>(&self, entry: &JournalEntry, tz: &Tz) -> bool {
        match self {
            WindowBounds::All => true,
            WindowBounds::OnDay(day) => entry.date.with_timezone(tz).date_naive() == *day,
            WindowBounds::Since(threshold) => entry.date >= *threshold,
            WindowBounds::FromDay(day) => entry.date.with_timezone(tz).date_naive() >= *day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal_entry::{EntryId, Mood, UserId};
    use chrono::FixedOffset;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        tz().with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn entry(id: &str, date: DateTime<FixedOffset>, title: Option<&str>, text: &str) -> JournalEntry {
        JournalEntry {
            id: EntryId::new(id),
            owner_id: UserId::new("u1"),
            title: title.map(str::to_string),
            text: text.to_string(),
            date: date.with_timezone(&Utc),
            mood: Mood::Neutral,
            tags: vec![],
            created_at: None,
        }
    }

    fn ids(entries: &[&JournalEntry]) -> Vec<String> {
        entries.iter().map(|e| e.id.to_string()).collect()
    }

    #[test]
    fn all_is_identity() {
        let now = at(2024, 5, 10, 12, 0);
        let entries = vec![
            entry("a", at(2024, 5, 10, 9, 0), None, "one"),
            entry("b", at(2020, 1, 1, 9, 0), None, "two"),
        ];
        let out = filter_entries(&entries, TimeWindow::All, "", &now);
        assert_eq!(ids(&out), vec!["a", "b"]);
    }

    #[test]
    fn today_uses_local_calendar_day() {
        let now = at(2024, 5, 10, 12, 0);
        let entries = vec![
            entry("late", at(2024, 5, 10, 23, 59), None, "x"),
            entry("early", at(2024, 5, 10, 0, 0), None, "x"),
            entry("yesterday", at(2024, 5, 9, 23, 59), None, "x"),
        ];
        let out = filter_entries(&entries, TimeWindow::Today, "", &now);
        assert_eq!(ids(&out), vec!["late", "early"]);
    }

    #[test]
    fn today_is_empty_when_everything_is_older() {
        let now = at(2024, 5, 10, 12, 0);
        let entries = vec![
            entry("a", at(2024, 5, 9, 12, 0), None, "x"),
            entry("b", at(2024, 4, 1, 12, 0), None, "x"),
        ];
        assert!(filter_entries(&entries, TimeWindow::Today, "", &now).is_empty());
    }

    #[test]
    fn week_boundary_is_inclusive() {
        let now = at(2024, 5, 10, 12, 0);
        let entries = vec![
            entry("seven", now.clone() - TimeDelta::days(7), None, "x"),
            entry("eight", now.clone() - TimeDelta::days(8), None, "x"),
        ];
        let out = filter_entries(&entries, TimeWindow::Week, "", &now);
        assert_eq!(ids(&out), vec!["seven"]);
    }

    #[test]
    fn month_keeps_from_local_midnight_a_month_back() {
        let now = at(2024, 5, 10, 12, 0);
        let entries = vec![
            entry("floor", at(2024, 4, 10, 0, 0), None, "x"),
            entry("before", at(2024, 4, 9, 23, 59), None, "x"),
        ];
        let out = filter_entries(&entries, TimeWindow::Month, "", &now);
        assert_eq!(ids(&out), vec!["floor"]);
    }

    #[test]
    fn month_floor_clamps_to_last_day() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(month_floor(d(2024, 3, 31)), d(2024, 2, 29));
        assert_eq!(month_floor(d(2023, 3, 31)), d(2023, 2, 28));
        assert_eq!(month_floor(d(2024, 1, 15)), d(2023, 12, 15));
    }

    #[test]
    fn search_is_case_insensitive_over_text_and_title() {
        let now = at(2024, 5, 10, 12, 0);
        let entries = vec![
            entry("text", at(2024, 5, 1, 8, 0), None, "Hello World"),
            entry("title", at(2024, 5, 1, 7, 0), Some("HELLO again"), "body"),
            entry("none", at(2024, 5, 1, 6, 0), None, "goodbye"),
        ];
        let out = filter_entries(&entries, TimeWindow::All, "hello", &now);
        assert_eq!(ids(&out), vec!["text", "title"]);
    }

    #[test]
    fn window_and_search_combine_and_keep_order() {
        let now = at(2024, 5, 10, 12, 0);
        let entries = vec![
            entry("c", at(2024, 5, 10, 11, 0), None, "walk in the park"),
            entry("b", at(2024, 5, 8, 11, 0), None, "park again"),
            entry("a", at(2024, 5, 1, 11, 0), None, "park once"),
        ];
        let out = filter_entries(&entries, TimeWindow::Week, "PARK", &now);
        assert_eq!(ids(&out), vec!["c", "b"]);
    }

    #[test]
    fn windows_cycle() {
        let mut window = TimeWindow::default();
        let mut seen = vec![window];
        for _ in 0..4 {
            window = window.next();
            seen.push(window);
        }
        assert_eq!(
            seen,
            vec![
                TimeWindow::All,
                TimeWindow::Today,
                TimeWindow::Week,
                TimeWindow::Month,
                TimeWindow::All
            ]
        );
    }
}
