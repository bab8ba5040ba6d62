//! Filtered, time-ordered views of the entry collection.
use std::cmp::Reverse;

use chrono::TimeZone;

use crate::{ContextTag, MoodEntry};

/// Shown in place of an entry's notes when none were written.
pub const EMPTY_NOTES_PLACEHOLDER: &str = "No note added.";

/// Keeps entries carrying `tag` (all entries when `None`) and orders them
/// newest first. Entries with equal timestamps keep their relative order.
pub fn filter_and_sort(entries: &[MoodEntry], tag: Option<ContextTag>) -> Vec<MoodEntry> {
    let mut view: Vec<MoodEntry> = entries
        .iter()
        .filter(|e| tag.is_none_or(|t| e.has_tag(t)))
        .cloned()
        .collect();

    // stable
    view.sort_by_key(|e| Reverse(e.timestamp));
    view
}

/// History listing parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Only include entries with this tag
    pub tag: Option<ContextTag>,
    /// Maximum number of entries returned
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn apply(&self, entries: &[MoodEntry]) -> Vec<MoodEntry> {
        let mut view = filter_and_sort(entries, self.tag);
        if let Some(limit) = self.limit {
            view.truncate(limit);
        }
        view
    }

    /// Message for an empty listing.
    pub fn empty_message(&self) -> &'static str {
        if self.tag.is_some() {
            "No entries with this tag"
        } else {
            "No entries yet. Start tracking!"
        }
    }
}

/// Formats an entry's time as e.g. `Oct 16, 09:30` in `tz`.
pub fn format_entry_time<Tz: TimeZone>(entry: &MoodEntry, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_millis_opt(entry.timestamp).single() {
        Some(at) => at.format("%b %-d, %H:%M").to_string(),
        None => entry.timestamp.to_string(),
    }
}

/// The entry's notes, or the placeholder when they are empty.
pub fn notes_or_placeholder(entry: &MoodEntry) -> &str {
    if entry.notes.is_empty() {
        EMPTY_NOTES_PLACEHOLDER
    } else {
        &entry.notes
    }
}
