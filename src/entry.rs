//! Core data structures for the moodlog application.
//!
//! This module contains the mood check-in record and the two closed
//! vocabularies it is built from: the 1-5 mood scale and the context tags.
use std::{convert::TryFrom, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::MoodError;

/// A mood rating on the 1 (lowest) to 5 (highest) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Mood(u8);

impl Mood {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validates a raw rating, rejecting anything outside the scale.
    pub fn new(value: i64) -> Result<Self, MoodError> {
        Mood::try_from(value)
    }

    /// Returns the numeric rating.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Short label shown next to the rating when checking in.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Rough",
            2 => "Not great",
            3 => "Okay",
            4 => "Good",
            _ => "Amazing",
        }
    }

    pub fn sentiment(self) -> Sentiment {
        match self.0 {
            4..=5 => Sentiment::Positive,
            3 => Sentiment::Neutral,
            _ => Sentiment::Negative,
        }
    }
}

impl TryFrom<i64> for Mood {
    type Error = MoodError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Mood::MIN)..=i64::from(Mood::MAX)).contains(&value) {
            Ok(Mood(value as u8))
        } else {
            Err(MoodError::InvalidMood { value })
        }
    }
}

impl From<Mood> for u8 {
    fn from(mood: Mood) -> Self {
        mood.0
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse grouping of the mood scale used for colouring output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// A factor affecting mood, drawn from a fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextTag {
    Sleep,
    Work,
    Social,
    Exercise,
    Family,
    Hobbies,
    Food,
    Health,
    Weather,
}

impl ContextTag {
    /// Every tag in display order.
    pub const ALL: [ContextTag; 9] = [
        ContextTag::Sleep,
        ContextTag::Work,
        ContextTag::Social,
        ContextTag::Exercise,
        ContextTag::Family,
        ContextTag::Hobbies,
        ContextTag::Food,
        ContextTag::Health,
        ContextTag::Weather,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContextTag::Sleep => "Sleep",
            ContextTag::Work => "Work",
            ContextTag::Social => "Social",
            ContextTag::Exercise => "Exercise",
            ContextTag::Family => "Family",
            ContextTag::Hobbies => "Hobbies",
            ContextTag::Food => "Food",
            ContextTag::Health => "Health",
            ContextTag::Weather => "Weather",
        }
    }
}

impl FromStr for ContextTag {
    type Err = MoodError;

    /// Matching is exact and case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContextTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| MoodError::UnknownTag { tag: s.to_string() })
    }
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a single mood check-in. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    /// Unique identifier for the entry
    pub id: String,
    /// Mood rating
    pub mood: Mood,
    /// Context tags, in the order they were selected
    pub tags: Vec<ContextTag>,
    /// Free-text notes, possibly empty
    pub notes: String,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl MoodEntry {
    pub fn has_tag(&self, tag: ContextTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Creation time as a UTC datetime, `None` if the timestamp is out of range.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Calendar date of the entry in the given time zone.
    pub fn date_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<NaiveDate> {
        tz.timestamp_millis_opt(self.timestamp)
            .single()
            .map(|dt| dt.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    #[test]
    fn mood_accepts_scale_bounds() {
        assert_eq!(Mood::new(1).unwrap().value(), 1);
        assert_eq!(Mood::new(5).unwrap().value(), 5);
    }

    #[test]
    fn mood_rejects_out_of_range() {
        assert!(matches!(
            Mood::new(0),
            Err(MoodError::InvalidMood { value: 0 })
        ));
        assert!(matches!(
            Mood::new(6),
            Err(MoodError::InvalidMood { value: 6 })
        ));
        assert!(Mood::new(-3).is_err());
    }

    #[test]
    fn mood_labels_and_sentiment() {
        let rough = Mood::new(1).unwrap();
        let okay = Mood::new(3).unwrap();
        let amazing = Mood::new(5).unwrap();
        assert_eq!(rough.label(), "Rough");
        assert_eq!(amazing.label(), "Amazing");
        assert_eq!(rough.sentiment(), Sentiment::Negative);
        assert_eq!(okay.sentiment(), Sentiment::Neutral);
        assert_eq!(Mood::new(4).unwrap().sentiment(), Sentiment::Positive);
    }

    #[test]
    fn tag_parsing_is_case_sensitive() {
        assert_eq!("Sleep".parse::<ContextTag>().unwrap(), ContextTag::Sleep);
        assert!(matches!(
            "sleep".parse::<ContextTag>(),
            Err(MoodError::UnknownTag { ref tag }) if tag == "sleep"
        ));
        assert!("Gaming".parse::<ContextTag>().is_err());
    }

    #[test]
    fn entry_uses_legacy_json_layout() {
        let json = r#"{"id":"1700000000000","mood":4,"tags":["Sleep","Work"],"notes":"ok","timestamp":1700000000000}"#;
        let entry: MoodEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.mood.value(), 4);
        assert_eq!(entry.tags, vec![ContextTag::Sleep, ContextTag::Work]);

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["mood"], 4);
        assert_eq!(value["tags"][1], "Work");
        assert_eq!(value["timestamp"], 1_700_000_000_000_i64);
    }

    #[test]
    fn entry_with_invalid_mood_fails_to_decode() {
        let json = r#"{"id":"1","mood":9,"tags":[],"notes":"","timestamp":1}"#;
        assert!(serde_json::from_str::<MoodEntry>(json).is_err());
    }

    #[test]
    fn date_in_follows_time_zone() {
        // 2024-03-10T23:30:00Z
        let entry = MoodEntry {
            id: "a".into(),
            mood: Mood::new(3).unwrap(),
            tags: vec![],
            notes: String::new(),
            timestamp: 1_710_113_400_000,
        };
        let utc_date = entry.date_in(&Utc).unwrap();
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(utc_date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(
            entry.date_in(&east).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
    }
}
