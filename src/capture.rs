//! Check-in capture: turns raw user input into a validated entry draft.
use log::{debug, warn};

use crate::{ContextTag, Mood, Result};

/// A validated check-in that has not been stored yet.
///
/// The store assigns the `id` and `timestamp` when the draft is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    mood: Mood,
    tags: Vec<ContextTag>,
    notes: String,
}

impl EntryDraft {
    /// Builds a draft from already-typed values, dropping repeated tags.
    pub fn new(mood: Mood, tags: impl IntoIterator<Item = ContextTag>, notes: String) -> Self {
        let mut unique = Vec::new();
        for tag in tags {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }

        Self {
            mood,
            tags: unique,
            notes,
        }
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn tags(&self) -> &[ContextTag] {
        &self.tags
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub(crate) fn into_parts(self) -> (Mood, Vec<ContextTag>, String) {
        (self.mood, self.tags, self.notes)
    }
}

/// Validates raw check-in input.
///
/// Out-of-range moods and tags outside the vocabulary are rejected, never
/// coerced. Duplicate tags keep their first position. Notes are taken
/// verbatim, empty included.
pub fn build_draft<S: AsRef<str>>(mood: i64, tags: &[S], notes: impl Into<String>) -> Result<EntryDraft> {
    let mood = Mood::new(mood).inspect_err(|e| warn!("Rejected check-in: {}", e))?;

    let tags = tags
        .iter()
        .map(|t| t.as_ref().parse::<ContextTag>())
        .collect::<Result<Vec<_>>>()
        .inspect_err(|e| warn!("Rejected check-in: {}", e))?;

    let draft = EntryDraft::new(mood, tags, notes.into());
    debug!(
        "Built draft: mood={} tags={:?} notes_len={}",
        draft.mood,
        draft.tags,
        draft.notes.len()
    );
    Ok(draft)
}
