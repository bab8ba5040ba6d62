//! Derived statistics and chart series over a snapshot of mood entries.
//!
//! Everything here is a pure function of the entries and a reference time.
//! Entries are bucketed by the calendar date of their timestamp in the
//! reference time's zone, which is the same as the local
//! `[00:00, 24:00)` window for that day.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::Serialize;

use crate::MoodEntry;

/// Number of daily buckets in a trend series.
pub const TREND_DAYS: usize = 7;

/// How far back the streak scan looks. Longer streaks are reported as this.
pub const MAX_STREAK_DAYS: u32 = 30;

/// Minimum number of entries before a trend curve is worth drawing.
pub const MIN_TREND_ENTRIES: usize = 2;

/// One day of the trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Calendar date of the bucket
    pub date: NaiveDate,
    /// Abbreviated weekday name, e.g. "Mon"
    pub label: String,
    /// Mean mood of the day, `None` when nothing was recorded
    pub value: Option<f64>,
    /// Number of entries in the bucket
    pub entry_count: usize,
}

/// Seven daily buckets, oldest first, ending on the reference day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub points: Vec<TrendPoint>,
    /// False when the collection has fewer than [`MIN_TREND_ENTRIES`]
    /// entries; renderers should show a placeholder instead of a curve.
    pub sufficient_data: bool,
}

impl Trend {
    /// Buckets that hold data, as `(index, value)`. Renderers interpolate
    /// between these only.
    pub fn present(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.value.map(|v| (i, v)))
    }
}

/// Summary figures shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoodStats {
    /// Mean mood over every entry, one decimal place; `None` when empty
    pub average: Option<f64>,
    pub total: usize,
    /// Consecutive days with at least one entry, see [`compute_streak`]
    pub streak: u32,
}

/// Builds the 7-day trend ending on `reference`'s calendar day.
pub fn compute_trend<Tz: TimeZone>(entries: &[MoodEntry], reference: &DateTime<Tz>) -> Trend {
    let tz = reference.timezone();
    let today = reference.date_naive();
    let first = today - Days::new(TREND_DAYS as u64 - 1);

    let mut buckets: HashMap<NaiveDate, (u32, usize)> = HashMap::new();
    for entry in entries {
        let Some(day) = entry.date_in(&tz) else {
            continue;
        };
        if day < first || day > today {
            continue;
        }
        let bucket = buckets.entry(day).or_insert((0, 0));
        bucket.0 += u32::from(entry.mood.value());
        bucket.1 += 1;
    }

    let points = (0..TREND_DAYS as u64)
        .rev()
        .map(|days_back| {
            let date = today - Days::new(days_back);
            let (sum, count) = buckets.get(&date).copied().unwrap_or((0, 0));
            TrendPoint {
                date,
                label: date.format("%a").to_string(),
                value: (count > 0).then(|| f64::from(sum) / count as f64),
                entry_count: count,
            }
        })
        .collect();

    Trend {
        points,
        sufficient_data: entries.len() >= MIN_TREND_ENTRIES,
    }
}

/// Computes average, count and streak for the whole collection.
pub fn compute_stats<Tz: TimeZone>(entries: &[MoodEntry], reference: &DateTime<Tz>) -> MoodStats {
    MoodStats {
        average: average_mood(entries),
        total: entries.len(),
        streak: compute_streak(entries, reference),
    }
}

/// Unweighted mean mood rounded to one decimal place.
pub fn average_mood(entries: &[MoodEntry]) -> Option<f64> {
    if entries.is_empty() {
        return None;
    }
    let sum: u32 = entries.iter().map(|e| u32::from(e.mood.value())).sum();
    let mean = f64::from(sum) / entries.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

/// Counts consecutive days with entries, walking back from the reference
/// day for at most [`MAX_STREAK_DAYS`] days.
///
/// An empty reference day does not end the streak; the walk simply moves on
/// to the day before. Any other empty day ends it.
pub fn compute_streak<Tz: TimeZone>(entries: &[MoodEntry], reference: &DateTime<Tz>) -> u32 {
    let tz = reference.timezone();
    let today = reference.date_naive();
    let oldest = today - Days::new(u64::from(MAX_STREAK_DAYS) - 1);

    let active_days: HashSet<NaiveDate> = entries
        .iter()
        .filter_map(|e| e.date_in(&tz))
        .filter(|day| *day >= oldest && *day <= today)
        .collect();

    let mut streak = 0;
    for days_back in 0..MAX_STREAK_DAYS {
        let day = today - Days::new(u64::from(days_back));
        if active_days.contains(&day) {
            streak += 1;
        } else if days_back > 0 {
            break;
        }
    }
    streak
}
