//! Derived dashboard figures, recomputed from scratch for every snapshot.

use std::collections::BTreeMap;

use chrono::{Datelike, TimeZone, Weekday};

use crate::record::types::mood_score;
use crate::record::Snapshot;

/// Weekday labels for the 7-slot mood chart, Sunday first.
pub const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// One mood record placed on the week.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodPoint {
    /// Local day of week of the record's timestamp.
    pub day: Weekday,
    /// 1–5 chart score.
    pub value: u8,
    /// Raw emotion as stored.
    pub emotion: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Total spend per category.
    pub expense_by_category: BTreeMap<String, f64>,
    /// Mood records with a resolved timestamp, oldest first.
    pub mood_history: Vec<MoodPoint>,
    /// Emotion of the chronologically last mood record, pending ones included.
    pub latest_mood: Option<String>,
}

impl Summary {
    pub fn total_expense(&self) -> f64 {
        self.expense_by_category.values().sum()
    }

    /// Sun..Sat chart slots: the latest mood score logged on each weekday.
    pub fn weekly_mood(&self) -> [Option<u8>; 7] {
        let mut slots = [None; 7];
        for point in &self.mood_history {
            slots[point.day.num_days_from_sunday() as usize] = Some(point.value);
        }
        slots
    }

    /// Mood points on `day`, oldest first.
    pub fn moods_on(&self, day: Weekday) -> impl Iterator<Item = &MoodPoint> {
        self.mood_history.iter().filter(move |p| p.day == day)
    }
}

/// Aggregate a snapshot, placing timestamps on weekdays in `tz`.
pub fn aggregate<Tz: TimeZone>(snapshot: &Snapshot, tz: &Tz) -> Summary {
    let mut summary = Summary::default();

    for record in snapshot.chronological() {
        if let Some(expense) = record.expense() {
            *summary
                .expense_by_category
                .entry(expense.category.clone())
                .or_insert(0.0) += expense.amount;
        }

        if let Some(mood) = record.mood() {
            summary.latest_mood = Some(mood.emotion.clone());

            // Pending records have no day yet.
            if let Some(at) = record.timestamp.resolved() {
                summary.mood_history.push(MoodPoint {
                    day: at.with_timezone(tz).weekday(),
                    value: mood_score(&mood.emotion),
                    emotion: mood.emotion.clone(),
                });
            }
        }
    }

    summary
}
