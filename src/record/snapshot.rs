//! Ordered, complete views of one user's activity collection.

use super::types::{ActivityRecord, RecordType};

/// The full record set of a collection at one point in time, newest first.
///
/// Ordering is by timestamp descending with pending records first; ties break
/// by store sequence, newest first. A snapshot is never a delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: Vec<ActivityRecord>,
}

impl Snapshot {
    /// Build a snapshot from records in any order.
    pub fn from_records(mut records: Vec<ActivityRecord>) -> Self {
        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.sequence.cmp(&a.sequence))
        });
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records newest first.
    pub fn newest_first(&self) -> impl DoubleEndedIterator<Item = &ActivityRecord> {
        self.records.iter()
    }

    /// Records oldest first.
    pub fn chronological(&self) -> impl DoubleEndedIterator<Item = &ActivityRecord> {
        self.records.iter().rev()
    }

    pub fn get(&self, id: &str) -> Option<&ActivityRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Whether the pattern monitor has already written its check-in.
    pub fn has_suggestion(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.record_type == RecordType::AiSuggestion)
    }
}
