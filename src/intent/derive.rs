//! Derivation table: classification → exactly one record.

use super::classify::Classification;
use crate::record::NewRecord;

/// Map a validated classification to the record that acknowledges it.
pub fn derive_record(classification: &Classification) -> NewRecord {
    match classification {
        Classification::Expense { category, amount } => NewRecord::expense(*category, *amount),
        Classification::Task { description } => NewRecord::task(description.clone()),
        Classification::Mood { emotion } => NewRecord::mood(*emotion),
        Classification::Other => NewRecord::note(),
    }
}
