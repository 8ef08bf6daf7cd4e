pub mod snapshot;
pub mod types;

pub use snapshot::Snapshot;
pub use types::{
    ActivityRecord, Details, Emotion, ExpenseCategory, ExpenseDetails, MoodDetails, NewRecord,
    RecordType, TaskDetails, Timestamp,
};
