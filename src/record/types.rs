//! Activity record type definitions.
//!
//! Defines [`RecordType`] (the closed tag set plus a lossy fallback for stored
//! values outside it), [`Details`] (the per-type payload), [`Timestamp`]
//! (resolved or pending ordering key), [`ActivityRecord`] (a stored record), and
//! [`NewRecord`] (a record waiting to be appended).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of an activity record.
///
/// Records written by this crate always use one of the named variants. Records
/// read back from a store may carry any string, which decodes to
/// [`RecordType::Unknown`] and renders like a note.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// Raw text the user typed or spoke.
    User,
    /// Generic acknowledgement when no structured intent was found.
    Note,
    /// A spending entry with category and amount.
    Expense,
    /// A reminder with a task description.
    Task,
    /// A logged emotion.
    Mood,
    /// A proactive check-in written by the pattern monitor.
    AiSuggestion,
    /// Any stored type string outside the closed set.
    Unknown(String),
}

impl RecordType {
    /// Store-compatible string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Note => "note",
            Self::Expense => "expense",
            Self::Task => "task",
            Self::Mood => "mood",
            Self::AiSuggestion => "ai_suggestion",
            Self::Unknown(other) => other.as_str(),
        }
    }

    /// Decode a stored type string. Never fails.
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "user" => Self::User,
            "note" => Self::Note,
            "expense" => Self::Expense,
            "task" => Self::Task,
            "mood" => Self::Mood,
            "ai_suggestion" => Self::AiSuggestion,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether the record was authored on the user's side of the conversation.
    pub fn is_outbound(&self) -> bool {
        matches!(self, Self::User | Self::AiSuggestion)
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of emotions a mood record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Happy,
    Sad,
    Tired,
    Calm,
    Angry,
    Excited,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Self::Happy,
        Self::Sad,
        Self::Tired,
        Self::Calm,
        Self::Angry,
        Self::Excited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Tired => "tired",
            Self::Calm => "calm",
            Self::Angry => "angry",
            Self::Excited => "excited",
        }
    }

    /// Position on the 1–5 mood chart.
    pub fn score(&self) -> u8 {
        match self {
            Self::Happy | Self::Excited => 5,
            Self::Calm => 4,
            Self::Tired => 2,
            Self::Sad | Self::Angry => 1,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Happy => "😊",
            Self::Sad => "😔",
            Self::Tired => "😴",
            Self::Calm => "😌",
            Self::Angry => "😠",
            Self::Excited => "🎉",
        }
    }

    /// True for the emotions the pattern monitor watches for.
    pub fn is_low(&self) -> bool {
        matches!(self, Self::Sad | Self::Tired)
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == normalized)
            .ok_or_else(|| format!("unknown emotion: {s}"))
    }
}

/// Chart score for a raw stored emotion string. Unknown emotions sit mid-scale.
pub fn mood_score(raw: &str) -> u8 {
    raw.parse::<Emotion>().map(|e| e.score()).unwrap_or(3)
}

/// Icon for a raw emotion string, with a heart for anything unrecognized.
pub fn mood_icon(raw: &str) -> &'static str {
    raw.parse::<Emotion>().map(|e| e.icon()).unwrap_or("💖")
}

/// The spending categories the classifier is asked to choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpenseCategory {
    Groceries,
    Transport,
    Bills,
    Shopping,
    Food,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        Self::Groceries,
        Self::Transport,
        Self::Bills,
        Self::Shopping,
        Self::Food,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groceries => "Groceries",
            Self::Transport => "Transport",
            Self::Bills => "Bills",
            Self::Shopping => "Shopping",
            Self::Food => "Food",
            Self::Other => "Other",
        }
    }

    /// Case-insensitive match against the known categories; anything else is `Other`.
    pub fn normalize(s: &str) -> Self {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .unwrap_or(Self::Other)
    }
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDetails {
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    pub task_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodDetails {
    /// Raw emotion string as stored. Usually one of [`Emotion`], but a store
    /// may hold anything.
    pub emotion: String,
}

/// Type-specific payload of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    Expense(ExpenseDetails),
    Task(TaskDetails),
    Mood(MoodDetails),
}

impl Details {
    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            Self::Expense(d) => serde_json::to_value(d),
            Self::Task(d) => serde_json::to_value(d),
            Self::Mood(d) => serde_json::to_value(d),
        };
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Decode a stored payload for the given record type.
    ///
    /// Returns `None` when the type carries no payload or the payload does not
    /// match the shape the type dictates. Negative or non-finite expense
    /// amounts are rejected.
    pub fn from_json(record_type: &RecordType, value: &serde_json::Value) -> Option<Self> {
        match record_type {
            RecordType::Expense => {
                let d: ExpenseDetails = serde_json::from_value(value.clone()).ok()?;
                (d.amount.is_finite() && d.amount >= 0.0).then_some(Self::Expense(d))
            }
            RecordType::Task => serde_json::from_value(value.clone()).ok().map(Self::Task),
            RecordType::Mood => serde_json::from_value(value.clone()).ok().map(Self::Mood),
            _ => None,
        }
    }
}

/// Store-assigned ordering key.
///
/// Variant order matters: the derived `Ord` places every resolved timestamp
/// before `Pending`, so a pending write sorts as the newest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Timestamp {
    Resolved(DateTime<Utc>),
    Pending,
}

impl Timestamp {
    pub fn resolved(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Resolved(t) => Some(*t),
            Self::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// A record as delivered by the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    /// Store-assigned identifier (UUID v7 for the SQLite store).
    pub id: String,
    pub record_type: RecordType,
    /// Human-readable summary, always present.
    pub text: String,
    pub icon: Option<String>,
    pub details: Option<Details>,
    pub timestamp: Timestamp,
    /// Store insertion order, used to break timestamp ties.
    pub sequence: i64,
}

impl ActivityRecord {
    pub fn expense(&self) -> Option<&ExpenseDetails> {
        match (&self.record_type, &self.details) {
            (RecordType::Expense, Some(Details::Expense(d))) => Some(d),
            _ => None,
        }
    }

    pub fn mood(&self) -> Option<&MoodDetails> {
        match (&self.record_type, &self.details) {
            (RecordType::Mood, Some(Details::Mood(d))) => Some(d),
            _ => None,
        }
    }
}

/// A record to append. The store assigns `id`, `timestamp`, and `sequence`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub record_type: RecordType,
    pub text: String,
    pub icon: Option<String>,
    pub details: Option<Details>,
}

/// Acknowledgement text for anything the classifier could not structure.
pub const NOTE_TEXT: &str = "I've made a note of that.";

impl NewRecord {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            record_type: RecordType::User,
            text: text.into(),
            icon: None,
            details: None,
        }
    }

    pub fn note() -> Self {
        Self {
            record_type: RecordType::Note,
            text: NOTE_TEXT.to_string(),
            icon: Some("📝".into()),
            details: None,
        }
    }

    pub fn expense(category: ExpenseCategory, amount: f64) -> Self {
        Self {
            record_type: RecordType::Expense,
            text: format!("Got it. Added ₹{} to {category}.", format_amount(amount)),
            icon: Some("💸".into()),
            details: Some(Details::Expense(ExpenseDetails {
                category: category.as_str().to_string(),
                amount,
            })),
        }
    }

    pub fn task(description: impl Into<String>) -> Self {
        let task_description = description.into();
        Self {
            record_type: RecordType::Task,
            text: format!("Reminder set: \"{task_description}\""),
            icon: Some("✅".into()),
            details: Some(Details::Task(TaskDetails { task_description })),
        }
    }

    pub fn mood(emotion: Emotion) -> Self {
        Self {
            record_type: RecordType::Mood,
            text: format!("Thanks for sharing that you're feeling {emotion}."),
            icon: Some(emotion.icon().to_string()),
            details: Some(Details::Mood(MoodDetails {
                emotion: emotion.as_str().to_string(),
            })),
        }
    }

    pub fn ai_suggestion(text: impl Into<String>) -> Self {
        Self {
            record_type: RecordType::AiSuggestion,
            text: text.into(),
            icon: Some("💖".into()),
            details: None,
        }
    }
}

/// Format a rupee amount the way people write it: no trailing `.0` on whole numbers.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{amount:.0}")
    } else {
        format!("{amount}")
    }
}
