//! Classification prompt, response schema, and defensive response parsing.
//!
//! The model's reply is parsed into a loose [`RawClassification`] where every
//! field is an untyped JSON value, then validated into a tagged
//! [`Classification`]. Anything that fails validation becomes
//! [`Classification::Other`].

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Result, SaathiError};
use crate::record::{Emotion, ExpenseCategory};

/// Build the fixed classification prompt around the user's text.
pub fn classification_prompt(text: &str) -> String {
    format!(
        "Analyze this Hinglish text from a user: \"{text}\". \
         Classify intent ('expense', 'task', 'mood', 'other') and extract details. \
         For mood, use one of: 'happy', 'sad', 'tired', 'calm', 'angry', 'excited'. \
         For expense, use one category: 'Groceries', 'Transport', 'Bills', 'Shopping', 'Food', 'Other'. \
         Respond ONLY with a valid JSON object."
    )
}

/// Output-shape constraint sent with the classification prompt.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "intent": { "type": "STRING" },
            "category": { "type": "STRING" },
            "amount": { "type": "NUMBER" },
            "task_description": { "type": "STRING" },
            "emotion": { "type": "STRING" }
        },
        "required": ["intent"]
    })
}

/// A validated classification, ready for the derivation table.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Expense {
        category: ExpenseCategory,
        amount: f64,
    },
    Task {
        description: String,
    },
    Mood {
        emotion: Emotion,
    },
    Other,
}

/// The reply as the model sent it. No field is trusted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawClassification {
    pub intent: Option<Value>,
    pub category: Option<Value>,
    pub amount: Option<Value>,
    pub task_description: Option<Value>,
    pub emotion: Option<Value>,
}

impl Classification {
    /// Parse and validate a reply. Never fails: anything unusable is `Other`.
    pub fn from_response(text: &str) -> Self {
        match parse_response(text).and_then(|raw| validate(&raw)) {
            Ok(classification) => classification,
            Err(e) => {
                tracing::debug!(error = %e, "classification fell back to note");
                Self::Other
            }
        }
    }
}

/// Decode the reply text as a JSON object, tolerating a surrounding code fence.
pub fn parse_response(text: &str) -> Result<RawClassification> {
    let body = strip_code_fence(text);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SaathiError::Classification(format!("response is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(SaathiError::Classification(
            "response is not a JSON object".into(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| SaathiError::Classification(format!("unexpected response shape: {e}")))
}

/// Check the fields the reported intent requires.
pub fn validate(raw: &RawClassification) -> Result<Classification> {
    let intent = raw
        .intent
        .as_ref()
        .and_then(non_blank_str)
        .map(|s| s.to_ascii_lowercase());

    match intent.as_deref() {
        Some("expense") => {
            let amount = raw
                .amount
                .as_ref()
                .and_then(positive_amount)
                .ok_or_else(|| missing("expense", "amount"))?;
            let category = raw
                .category
                .as_ref()
                .and_then(non_blank_str)
                .ok_or_else(|| missing("expense", "category"))?;
            Ok(Classification::Expense {
                category: ExpenseCategory::normalize(category),
                amount,
            })
        }
        Some("task") => {
            let description = raw
                .task_description
                .as_ref()
                .and_then(non_blank_str)
                .ok_or_else(|| missing("task", "task_description"))?;
            Ok(Classification::Task {
                description: description.to_string(),
            })
        }
        Some("mood") => {
            let emotion = raw
                .emotion
                .as_ref()
                .and_then(non_blank_str)
                .and_then(|s| s.parse::<Emotion>().ok())
                .ok_or_else(|| missing("mood", "emotion"))?;
            Ok(Classification::Mood { emotion })
        }
        _ => Ok(Classification::Other),
    }
}

fn missing(intent: &str, field: &str) -> SaathiError {
    SaathiError::Validation(format!("{intent} intent without a usable {field}"))
}

fn non_blank_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Accept a positive finite number, or a string holding one.
fn positive_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('₹').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
