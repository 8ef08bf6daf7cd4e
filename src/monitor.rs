//! Proactive check-in when low moods cluster on today's weekday.
//!
//! [`evaluate`] is the pure trigger decision. [`PatternMonitor`] acts on it:
//! one inference call, one `ai_suggestion` record, at most once per account.
//! The guard is the presence of a prior suggestion in the snapshot itself, so
//! reloads and repeated snapshots stay idempotent.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Weekday;

use crate::aggregate::Summary;
use crate::inference::InferenceService;
use crate::notify::{self, Notice, Notifier};
use crate::record::types::Emotion;
use crate::record::{NewRecord, Snapshot};
use crate::store::{CollectionPath, DocumentStore};

/// Low-mood records on the same weekday needed to trigger.
pub const TRIGGER_COUNT: usize = 2;

/// A decision to send a check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub day: Weekday,
    pub reason: String,
}

/// Decide whether a check-in is due.
pub fn evaluate(snapshot: &Snapshot, summary: &Summary, today: Weekday) -> Option<Trigger> {
    if snapshot.has_suggestion() {
        return None;
    }

    let low = summary
        .moods_on(today)
        .filter(|p| p.emotion.parse::<Emotion>().is_ok_and(|e| e.is_low()))
        .count();

    (low >= TRIGGER_COUNT).then(|| Trigger {
        day: today,
        reason: format!("User has logged feeling sad/tired on {today} multiple times."),
    })
}

pub fn suggestion_prompt(trigger: &Trigger) -> String {
    format!(
        "A user of a women's wellness app in India seems to be repeatedly sad on {}s. \
         Write a short, gentle, proactive, and caring message in Hinglish to check in on them. \
         Reason: {}.",
        long_day_name(trigger.day),
        trigger.reason
    )
}

fn long_day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub struct PatternMonitor {
    store: Arc<dyn DocumentStore>,
    inference: Arc<dyn InferenceService>,
    notifier: Arc<dyn Notifier>,
    /// Collections with a check-in in flight or already written by this monitor.
    /// Covers snapshots loaded before the written suggestion became visible.
    claimed: Mutex<HashSet<CollectionPath>>,
}

impl PatternMonitor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        inference: Arc<dyn InferenceService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            inference,
            notifier,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Evaluate one aggregated snapshot and, when due, write the check-in.
    ///
    /// Returns the id of the written `ai_suggestion` record. All failures are
    /// logged and swallowed.
    pub async fn observe(
        &self,
        path: &CollectionPath,
        snapshot: &Snapshot,
        summary: &Summary,
        today: Weekday,
    ) -> Option<String> {
        let trigger = evaluate(snapshot, summary, today)?;

        if !self.claim(path) {
            tracing::debug!(collection = %path, "check-in already claimed");
            return None;
        }

        tracing::info!(day = %trigger.day, collection = %path, "low-mood pattern detected");
        self.notifier.notify(Notice::info(notify::SUGGESTION_INCOMING));

        let written = self.write_suggestion(path, &trigger).await;
        if written.is_none() {
            self.release(path);
        }
        written
    }

    fn claim(&self, path: &CollectionPath) -> bool {
        self.claimed
            .lock()
            .map(|mut claimed| claimed.insert(path.clone()))
            .unwrap_or(false)
    }

    fn release(&self, path: &CollectionPath) {
        if let Ok(mut claimed) = self.claimed.lock() {
            claimed.remove(path);
        }
    }

    async fn write_suggestion(&self, path: &CollectionPath, trigger: &Trigger) -> Option<String> {
        let suggestion = match self.inference.generate(&suggestion_prompt(trigger), None).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!("check-in generation returned nothing");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "check-in generation failed");
                return None;
            }
        };

        match self.store.append(path, NewRecord::ai_suggestion(suggestion)).await {
            Ok(id) => {
                tracing::info!(id = %id, "check-in recorded");
                Some(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to record check-in");
                None
            }
        }
    }
}
