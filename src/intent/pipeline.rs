//! Submission state machine.
//!
//! `Idle → Submitting → Classifying → Recording → Idle`, or `→ Failed → Idle`
//! when any step errors. Only one submission runs at a time; a second call
//! while busy is rejected with [`SaathiError::Busy`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::classify::{classification_prompt, response_schema, Classification};
use super::derive::derive_record;
use crate::error::{Result, SaathiError};
use crate::inference::InferenceService;
use crate::notify::{self, Notice, Notifier};
use crate::record::{NewRecord, RecordType};
use crate::store::{CollectionPath, DocumentStore};

/// Upper bound on one classification call, independent of the transport's own timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Submitting,
    Classifying,
    Recording,
    Failed,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The raw `user` record written before classification.
    pub user_record_id: String,
    /// The derived record written after classification.
    pub derived_record_id: String,
    pub derived_type: RecordType,
    pub classification: Classification,
}

pub struct IntentPipeline {
    store: Arc<dyn DocumentStore>,
    inference: Arc<dyn InferenceService>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<PipelineState>,
    timeout: Duration,
}

impl IntentPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        inference: Arc<dyn InferenceService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            store,
            inference,
            notifier,
            state,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// While busy, the submit control must be disabled.
    pub fn is_busy(&self) -> bool {
        self.state() != PipelineState::Idle
    }

    pub fn watch_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Run one submission for the collection at `path`.
    ///
    /// `path` is `None` until an identity is established; the submission is
    /// then rejected before anything is written. The raw `user` record is not
    /// rolled back if a later step fails.
    pub async fn submit(&self, path: Option<&CollectionPath>, text: &str) -> Result<Submission> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SaathiError::Validation("nothing to submit".into()));
        }

        let Some(path) = path else {
            self.notifier.notify(Notice::alert(notify::CONNECTING));
            return Err(SaathiError::NotAuthenticated);
        };

        let in_flight = self.begin()?;
        let result = self.run(&in_flight, path, text).await;

        match result {
            Ok(ref submission) => {
                tracing::info!(
                    user_record = %submission.user_record_id,
                    derived_record = %submission.derived_record_id,
                    derived_type = %submission.derived_type,
                    "submission recorded"
                );
            }
            Err(ref e) => {
                in_flight.advance(PipelineState::Failed);
                tracing::warn!(error = %e, collection = %path, "submission failed");
                self.notifier.notify(Notice::alert(notify::NOT_UNDERSTOOD));
            }
        }
        result
    }

    async fn run(
        &self,
        in_flight: &InFlight<'_>,
        path: &CollectionPath,
        text: &str,
    ) -> Result<Submission> {
        let user_record_id = self.store.append(path, NewRecord::user(text)).await?;

        in_flight.advance(PipelineState::Classifying);
        let prompt = classification_prompt(text);
        let schema = response_schema();
        let reply = tokio::time::timeout(self.timeout, self.inference.generate(&prompt, Some(&schema)))
            .await
            .map_err(|_| SaathiError::Classification("inference timed out".into()))??;

        let classification = Classification::from_response(&reply);
        tracing::debug!(?classification, "input classified");

        in_flight.advance(PipelineState::Recording);
        let record = derive_record(&classification);
        let derived_type = record.record_type.clone();
        let derived_record_id = self.store.append(path, record).await?;

        Ok(Submission {
            user_record_id,
            derived_record_id,
            derived_type,
            classification,
        })
    }

    /// Claim the pipeline. Fails if another submission holds it.
    fn begin(&self) -> Result<InFlight<'_>> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == PipelineState::Idle {
                *state = PipelineState::Submitting;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::debug!("submission rejected, pipeline busy");
            return Err(SaathiError::Busy);
        }
        Ok(InFlight { state: &self.state })
    }
}

/// Held for the duration of a submission; returns the pipeline to `Idle` on drop.
struct InFlight<'a> {
    state: &'a watch::Sender<PipelineState>,
}

impl InFlight<'_> {
    fn advance(&self, next: PipelineState) {
        tracing::trace!(?next, "pipeline state");
        self.state.send_replace(next);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.send_replace(PipelineState::Idle);
    }
}
