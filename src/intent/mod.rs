//! From free-form text to structured records.
//!
//! [`classify`] owns the prompt and the defensive response parsing,
//! [`derive`] the classification → record table, and [`pipeline`] the
//! submission state machine that ties them to the store.

pub mod classify;
pub mod derive;
pub mod pipeline;

pub use classify::Classification;
pub use derive::derive_record;
pub use pipeline::{IntentPipeline, PipelineState, Submission};
