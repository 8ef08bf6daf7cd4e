//! Saathi: a personal assistant core over a per-user activity log.
//!
//! Free-form messages (English, Hindi or Hinglish) are classified by a hosted
//! language model into expenses, tasks, moods or notes and recorded in a live
//! document store. Every snapshot of a user's collection is re-aggregated and
//! re-rendered from scratch, and a pattern monitor writes one gentle check-in
//! when low moods cluster on the same weekday.
//!
//! # Modules
//!
//! - [`record`] typed activity records and ordered snapshots
//! - [`store`] the document store trait, live subscriptions and the SQLite backend
//! - [`db`] schema, migrations and health checks for the SQLite backend
//! - [`inference`] the language-model service and its Gemini client
//! - [`intent`] classification, record derivation and the submission pipeline
//! - [`aggregate`] expense totals and mood history
//! - [`view`] render instructions and text surfaces
//! - [`monitor`] the low-mood check-in
//! - [`session`] wiring for one identity and one live subscription
//! - [`identity`] anonymous and token sign-in with change notifications
//! - [`translate`] Hindi translation through the inference service
//! - [`notify`] user-facing notices
//! - [`config`] TOML configuration with environment overrides
//! - [`error`] the crate error type

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod inference;
pub mod intent;
pub mod monitor;
pub mod notify;
pub mod record;
pub mod session;
pub mod store;
pub mod translate;
pub mod view;
