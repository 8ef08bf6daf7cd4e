//! English → Hindi translation helper.

use crate::inference::InferenceService;
use crate::notify::{self, Notice, Notifier};

pub fn translation_prompt(text: &str) -> String {
    format!("Translate to Hindi: \"{text}\"")
}

/// Translate `text`. Blank input is ignored; failures notify and return `None`.
pub async fn translate_to_hindi(
    inference: &dyn InferenceService,
    notifier: &dyn Notifier,
    text: &str,
) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match inference.generate(&translation_prompt(text), None).await {
        Ok(translated) => Some(translated.trim().to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "translation failed");
            notifier.notify(Notice::alert(notify::TRANSLATION_FAILED));
            None
        }
    }
}
