use anyhow::Result;

use saathi::config::SaathiConfig;
use saathi::view::{self, Surface, TextSurface};

/// Submit one message and print the reply and the refreshed feed.
pub async fn say(config: &SaathiConfig, text: &str) -> Result<()> {
    let mut runtime = super::start(config, false).await?;

    let outcome = runtime.session.submit(text).await;
    super::drain_notices(&mut runtime.notices);
    let submission = outcome?;

    let snapshot = runtime.session.snapshot().await?;
    if let Some(reply) = snapshot.get(&submission.derived_record_id) {
        println!("{}", reply.text);
    }
    tracing::debug!(
        derived = %submission.derived_type,
        id = %submission.derived_record_id,
        "submission recorded"
    );

    // A due check-in would otherwise be cancelled when the process exits.
    if let Some(id) = runtime.session.settle().await {
        tracing::debug!(id = %id, "check-in recorded before exit");
    }
    let snapshot = runtime.session.snapshot().await?;

    let mut surface = TextSurface::new(super::TERMINAL_WIDTH);
    surface.apply(&view::feed(&snapshot, config.view.feed_limit));
    println!();
    super::print_lines(surface.lines());
    super::drain_notices(&mut runtime.notices);
    Ok(())
}
