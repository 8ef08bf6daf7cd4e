use anyhow::Result;

use saathi::config::SaathiConfig;
use saathi::view::{self, Surface, TextSurface};

/// Print the recent activity feed.
pub async fn feed(config: &SaathiConfig) -> Result<()> {
    let mut runtime = super::start(config, false).await?;
    let snapshot = runtime.session.snapshot().await?;

    let mut surface = TextSurface::new(super::TERMINAL_WIDTH);
    surface.apply(&view::feed(&snapshot, config.view.feed_limit));

    println!("Recent Activity");
    println!("{}", "=".repeat(40));
    super::print_lines(surface.lines());
    super::drain_notices(&mut runtime.notices);
    Ok(())
}
