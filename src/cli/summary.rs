use anyhow::Result;
use chrono::Local;

use saathi::aggregate::aggregate;
use saathi::config::SaathiConfig;
use saathi::view::{self, surface::chart_lines};

/// Print the dashboard cards and both charts.
pub async fn summary(config: &SaathiConfig) -> Result<()> {
    let mut runtime = super::start(config, false).await?;
    let snapshot = runtime.session.snapshot().await?;
    let summary = aggregate(&snapshot, &Local);
    let dashboard = view::dashboard(&summary);

    if let Some(identity) = runtime.session.identity() {
        println!("[{}] {}", identity.initial(), identity.short_id());
    }
    println!("Summary");
    println!("{}", "=".repeat(40));
    println!("  Spent:           {}", dashboard.expense_total);
    println!("  Mood:            {}", dashboard.mood);
    println!("  Records:         {}", snapshot.len());
    println!();
    println!("Charts:");
    super::print_lines(&chart_lines(&summary.expense_by_category, &summary.weekly_mood()));
    super::drain_notices(&mut runtime.notices);
    Ok(())
}
