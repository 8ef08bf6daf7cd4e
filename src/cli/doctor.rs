//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use saathi::config::SaathiConfig;
use saathi::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &SaathiConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `saathi chat` or `saathi say <text>` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Saathi Health Report");
    println!("====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("App id:            {}", config.app.app_id);
    println!();
    println!("Inference:");
    println!("  Provider:        {}", config.inference.provider);
    println!("  Model:           {}", config.inference.model);
    if config.inference.api_key.is_empty() {
        println!("  WARNING: no API key set. Add inference.api_key or SAATHI_API_KEY.");
    } else {
        println!("  API key:         set");
    }
    println!();
    println!("Row counts:");
    println!("  Activities:      {}", report.activity_count);
    println!("  Collections:     {}", report.collection_count);
    println!("  Pending:         {}", report.pending_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.saathi/activities.db");
        println!("  2. Or move the damaged file aside and start fresh.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
