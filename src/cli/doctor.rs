//! CLI `doctor` command — check the database and the AI backend, print a report.

use anyhow::{Context, Result};

use knowdeck::ai::{AiProvider, Backend, ServiceFactory};
use knowdeck::config::AppConfig;
use knowdeck::db;

/// Run diagnostics and print a health report.
pub async fn doctor(config: &AppConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Knowdeck Health Report");
    println!("======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
    }
    println!("Stored records:    {}", report.kv_count);
    println!("Cached responses:  {}", report.cache_count);
    println!();

    let factory = ServiceFactory::create(db::shared(conn), config);
    let stats = factory.cache().stats()?;
    println!("AI cache:");
    println!("  Active:          {}", stats.active_entries);
    println!("  Expired:         {}", stats.expired_entries);
    println!();

    let ai = factory.settings().get_config()?;
    println!("AI service:");
    println!("  Provider:        {}", ai.provider);
    println!("  Endpoint:        {}", config.remote.base_url);
    let backend = factory.initialize().await;
    factory.shutdown();
    println!("  Active backend:  {backend}");

    if ai.provider == AiProvider::Remote && backend == Backend::Fallback {
        println!();
        if ai.usable_api_key().is_none() {
            println!("  No API key set. Run `knowdeck config set-key <KEY>`.");
        } else {
            println!("  Remote smoke test failed; check the API key and network access.");
        }
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
