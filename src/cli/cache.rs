use anyhow::Result;

use knowdeck::ai::cache::ResponseCache;
use knowdeck::config::AppConfig;
use knowdeck::db;

fn open_cache(config: &AppConfig) -> Result<ResponseCache> {
    let conn = db::open_database(config.resolved_db_path())?;
    Ok(ResponseCache::with_ttl(db::shared(conn), config.cache.ttl()))
}

/// Display cache entry counts.
pub fn stats(config: &AppConfig) -> Result<()> {
    let stats = open_cache(config)?.stats()?;

    println!("AI Cache");
    println!("{}", "=".repeat(40));
    println!("  Total entries:       {}", stats.total_entries);
    println!("  Active:              {}", stats.active_entries);
    println!("  Expired:             {}", stats.expired_entries);
    Ok(())
}

pub fn clear(config: &AppConfig) -> Result<()> {
    open_cache(config)?.clear()?;
    println!("AI cache cleared.");
    Ok(())
}

pub fn purge(config: &AppConfig) -> Result<()> {
    let removed = open_cache(config)?.purge_expired()?;
    println!("Removed {removed} expired cache entr{}.", if removed == 1 { "y" } else { "ies" });
    Ok(())
}
