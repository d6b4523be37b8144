pub mod ai;
pub mod cache;
pub mod doctor;
pub mod settings;

use anyhow::Result;
use knowdeck::ai::{AiClient, ServiceFactory};
use knowdeck::config::AppConfig;
use knowdeck::db;

/// Open the configured database and build an uninitialized factory over it.
pub fn open_factory(config: &AppConfig) -> Result<ServiceFactory> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    Ok(ServiceFactory::create(db::shared(conn), config))
}

pub fn open_client(config: &AppConfig) -> Result<AiClient> {
    Ok(AiClient::new(open_factory(config)?))
}

/// Shorten `text` to `max` characters for one-line display.
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
