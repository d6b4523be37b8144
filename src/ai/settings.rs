//! Persisted AI provider settings.
//!
//! The whole [`AiConfig`] is one JSON record under the reserved `ai_config`
//! key of the database's `kv_store` table.

use anyhow::{anyhow, Context, Result};

use super::types::AiConfig;
use crate::db::{self, SharedDb};

/// Reserved `kv_store` key for the AI configuration record.
pub const AI_CONFIG_KEY: &str = "ai_config";

#[derive(Clone)]
pub struct SettingsStore {
    db: SharedDb,
}

impl SettingsStore {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// Stored config, or `{provider: none}` when nothing has been saved.
    pub fn get_config(&self) -> Result<AiConfig> {
        let conn = self.db.lock().map_err(|e| anyhow!("database lock poisoned: {e}"))?;
        match db::kv_get(&conn, AI_CONFIG_KEY).context("failed to read AI config")? {
            Some(raw) => serde_json::from_str(&raw).context("stored AI config is not valid JSON"),
            None => Ok(AiConfig::default()),
        }
    }

    pub fn set_config(&self, config: &AiConfig) -> Result<()> {
        let raw = serde_json::to_string(config)?;
        let conn = self.db.lock().map_err(|e| anyhow!("database lock poisoned: {e}"))?;
        db::kv_set(&conn, AI_CONFIG_KEY, &raw).context("failed to save AI config")?;
        tracing::info!(provider = %config.provider, has_key = config.api_key.is_some(), "AI config saved");
        Ok(())
    }

    pub fn get_api_key(&self) -> Result<Option<String>> {
        Ok(self.get_config()?.api_key)
    }

    /// Replace only the API key, keeping the stored provider.
    pub fn set_api_key(&self, api_key: &str) -> Result<()> {
        let mut config = self.get_config()?;
        config.api_key = Some(api_key.to_string());
        self.set_config(&config)
    }

    /// Forget the stored record so the default applies again.
    pub fn reset(&self) -> Result<()> {
        let conn = self.db.lock().map_err(|e| anyhow!("database lock poisoned: {e}"))?;
        db::kv_remove(&conn, AI_CONFIG_KEY).context("failed to remove AI config")?;
        Ok(())
    }
}
