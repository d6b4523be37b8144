//! CLI `config` commands — view and change the stored AI provider settings.

use anyhow::{anyhow, Result};

use knowdeck::ai::{AiConfig, AiProvider, Backend};
use knowdeck::config::AppConfig;

/// Print the stored provider and a masked API key.
pub fn show(config: &AppConfig) -> Result<()> {
    let factory = super::open_factory(config)?;
    let ai = factory.settings().get_config()?;

    println!("Provider:          {}", ai.provider);
    println!(
        "API key:           {}",
        ai.api_key.as_deref().map(mask_key).unwrap_or_else(|| "(not set)".into())
    );
    println!("Endpoint:          {}", config.remote.base_url);
    Ok(())
}

/// Save a new provider (and optionally key), then report which backend resolves.
pub async fn set(config: &AppConfig, provider: &str, api_key: Option<String>) -> Result<()> {
    let provider: AiProvider = provider.parse().map_err(|e: String| anyhow!(e))?;
    let factory = super::open_factory(config)?;

    let api_key = match api_key {
        Some(key) => Some(key),
        None => factory.settings().get_api_key()?,
    };
    let backend = factory.update_config(AiConfig { provider, api_key }).await?;
    factory.shutdown();

    report_backend(provider, backend);
    Ok(())
}

/// Replace only the stored API key.
pub async fn set_key(config: &AppConfig, key: &str) -> Result<()> {
    let factory = super::open_factory(config)?;
    factory.settings().set_api_key(key)?;
    let provider = factory.settings().get_config()?.provider;
    let backend = factory.initialize().await;
    factory.shutdown();

    report_backend(provider, backend);
    Ok(())
}

/// Forget the stored settings.
pub fn reset(config: &AppConfig) -> Result<()> {
    let factory = super::open_factory(config)?;
    factory.settings().reset()?;
    println!("AI settings reset. Using local fallback.");
    Ok(())
}

fn report_backend(provider: AiProvider, backend: Backend) {
    println!("Saved provider:    {provider}");
    println!("Active backend:    {backend}");
    if provider == AiProvider::Remote && backend != Backend::Remote {
        println!("Remote service unavailable (missing key or failed check); using local fallback.");
    }
}

fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "****".into();
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("****{tail}")
}
