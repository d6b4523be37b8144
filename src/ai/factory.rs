//! Resolution of the active AI backend and runtime health monitoring.
//!
//! A [`ServiceFactory`] moves between three states: uninitialized,
//! remote-active and fallback-active. Initialization reads the stored
//! [`AiConfig`]; a remote provider with a usable key is smoke-tested before it
//! is trusted, and anything else resolves to the [`FallbackEngine`]. While the
//! remote backend is active a background task probes it on a fixed interval
//! and demotes to the fallback on the first failed probe. Demotion is
//! permanent until the next initialization.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::cache::ResponseCache;
use super::fallback::FallbackEngine;
use super::remote::RemoteClient;
use super::settings::SettingsStore;
use super::types::{AiConfig, AiProvider};
use super::AiService;
use crate::config::{AppConfig, HealthConfig, RemoteConfig};
use crate::db::SharedDb;

/// Input of the smoke-test call made before a remote backend is trusted.
const SMOKE_TEST_TEXT: &str = "test";

/// Which backend a factory is currently serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Uninitialized,
    Remote,
    Fallback,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Remote => "remote",
            Self::Fallback => "fallback",
        })
    }
}

enum ActiveService {
    Uninitialized,
    Remote(Arc<RemoteClient>),
    Fallback(Arc<FallbackEngine>),
}

impl ActiveService {
    fn backend(&self) -> Backend {
        match self {
            Self::Uninitialized => Backend::Uninitialized,
            Self::Remote(_) => Backend::Remote,
            Self::Fallback(_) => Backend::Fallback,
        }
    }
}

struct FactoryState {
    service: ActiveService,
    config: Option<AiConfig>,
    /// Generation of the initialization that installed `service`.
    generation: u64,
    monitor: Option<JoinHandle<()>>,
}

struct Shared {
    settings: SettingsStore,
    cache: ResponseCache,
    remote: RemoteConfig,
    health: HealthConfig,
    fallback: Arc<FallbackEngine>,
    /// Last generation handed out to an initialization.
    generation: AtomicU64,
    state: Mutex<FactoryState>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, FactoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch to the fallback if `generation` still owns the remote backend.
    fn demote(&self, generation: u64, reason: &str) -> bool {
        let mut state = self.lock_state();
        if state.generation != generation || !matches!(state.service, ActiveService::Remote(_)) {
            return false;
        }
        tracing::warn!(reason, "remote AI service unhealthy, switching to fallback");
        state.service = ActiveService::Fallback(self.fallback.clone());
        if let Some(monitor) = state.monitor.take() {
            monitor.abort();
        }
        true
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(monitor) = state.monitor.take() {
            monitor.abort();
        }
    }
}

/// Holds the active AI backend. Clones share the backend, cache and monitor.
#[derive(Clone)]
pub struct ServiceFactory {
    shared: Arc<Shared>,
}

impl ServiceFactory {
    /// Create an uninitialized factory; the backend is resolved on first use.
    pub fn create(db: SharedDb, app: &AppConfig) -> Self {
        let shared = Shared {
            settings: SettingsStore::new(db.clone()),
            cache: ResponseCache::with_ttl(db, app.cache.ttl()),
            remote: app.remote.clone(),
            health: app.health.clone(),
            fallback: Arc::new(FallbackEngine::new()),
            generation: AtomicU64::new(0),
            state: Mutex::new(FactoryState {
                service: ActiveService::Uninitialized,
                config: None,
                generation: 0,
                monitor: None,
            }),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Create a factory, persist `config` and resolve the backend from it.
    pub async fn with_config(db: SharedDb, app: &AppConfig, config: AiConfig) -> Result<Self> {
        let factory = Self::create(db, app);
        factory.update_config(config).await?;
        Ok(factory)
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.shared.settings
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.shared.cache
    }

    pub fn active_backend(&self) -> Backend {
        self.shared.lock_state().service.backend()
    }

    /// The active backend, initializing on first call.
    pub async fn get_instance(&self) -> Arc<dyn AiService> {
        if let Some(service) = self.current_service() {
            return service;
        }
        self.initialize().await;
        self.current_service()
            .unwrap_or_else(|| self.shared.fallback.clone() as Arc<dyn AiService>)
    }

    /// The config the active backend was resolved from.
    pub async fn get_config(&self) -> AiConfig {
        if let Some(config) = self.current_config() {
            return config;
        }
        self.initialize().await;
        self.current_config().unwrap_or_default()
    }

    /// Persist `config` and resolve the backend again from scratch.
    pub async fn update_config(&self, config: AiConfig) -> Result<Backend> {
        self.shared.settings.set_config(&config)?;
        Ok(self.initialize().await)
    }

    /// Load the stored config and resolve the backend.
    ///
    /// Never fails: an unreadable config, a missing key, or a failed smoke
    /// test all resolve to the fallback.
    pub async fn initialize(&self) -> Backend {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.stop_monitor();

        let config = match self.shared.settings.get_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load AI config, using defaults");
                AiConfig::default()
            }
        };

        let remote = match (config.provider, config.usable_api_key()) {
            (AiProvider::Remote, Some(api_key)) => self.connect_remote(api_key).await,
            (AiProvider::Remote, None) => {
                tracing::info!("remote AI provider selected without an API key");
                None
            }
            (AiProvider::None, _) => None,
        };

        self.install(generation, config, remote)
    }

    /// Probe the remote backend now, demoting on failure. Returns the backend
    /// active afterwards.
    pub async fn run_health_check(&self) -> Backend {
        let Some((client, generation)) = self.current_remote() else {
            return self.active_backend();
        };
        match client.probe(&self.shared.health.probe_text).await {
            Ok(()) => tracing::debug!("AI health check passed"),
            Err(e) => {
                self.shared.demote(generation, &e.to_string());
            }
        }
        self.active_backend()
    }

    /// Stop the health monitor. The active backend stays as it is.
    pub fn shutdown(&self) {
        self.stop_monitor();
    }

    async fn connect_remote(&self, api_key: &str) -> Option<Arc<RemoteClient>> {
        let client = match RemoteClient::new(
            api_key,
            self.shared.remote.clone(),
            self.shared.cache.clone(),
        ) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "failed to create remote AI client");
                return None;
            }
        };

        match client.probe(SMOKE_TEST_TEXT).await {
            Ok(()) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "remote AI smoke test failed, using fallback");
                None
            }
        }
    }

    fn install(
        &self,
        generation: u64,
        config: AiConfig,
        remote: Option<Arc<RemoteClient>>,
    ) -> Backend {
        let mut state = self.shared.lock_state();
        if state.generation > generation {
            tracing::debug!(generation, current = state.generation, "stale AI initialization discarded");
            return state.service.backend();
        }

        if let Some(monitor) = state.monitor.take() {
            monitor.abort();
        }
        state.generation = generation;
        state.config = Some(config);
        state.service = match remote {
            Some(client) => {
                state.monitor = Some(self.spawn_monitor(client.clone(), generation));
                ActiveService::Remote(client)
            }
            None => ActiveService::Fallback(self.shared.fallback.clone()),
        };

        let backend = state.service.backend();
        tracing::info!(%backend, generation, "AI service initialized");
        backend
    }

    fn spawn_monitor(&self, client: Arc<RemoteClient>, generation: u64) -> JoinHandle<()> {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let period = self.shared.health.interval().max(Duration::from_millis(1));
        let probe_text = self.shared.health.probe_text.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match client.probe(&probe_text).await {
                    Ok(()) => tracing::debug!("AI health check passed"),
                    Err(e) => {
                        if let Some(shared) = shared.upgrade() {
                            shared.demote(generation, &e.to_string());
                        }
                        break;
                    }
                }
                if shared.strong_count() == 0 {
                    break;
                }
            }
        })
    }

    fn stop_monitor(&self) {
        if let Some(monitor) = self.shared.lock_state().monitor.take() {
            monitor.abort();
        }
    }

    fn current_service(&self) -> Option<Arc<dyn AiService>> {
        match &self.shared.lock_state().service {
            ActiveService::Uninitialized => None,
            ActiveService::Remote(client) => Some(client.clone() as Arc<dyn AiService>),
            ActiveService::Fallback(engine) => Some(engine.clone() as Arc<dyn AiService>),
        }
    }

    fn current_remote(&self) -> Option<(Arc<RemoteClient>, u64)> {
        let state = self.shared.lock_state();
        match &state.service {
            ActiveService::Remote(client) => Some((client.clone(), state.generation)),
            _ => None,
        }
    }

    fn current_config(&self) -> Option<AiConfig> {
        self.shared.lock_state().config.clone()
    }
}
