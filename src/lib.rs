//! AI service layer for Knowledge Deck — tags, summaries and similarity for
//! notes and bookmarks, from a hosted inference API when one is configured and
//! healthy, or from local heuristics otherwise.
//!
//! # Architecture
//!
//! - **Backends**: a remote client for the hosted API (bearer auth, 503 retry
//!   with exponential backoff, typed errors) and a deterministic local fallback
//! - **Resolution**: a service factory that smoke-tests the remote backend,
//!   probes it periodically, and demotes to the fallback when it fails
//! - **Caching**: per-fingerprint responses with a TTL, expired lazily
//! - **Storage**: SQLite holding the provider settings and the cache
//!
//! # Modules
//!
//! - [`config`] — Application configuration from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, migrations, and health checks
//! - [`ai`] — Backends, cache, settings, factory, and the caller facade

pub mod ai;
pub mod config;
pub mod db;
