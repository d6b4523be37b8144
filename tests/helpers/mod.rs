#![allow(dead_code)]

use knowdeck::ai::cache::ResponseCache;
use knowdeck::ai::remote::RemoteClient;
use knowdeck::config::AppConfig;
use knowdeck::db::{self, SharedDb};
use rusqlite::Connection;
use wiremock::{MockServer, ResponseTemplate};

pub const TAGS_PATH: &str = "/models/dbmdz/bert-large-cased-finetuned-conll03-english";
pub const SUMMARY_PATH: &str = "/models/facebook/bart-large-cnn";
pub const SIMILARITY_PATH: &str = "/models/sentence-transformers/all-MiniLM-L6-v2";

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

pub fn test_db() -> SharedDb {
    db::shared(test_conn())
}

/// App config pointed at `server`, with millisecond backoff.
pub fn test_config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.remote.base_url = format!("{}/models", server.uri());
    config.remote.base_delay_ms = 1;
    config.remote.timeout_secs = 5;
    config
}

pub fn remote_client(server: &MockServer) -> RemoteClient {
    let config = test_config(server);
    RemoteClient::new("test-key", config.remote, ResponseCache::new(test_db())).unwrap()
}

/// A successful NER response with one confident entity.
pub fn ner_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!([
        {"word": "Rust", "score": 0.98, "entity": "B-MISC"}
    ]))
}

pub fn summary_ok(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "summary_text": text }]))
}
