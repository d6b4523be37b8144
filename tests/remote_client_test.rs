mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use helpers::{ner_ok, remote_client, summary_ok, SIMILARITY_PATH, SUMMARY_PATH, TAGS_PATH};
use knowdeck::ai::cache::ResponseCache;
use knowdeck::ai::remote::RemoteClient;
use knowdeck::ai::{AiResponse, AiService};
use knowdeck::config::RemoteConfig;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn sends_bearer_token_and_inputs_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TAGS_PATH))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_json(serde_json::json!({"inputs": "Rust is great"})))
        .respond_with(ner_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let result = client.generate_tags("Rust is great").await;

    let data = result.data().expect("tags should succeed");
    assert_eq!(data.tags, vec!["rust"]);
    assert_eq!(data.confidence, 0.8);
    server.verify().await;
}

#[tokio::test]
async fn retries_503_three_times_then_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TAGS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let result = client.generate_tags("anything").await;

    let error = result.error().expect("should fail");
    assert!(error.contains("temporarily unavailable"), "got: {error}");
    server.verify().await;
}

#[tokio::test]
async fn recovers_when_503_clears_before_last_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TAGS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TAGS_PATH))
        .respond_with(ner_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    assert!(client.generate_tags("warming up").await.is_success());
    server.verify().await;
}

#[tokio::test]
async fn rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let result = client.generate_summary("some long text").await;

    let error = result.error().expect("should fail");
    assert!(error.contains("rate limit"), "got: {error}");
    server.verify().await;
}

#[tokio::test]
async fn invalid_key_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let result = client.generate_tags("text").await;

    let error = result.error().expect("should fail");
    assert!(error.contains("API key"), "got: {error}");
    server.verify().await;
}

#[tokio::test]
async fn other_statuses_fail_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let error = client.generate_tags("text").await.error().unwrap().to_string();
    assert!(error.contains("500"), "got: {error}");
    server.verify().await;
}

#[tokio::test]
async fn network_errors_become_failures() {
    let config = RemoteConfig {
        base_url: "http://127.0.0.1:1/models".into(),
        base_delay_ms: 1,
        timeout_secs: 2,
        ..RemoteConfig::default()
    };
    let client =
        RemoteClient::new("test-key", config, ResponseCache::new(helpers::test_db())).unwrap();

    let result = client.generate_tags("offline").await;
    let error = result.error().expect("should fail");
    assert!(error.contains("network error"), "got: {error}");
}

#[tokio::test]
async fn dropped_connections_use_the_whole_attempt_budget() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });

    let config = RemoteConfig {
        base_url: format!("http://{addr}/models"),
        base_delay_ms: 1,
        timeout_secs: 2,
        max_attempts: 3,
        ..RemoteConfig::default()
    };
    let client =
        RemoteClient::new("test-key", config, ResponseCache::new(helpers::test_db())).unwrap();

    let result = client.generate_tags("server hangs up").await;
    let error = result.error().expect("should fail");
    assert!(error.contains("network error"), "got: {error}");
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn malformed_payload_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUMMARY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "?"})))
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let error = client.generate_summary("text").await.error().unwrap().to_string();
    assert!(error.contains("malformed"), "got: {error}");
}

#[tokio::test]
async fn second_summary_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUMMARY_PATH))
        .respond_with(summary_ok("A short summary."))
        .expect(1)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let first = client.generate_summary("Long article text.").await;
    let second = client.generate_summary("Long article text.").await;

    assert_eq!(first, second);
    assert_eq!(first.data().unwrap().summary, "A short summary.");
    server.verify().await;
}

#[tokio::test]
async fn empty_summary_fails_and_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUMMARY_PATH))
        .respond_with(summary_ok("   "))
        .expect(2)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    for _ in 0..2 {
        let error = client.generate_summary("text").await.error().unwrap().to_string();
        assert!(error.contains("empty response"), "got: {error}");
    }
    server.verify().await;
}

#[tokio::test]
async fn summary_input_and_output_are_clamped() {
    let server = MockServer::start().await;
    let long_summary = "s".repeat(300);
    Mock::given(method("POST"))
        .and(path(SUMMARY_PATH))
        .and(body_json(serde_json::json!({"inputs": "0123456789"})))
        .respond_with(summary_ok(&long_summary))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = helpers::test_config(&server).remote;
    config.summary_input_chars = 10;
    let client =
        RemoteClient::new("test-key", config, ResponseCache::new(helpers::test_db())).unwrap();

    let result = client.generate_summary("0123456789abcdef").await;
    let summary = &result.data().expect("summary should succeed").summary;
    assert_eq!(summary.chars().count(), 250);
    assert!(summary.ends_with("..."));
    server.verify().await;
}

#[tokio::test]
async fn similarity_ranks_by_cosine() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIMILARITY_PATH))
        .and(body_json(serde_json::json!({"inputs": "red apple"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1.0, 0.0])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SIMILARITY_PATH))
        .and(body_json(serde_json::json!({"inputs": ["blue sky", "red apple pie", "apple"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            [0.0, 1.0],
            [1.0, 0.0],
            [0.6, 0.8]
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let items = vec![
        "blue sky".to_string(),
        "red apple pie".to_string(),
        "apple".to_string(),
    ];
    let result = client.find_similar_content("red apple", &items).await;
    let ranked = &result.data().expect("similarity should succeed").similar_items;

    let ids: Vec<&str> = ranked.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "0"]);
    assert!((ranked[0].score - 1.0).abs() < 1e-6);
    assert!((ranked[1].score - 0.6).abs() < 1e-6);

    // Cached: no further requests.
    assert_eq!(client.find_similar_content("red apple", &items).await, result);
    server.verify().await;
}

#[tokio::test]
async fn long_query_with_new_candidates_is_not_served_from_cache() {
    let server = MockServer::start().await;
    let query = "note ".repeat(30);
    Mock::given(method("POST"))
        .and(path(SIMILARITY_PATH))
        .and(body_json(serde_json::json!({"inputs": query})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1.0, 0.0])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SIMILARITY_PATH))
        .and(body_json(serde_json::json!({"inputs": ["a", "b", "c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            [0.0, 1.0],
            [0.6, 0.8],
            [1.0, 0.0]
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SIMILARITY_PATH))
        .and(body_json(serde_json::json!({"inputs": ["only"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[1.0, 0.0]])))
        .expect(1)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let three: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let first = client.find_similar_content(&query, &three).await;
    assert_eq!(first.data().unwrap().similar_items.len(), 3);

    let one = vec!["only".to_string()];
    let second = client.find_similar_content(&query, &one).await;
    let ids: Vec<&str> = second
        .data()
        .expect("similarity should succeed")
        .similar_items
        .iter()
        .map(|item| item.id.as_str())
        .collect();
    assert_eq!(ids, vec!["0"]);
    server.verify().await;
}

#[tokio::test]
async fn embedding_count_mismatch_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIMILARITY_PATH))
        .and(body_json(serde_json::json!({"inputs": "query"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1.0, 0.0])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SIMILARITY_PATH))
        .and(body_json(serde_json::json!({"inputs": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[1.0, 0.0]])))
        .mount(&server)
        .await;

    let client = remote_client(&server);
    let items = vec!["a".to_string(), "b".to_string()];
    let result = client.find_similar_content("query", &items).await;
    assert!(matches!(result, AiResponse::Failure(_)));
}

#[tokio::test]
async fn probe_bypasses_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TAGS_PATH))
        .respond_with(ner_ok())
        .expect(3)
        .mount(&server)
        .await;

    let client = remote_client(&server);
    client.generate_tags("health check").await;
    client.probe("health check").await.unwrap();
    client.probe("health check").await.unwrap();
    server.verify().await;
}
