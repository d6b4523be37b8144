//! Client for the hosted inference API.
//!
//! Every call goes `POST {base_url}/{model}` with a bearer token and a
//! `{"inputs": ...}` body. 503 responses and transport failures are retried
//! with exponential backoff inside one attempt budget; 401, 429 and any other
//! status fail immediately. Successful results are cached per fingerprint and
//! a cache hit skips the network entirely.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::cache::{prefix, ResponseCache};
use super::error::RemoteError;
use super::fallback::truncate_chars;
use super::payload::{EmbeddingPayload, NerPayload, SummaryPayload};
use super::types::{AiResponse, SimilarItem, SimilaritySearch, SummaryGeneration, TagGeneration};
use super::AiService;
use crate::config::RemoteConfig;

/// Entities at or below this score are not turned into tags.
const TAG_MIN_SCORE: f64 = 0.5;
const TAG_CONFIDENCE: f64 = 0.8;
/// Used when the summarization model does not report a score.
const SUMMARY_DEFAULT_CONFIDENCE: f64 = 0.8;
const SUMMARY_MAX_CHARS: usize = 250;

pub struct RemoteClient {
    http: reqwest::Client,
    api_key: String,
    config: RemoteConfig,
    cache: ResponseCache,
}

impl RemoteClient {
    /// Build a client. Fails without a non-blank API key.
    pub fn new(
        api_key: &str,
        config: RemoteConfig,
        cache: ResponseCache,
    ) -> Result<Self, RemoteError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(RemoteError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            config,
            cache,
        })
    }

    /// Uncached tagging request, used for smoke tests and health checks.
    pub async fn probe(&self, text: &str) -> Result<(), RemoteError> {
        self.fetch_tags(text).await.map(|_| ())
    }

    async fn fetch_tags(&self, content: &str) -> Result<TagGeneration, RemoteError> {
        let payload: NerPayload = self
            .query(&self.config.tagging_model, Value::from(content))
            .await?;
        Ok(TagGeneration {
            tags: payload.tags(TAG_MIN_SCORE),
            confidence: TAG_CONFIDENCE,
        })
    }

    async fn fetch_summary(&self, content: &str) -> Result<SummaryGeneration, RemoteError> {
        let input: String = content.chars().take(self.config.summary_input_chars).collect();
        let payload: SummaryPayload = self
            .query(&self.config.summarization_model, Value::from(input))
            .await?;
        let (summary, score) = payload.into_summary()?;
        Ok(SummaryGeneration {
            summary: truncate_chars(&summary, SUMMARY_MAX_CHARS),
            confidence: score.unwrap_or(SUMMARY_DEFAULT_CONFIDENCE),
        })
    }

    async fn fetch_similar(
        &self,
        content: &str,
        items: &[String],
    ) -> Result<SimilaritySearch, RemoteError> {
        let query: EmbeddingPayload = self
            .query(&self.config.similarity_model, Value::from(content))
            .await?;
        let query = query.into_single()?;

        if items.is_empty() {
            return Ok(SimilaritySearch {
                similar_items: Vec::new(),
            });
        }

        let batch: EmbeddingPayload = self
            .query(&self.config.similarity_model, Value::from(items.to_vec()))
            .await?;
        let embeddings = batch.into_batch(items.len())?;

        let mut similar_items = embeddings
            .iter()
            .enumerate()
            .map(|(i, embedding)| {
                Ok(SimilarItem {
                    id: i.to_string(),
                    score: cosine_similarity(&query, embedding)?,
                })
            })
            .collect::<Result<Vec<_>, RemoteError>>()?;
        similar_items.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(SimilaritySearch { similar_items })
    }

    /// POST `inputs` to `model`, retrying 503s and transport errors.
    async fn query<P: DeserializeOwned>(&self, model: &str, inputs: Value) -> Result<P, RemoteError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), model);
        let body = serde_json::json!({ "inputs": inputs });
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match outcome {
                Ok(response) if response.status().is_success() => {
                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|e| RemoteError::Transport(e.to_string()))?;
                    return serde_json::from_slice(&bytes)
                        .map_err(|e| RemoteError::Malformed(e.to_string()));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    if let Some(err) = RemoteError::from_status(status, attempt, max_attempts) {
                        tracing::warn!(model, status, attempt, error = %err, "AI request failed");
                        return Err(err);
                    }
                    tracing::debug!(model, status, attempt, "AI service warming up, retrying");
                }
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!(model, attempt, error = %e, "AI request failed");
                    return Err(RemoteError::Transport(e.to_string()));
                }
                Err(e) => {
                    tracing::debug!(model, attempt, error = %e, "AI request errored, retrying");
                }
            }

            tokio::time::sleep(self.backoff(attempt)).await;
        }
    }

    /// Delay after the given 1-based attempt: `base × 2^(attempt - 1)`.
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.config.base_delay().saturating_mul(1 << exponent)
    }

    /// Serve from cache, or compute, cache, and return.
    async fn cached<T, F>(&self, key: String, operation: &'static str, compute: F) -> AiResponse<T>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<T, RemoteError>>,
    {
        if let Some(hit) = self.cache.get::<T>(&key) {
            return AiResponse::Success(hit);
        }

        match compute.await {
            Ok(result) => {
                if let Err(e) = self.cache.set(&key, &result) {
                    tracing::warn!(operation, error = %e, "failed to cache AI response");
                }
                AiResponse::Success(result)
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "remote AI operation failed");
                AiResponse::failure(e.to_string())
            }
        }
    }
}

#[async_trait]
impl AiService for RemoteClient {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn generate_tags(&self, content: &str) -> AiResponse<TagGeneration> {
        let key = ResponseCache::create_key(prefix::TAGS, content);
        self.cached(key, "tags", self.fetch_tags(content)).await
    }

    async fn generate_summary(&self, content: &str) -> AiResponse<SummaryGeneration> {
        let key = ResponseCache::create_key(prefix::SUMMARY, content);
        self.cached(key, "summary", self.fetch_summary(content)).await
    }

    async fn find_similar_content(
        &self,
        content: &str,
        items: &[String],
    ) -> AiResponse<SimilaritySearch> {
        let key = ResponseCache::create_list_key(prefix::SIMILAR, content, items);
        self.cached(key, "similar", self.fetch_similar(content, items))
            .await
    }
}

/// `dot(a, b) / (|a| · |b|)`, or 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, RemoteError> {
    if a.len() != b.len() {
        return Err(RemoteError::Malformed(format!(
            "embedding dimensions differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}
