//! AI service resolution and resilience.
//!
//! [`AiService`] is implemented by the [`remote::RemoteClient`] (hosted
//! inference with caching and retries) and the [`fallback::FallbackEngine`]
//! (local heuristics). A [`factory::ServiceFactory`] decides which one is
//! active and [`client::AiClient`] is the error-returning facade callers use.

pub mod cache;
pub mod client;
pub mod error;
pub mod factory;
pub mod fallback;
pub mod payload;
pub mod remote;
pub mod settings;
pub mod types;

use async_trait::async_trait;

pub use client::AiClient;
pub use error::{AiError, RemoteError};
pub use factory::{Backend, ServiceFactory};
pub use types::{
    AiConfig, AiProvider, AiResponse, SimilarItem, SimilaritySearch, SummaryGeneration,
    TagGeneration,
};

/// The three AI operations. Implementations never return `Err` or panic on
/// expected failures; they report them as [`AiResponse::Failure`].
#[async_trait]
pub trait AiService: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    async fn generate_tags(&self, content: &str) -> AiResponse<TagGeneration>;

    async fn generate_summary(&self, content: &str) -> AiResponse<SummaryGeneration>;

    /// Rank `items` by similarity to `content`. Result ids are indices into `items`.
    async fn find_similar_content(
        &self,
        content: &str,
        items: &[String],
    ) -> AiResponse<SimilaritySearch>;
}
