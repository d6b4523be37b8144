//! Caller-facing convenience layer.
//!
//! Backends report expected failures as [`AiResponse::Failure`]; this is the
//! one place that turns them into `Err`.

use super::error::AiError;
use super::factory::ServiceFactory;
use super::types::{AiResponse, SimilarItem};

#[derive(Clone)]
pub struct AiClient {
    factory: ServiceFactory,
}

impl AiClient {
    pub fn new(factory: ServiceFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &ServiceFactory {
        &self.factory
    }

    pub async fn generate_tags(&self, content: &str) -> Result<Vec<String>, AiError> {
        let service = self.factory.get_instance().await;
        let result = unwrap_response(service.generate_tags(content).await)?;
        Ok(result.tags)
    }

    /// Summary of `content`, trimmed. A blank summary is an error.
    pub async fn generate_summary(&self, content: &str) -> Result<String, AiError> {
        let service = self.factory.get_instance().await;
        let result = unwrap_response(service.generate_summary(content).await)?;
        let summary = result.summary.trim();
        if summary.is_empty() {
            return Err(AiError::EmptySummary);
        }
        Ok(summary.to_string())
    }

    pub async fn find_similar_content(
        &self,
        content: &str,
        items: &[String],
    ) -> Result<Vec<SimilarItem>, AiError> {
        let service = self.factory.get_instance().await;
        let result = unwrap_response(service.find_similar_content(content, items).await)?;
        Ok(result.similar_items)
    }
}

fn unwrap_response<T>(response: AiResponse<T>) -> Result<T, AiError> {
    response.into_result().map_err(AiError::Service)
}
