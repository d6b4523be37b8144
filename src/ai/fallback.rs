//! Local heuristics used when no remote provider is configured or healthy.
//!
//! Everything here is deterministic and synchronous: word-frequency tags,
//! leading-sentence summaries and token-overlap similarity.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::types::{AiResponse, SimilarItem, SimilaritySearch, SummaryGeneration, TagGeneration};
use super::AiService;

/// Confidence reported for every heuristic result.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

const MAX_TAGS: usize = 5;
const MAX_SIMILAR: usize = 5;
const SUMMARY_SENTENCES: usize = 2;
const SUMMARY_MAX_CHARS: usize = 150;

const STOP_WORDS: &[&str] = &[
    "the", "be", "to", "of", "and", "a", "in", "that", "have", "this", "from", "with", "by",
    "for", "not", "are", "but", "what", "when", "where", "how", "all", "any", "both", "each",
];

#[derive(Debug, Clone, Default)]
pub struct FallbackEngine;

impl FallbackEngine {
    pub fn new() -> Self {
        Self
    }

    /// Top five most frequent non-stop-words longer than three characters.
    pub fn tags(&self, content: &str) -> TagGeneration {
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        // Counts in first-occurrence order so the stable sort breaks ties by position.
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for word in tokenize(content) {
            if word.chars().count() <= 3 || stop_words.contains(word.as_str()) {
                continue;
            }
            match index.get(&word) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(word.clone(), counts.len());
                    counts.push((word, 1));
                }
            }
        }

        counts.sort_by(|a, b| b.1.cmp(&a.1));
        TagGeneration {
            tags: counts
                .into_iter()
                .take(MAX_TAGS)
                .map(|(word, _)| word)
                .collect(),
            confidence: FALLBACK_CONFIDENCE,
        }
    }

    /// First two sentences, capped at 150 characters.
    pub fn summary(&self, content: &str) -> SummaryGeneration {
        let sentences: Vec<&str> = content
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .take(SUMMARY_SENTENCES)
            .collect();
        let summary = sentences.join(". ").trim().to_string();

        SummaryGeneration {
            summary: truncate_chars(&summary, SUMMARY_MAX_CHARS),
            confidence: FALLBACK_CONFIDENCE,
        }
    }

    /// Token-overlap ranking of `items` against `content`, best five first.
    pub fn similar(&self, content: &str, items: &[String]) -> SimilaritySearch {
        let keywords = tokenize(content);

        let mut scored: Vec<SimilarItem> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let item_tokens = tokenize(item);
                let item_words: HashSet<&str> = item_tokens.iter().map(String::as_str).collect();
                let matches = keywords
                    .iter()
                    .filter(|w| item_words.contains(w.as_str()))
                    .count();
                let denominator = keywords.len().max(item_tokens.len());
                let score = if denominator == 0 {
                    0.0
                } else {
                    matches as f64 / denominator as f64
                };
                SimilarItem {
                    id: i.to_string(),
                    score,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(MAX_SIMILAR);
        SimilaritySearch {
            similar_items: scored,
        }
    }
}

#[async_trait]
impl AiService for FallbackEngine {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn generate_tags(&self, content: &str) -> AiResponse<TagGeneration> {
        AiResponse::Success(self.tags(content))
    }

    async fn generate_summary(&self, content: &str) -> AiResponse<SummaryGeneration> {
        AiResponse::Success(self.summary(content))
    }

    async fn find_similar_content(
        &self,
        content: &str,
        items: &[String],
    ) -> AiResponse<SimilaritySearch> {
        AiResponse::Success(self.similar(content, items))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Keep `max - 3` characters plus an ellipsis when `text` exceeds `max` characters.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
