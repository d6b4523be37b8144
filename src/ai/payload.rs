//! Response shapes returned by the hosted inference models.
//!
//! Each model family answers in more than one shape depending on the model and
//! the input (a list of objects, a single object, a bare string, flat or
//! nested vectors). Each operation gets an untagged enum of the shapes it
//! accepts, and normalization matches on it exhaustively.

use serde::Deserialize;

use super::error::RemoteError;

/// Token-classification (NER) output.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NerPayload {
    Entities(Vec<NerEntity>),
    Single(NerEntity),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NerEntity {
    pub word: String,
    pub score: f64,
    #[serde(default, alias = "entity_group")]
    pub entity: Option<String>,
}

impl NerPayload {
    /// Lower-cased words of entities scoring above `min_score`,
    /// de-duplicated in first-seen order. Blank words are dropped.
    pub fn tags(self, min_score: f64) -> Vec<String> {
        let entities = match self {
            Self::Entities(entities) => entities,
            Self::Single(entity) => vec![entity],
        };

        let mut tags: Vec<String> = Vec::new();
        for entity in entities.into_iter().filter(|e| e.score > min_score) {
            let word = entity.word.trim().to_lowercase();
            if !word.is_empty() && !tags.contains(&word) {
                tags.push(word);
            }
        }
        tags
    }
}

/// Summarization output.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SummaryPayload {
    List(Vec<SummaryText>),
    Single(SummaryText),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryText {
    #[serde(alias = "generated_text")]
    pub summary_text: String,
    #[serde(default)]
    pub score: Option<f64>,
}

impl SummaryPayload {
    /// The trimmed summary and the model's score, if it gave one.
    pub fn into_summary(self) -> Result<(String, Option<f64>), RemoteError> {
        let (text, score) = match self {
            Self::List(items) => {
                let first = items
                    .into_iter()
                    .next()
                    .ok_or(RemoteError::Empty("no summary returned"))?;
                (first.summary_text, first.score)
            }
            Self::Single(item) => (item.summary_text, item.score),
            Self::Text(text) => (text, None),
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(RemoteError::Empty("summary text was blank"));
        }
        Ok((text.to_string(), score))
    }
}

/// Feature-extraction output.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingPayload {
    Flat(Vec<f32>),
    Nested(Vec<Vec<f32>>),
}

impl EmbeddingPayload {
    /// A single vector; a nested payload must contain exactly one row.
    pub fn into_single(self) -> Result<Vec<f32>, RemoteError> {
        let vector = match self {
            Self::Flat(vector) => vector,
            Self::Nested(mut rows) if rows.len() == 1 => rows.remove(0),
            Self::Nested(rows) => {
                return Err(RemoteError::Malformed(format!(
                    "expected one embedding, got {}",
                    rows.len()
                )))
            }
        };
        non_empty(vector)
    }

    /// One vector per input; the count must match `expected`.
    pub fn into_batch(self, expected: usize) -> Result<Vec<Vec<f32>>, RemoteError> {
        let rows = match self {
            Self::Nested(rows) => rows,
            // A single-input batch may come back flattened.
            Self::Flat(vector) if expected == 1 => vec![vector],
            Self::Flat(_) => {
                return Err(RemoteError::Malformed(format!(
                    "expected {expected} embeddings, got a single vector"
                )))
            }
        };
        if rows.len() != expected {
            return Err(RemoteError::Malformed(format!(
                "expected {expected} embeddings, got {}",
                rows.len()
            )));
        }
        rows.into_iter().map(non_empty).collect()
    }
}

fn non_empty(vector: Vec<f32>) -> Result<Vec<f32>, RemoteError> {
    if vector.is_empty() {
        Err(RemoteError::Empty("embedding vector was empty"))
    } else {
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ner_list_and_single_shapes() {
        let list: NerPayload = serde_json::from_str(
            r#"[{"word":"Paris","score":0.99,"entity":"B-LOC"},
                {"word":"paris","score":0.9,"entity":"B-LOC"},
                {"word":"Maybe","score":0.2,"entity":"B-MISC"},
                {"word":"Rust","score":0.7,"entity_group":"MISC"}]"#,
        )
        .unwrap();
        assert_eq!(list.tags(0.5), vec!["paris", "rust"]);

        let single: NerPayload =
            serde_json::from_str(r#"{"word":"Berlin","score":0.8}"#).unwrap();
        assert_eq!(single.tags(0.5), vec!["berlin"]);
    }

    #[test]
    fn ner_drops_blank_words() {
        let list: NerPayload =
            serde_json::from_str(r#"[{"word":"  ","score":0.99}]"#).unwrap();
        assert!(list.tags(0.5).is_empty());
    }

    #[test]
    fn summary_shapes() {
        let list: SummaryPayload =
            serde_json::from_str(r#"[{"summary_text":" Short. ","score":0.9}]"#).unwrap();
        assert_eq!(list.into_summary().unwrap(), ("Short.".to_string(), Some(0.9)));

        let single: SummaryPayload =
            serde_json::from_str(r#"{"generated_text":"Generated"}"#).unwrap();
        assert_eq!(single.into_summary().unwrap(), ("Generated".to_string(), None));

        let text: SummaryPayload = serde_json::from_str(r#""plain""#).unwrap();
        assert_eq!(text.into_summary().unwrap(), ("plain".to_string(), None));
    }

    #[test]
    fn blank_or_missing_summary_is_an_error() {
        let blank: SummaryPayload =
            serde_json::from_str(r#"[{"summary_text":"   "}]"#).unwrap();
        assert!(matches!(blank.into_summary(), Err(RemoteError::Empty(_))));

        let empty: SummaryPayload = serde_json::from_str("[]").unwrap();
        assert!(matches!(empty.into_summary(), Err(RemoteError::Empty(_))));
    }

    #[test]
    fn unknown_summary_shape_fails_to_parse() {
        assert!(serde_json::from_str::<SummaryPayload>(r#"{"error":"loading"}"#).is_err());
    }

    #[test]
    fn embedding_shapes() {
        let flat: EmbeddingPayload = serde_json::from_str("[0.1, 0.2]").unwrap();
        assert_eq!(flat.into_single().unwrap(), vec![0.1, 0.2]);

        let nested: EmbeddingPayload = serde_json::from_str("[[1.0, 0.0]]").unwrap();
        assert_eq!(nested.into_single().unwrap(), vec![1.0, 0.0]);

        let batch: EmbeddingPayload = serde_json::from_str("[[1.0], [2.0]]").unwrap();
        assert_eq!(batch.into_batch(2).unwrap(), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn embedding_count_mismatch_is_malformed() {
        let batch: EmbeddingPayload = serde_json::from_str("[[1.0], [2.0]]").unwrap();
        assert!(matches!(batch.into_batch(3), Err(RemoteError::Malformed(_))));

        let empty: EmbeddingPayload = serde_json::from_str("[]").unwrap();
        assert!(matches!(empty.into_single(), Err(RemoteError::Empty(_))));
    }
}
