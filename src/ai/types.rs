//! Core AI type definitions.
//!
//! Defines [`AiProvider`] and [`AiConfig`] (the user's persisted provider
//! choice), [`AiResponse`] (the discriminated result every backend returns),
//! and the payloads of the three operations.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Which backend the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    /// Local heuristics only.
    #[default]
    None,
    /// Hosted inference API. Older records stored this as `"huggingface"`.
    #[serde(alias = "huggingface")]
    Remote,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Remote => "remote",
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "remote" | "huggingface" => Ok(Self::Remote),
            _ => Err(format!("unknown AI provider: {s}")),
        }
    }
}

/// Persisted AI settings, entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub provider: AiProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl AiConfig {
    pub fn remote(api_key: impl Into<String>) -> Self {
        Self {
            provider: AiProvider::Remote,
            api_key: Some(api_key.into()),
        }
    }

    /// The API key, if one is set and not blank.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Result of a backend operation. Expected failures are values, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AiResponse<T> {
    Success(T),
    Failure(String),
}

impl<T> AiResponse<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure(error.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(error) => Err(error),
        }
    }
}

// `{success: true, data}` / `{success: false, error}`
impl<T: Serialize> Serialize for AiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AiResponse", 2)?;
        match self {
            Self::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            Self::Failure(error) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagGeneration {
    pub tags: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryGeneration {
    pub summary: String,
    pub confidence: f64,
}

/// A ranked candidate. `id` is the candidate's index in the caller's list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarItem {
    pub id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilaritySearch {
    pub similar_items: Vec<SimilarItem>,
}
