use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::llm::LlmError;

// Ollama /api/generate request format
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub options: GenerateOptions,
}

impl GenerateRequest {
    pub fn new(model: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            stream: false,
            options: GenerateOptions::default(),
        }
    }
}

// Sampling settings sent with every prompt
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub num_predict: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            num_predict: 2048,
        }
    }
}

// Ollama /api/generate response format
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerateResponse {
    pub model: String,
    pub response: String,
}

// Generation job - prompt + channel the worker answers on
pub struct GuideJob {
    pub request: GenerateRequest,
    pub response_tx: oneshot::Sender<Result<GenerateResponse, LlmError>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

// POST /api/explore
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExploreRequest {
    pub query: String,
    #[serde(default)]
    pub experience: String,
    pub date_range: DateRange,
}

// POST /api/packing/suggestions
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PackingRequest {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackingCategory {
    Clothing,
    Toiletries,
    Electronics,
    Documents,
    Medicine,
    Other,
}

// Models capitalize categories freely ("Clothing", "DOCUMENTS")
impl<'de> Deserialize<'de> for PackingCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "clothing" => Ok(Self::Clothing),
            "toiletries" => Ok(Self::Toiletries),
            "electronics" => Ok(Self::Electronics),
            "documents" => Ok(Self::Documents),
            "medicine" => Ok(Self::Medicine),
            "other" => Ok(Self::Other),
            _ => Err(de::Error::unknown_variant(
                &raw,
                &["clothing", "toiletries", "electronics", "documents", "medicine", "other"],
            )),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PackingItem {
    pub name: String,
    pub category: PackingCategory,
    #[serde(default = "default_quantity", deserialize_with = "quantity_or_default")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

// null and 0 both mean "one of it"
fn quantity_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let quantity = Option::<u32>::deserialize(deserializer)?;
    Ok(quantity.filter(|&q| q > 0).unwrap_or_else(default_quantity))
}

#[derive(Debug, Serialize, Clone)]
pub struct PackingSuggestions {
    pub items: Vec<PackingItem>,
}
