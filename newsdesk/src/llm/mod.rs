use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Core trait for chat-completion providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Request structure for LLM generation
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    /// Optional system message sent ahead of the user prompt
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

impl LlmRequest {
    pub fn chat(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub mod prompt;
pub mod remote;

/// Helper to extract JSON from text that might contain markdown fences or preamble.
///
/// Fenced content is preferred; the first balanced `{...}` span is then taken so that
/// trailing prose after the object is ignored.
pub fn extract_json_from_text(text: &str) -> Option<String> {
    let body = strip_code_fence(text.trim());
    first_balanced_object(body).map(str::to_string)
}

/// Extract and deserialize the JSON object embedded in a model reply.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T> {
    let json = extract_json_from_text(text).context("no JSON object found in model reply")?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse model reply as JSON: {}", preview(&json, 200)))
}

fn strip_code_fence(text: &str) -> &str {
    let mut body = text;
    if let Some(rest) = body.strip_prefix("```") {
        // skip the info string ("json", "JSON", ...) up to the end of the fence line
        body = match rest.find('\n') {
            Some(nl) if !rest[..nl].contains('{') => &rest[nl + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Char-boundary safe prefix used in log lines and digests.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
