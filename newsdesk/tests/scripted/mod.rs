// Scripted LLM provider shared by the integration tests
#![allow(dead_code)]

use anyhow::Result;
use newsdesk::llm::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use std::sync::Mutex;

enum Reply {
    Text(String),
    Fail(String),
}

/// Answers by matching request text against rules, in order; the first needle found wins.
///
/// Concurrent callers (per-category fetches) get deterministic replies because matching
/// depends on the request, not on arrival order. Every request is recorded.
pub struct ScriptedProvider {
    rules: Vec<(String, Reply)>,
    seen: Mutex<Vec<LlmRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, needle: &str, text: impl Into<String>) -> Self {
        self.rules.push((needle.to_string(), Reply::Text(text.into())));
        self
    }

    pub fn fail(mut self, needle: &str, error: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Fail(error.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Requests whose system message or prompt contains `needle`
    pub fn requests_matching(&self, needle: &str) -> Vec<LlmRequest> {
        self.requests()
            .into_iter()
            .filter(|r| full_text(r).contains(needle))
            .collect()
    }
}

fn full_text(request: &LlmRequest) -> String {
    format!(
        "{}\n{}",
        request.system.as_deref().unwrap_or_default(),
        request.prompt
    )
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let text = full_text(&request);
        self.seen.lock().unwrap().push(request);

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, reply)| reply);

        match reply {
            Some(Reply::Text(content)) => Ok(LlmResponse {
                content: content.clone(),
                usage: UsageMetadata::default(),
                model: "scripted".to_string(),
            }),
            Some(Reply::Fail(error)) => Err(anyhow::anyhow!("{}", error)),
            None => Err(anyhow::anyhow!("no scripted reply for request")),
        }
    }
}

/// A search-model article as JSON
pub fn article(title: &str, url: &str, publisher: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "publisher": publisher,
        "published_date": "2026-01-12",
        "url": url,
        "summary": format!("Summary of {}", title),
        "why_it_matters": "Marketers need to adapt."
    })
}

pub fn news_reply(articles: Vec<serde_json::Value>) -> String {
    serde_json::json!({ "news": articles }).to_string()
}
