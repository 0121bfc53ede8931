use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::llm::{parse_json_reply, LlmProvider, LlmRequest};

/// Headline length the copywriter is asked to stay under
pub const MAX_CATCHY_TITLE_CHARS: usize = 80;

/// The only view of a news item the rewriter ever gets: an opaque index and the headline.
///
/// Provenance fields (url, publisher, date, summary, impact) are not representable here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleProjection {
    pub index: usize,
    pub title: String,
}

/// Turns plain headlines into punchy newsletter titles on the content model.
pub struct TitleRewriter {
    llm: Arc<dyn LlmProvider>,
}

impl TitleRewriter {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Returns index → catchy title. Indices the model skipped are simply absent.
    pub async fn rewrite(&self, titles: &[TitleProjection]) -> Result<HashMap<usize, String>> {
        if titles.is_empty() {
            return Ok(HashMap::new());
        }

        let system = format!(
            r#"You are a newsletter copywriter. Transform these news headlines into catchy, engaging titles.

For each title, create a dramatic hook using:
- Power words (Revolutionary, Game-Changing, Critical, Massive, etc.)
- Numbers when relevant
- Urgency and impact
- Keep it under {} characters

Return JSON with the same index and a catchy_title for each:
{{"titles": [{{"index": 0, "catchy_title": "Your Catchy Version Here"}}, ...]}}"#,
            MAX_CATCHY_TITLE_CHARS
        );
        let listing = serde_json::to_string_pretty(titles).context("failed to encode titles")?;
        let request = LlmRequest::chat(system, format!("Transform these headlines:\n\n{}", listing));

        let response = self
            .llm
            .generate(request)
            .await
            .context("title rewrite request failed")?;

        let rewritten = parse_catchy_titles(&response.content)?;
        debug!("rewrote {} of {} titles", rewritten.len(), titles.len());
        Ok(rewritten)
    }
}

#[derive(Debug, Deserialize)]
struct CatchyTitlesReply {
    titles: Vec<CatchyTitle>,
}

#[derive(Debug, Deserialize)]
struct CatchyTitle {
    #[serde(default)]
    index: Option<i64>,
    #[serde(default)]
    catchy_title: Option<String>,
}

/// Parse `{"titles": [...]}`; entries without a usable index or title are dropped.
pub fn parse_catchy_titles(text: &str) -> Result<HashMap<usize, String>> {
    let reply: CatchyTitlesReply = parse_json_reply(text)?;
    Ok(reply
        .titles
        .into_iter()
        .filter_map(|entry| {
            let index = usize::try_from(entry.index?).ok()?;
            let title = entry.catchy_title?.trim().to_string();
            (!title.is_empty()).then_some((index, title))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_index_aligned_titles() {
        let text = r#"```json
{"titles": [
  {"index": 0, "catchy_title": "Google Just Rewrote The Rules"},
  {"index": 2, "catchy_title": "  TikTok's Massive Shop Push  "}
]}
```"#;
        let map = parse_catchy_titles(text).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&0], "Google Just Rewrote The Rules");
        assert_eq!(map[&2], "TikTok's Massive Shop Push");
        assert!(!map.contains_key(&1));
    }

    #[test]
    fn drops_negative_missing_and_blank_entries() {
        let text = r#"{"titles": [
            {"index": -1, "catchy_title": "neg"},
            {"catchy_title": "no index"},
            {"index": 1, "catchy_title": "   "},
            {"index": 3}
        ]}"#;
        assert!(parse_catchy_titles(text).unwrap().is_empty());
    }

    #[test]
    fn malformed_reply_is_an_error() {
        assert!(parse_catchy_titles("I could not do that").is_err());
        assert!(parse_catchy_titles(r#"{"headlines": []}"#).is_err());
    }

    #[test]
    fn projection_serializes_only_index_and_title() {
        let json = serde_json::to_value(TitleProjection {
            index: 4,
            title: "Headline".into(),
        })
        .unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["index".to_string(), "title".to_string()]);
    }
}
