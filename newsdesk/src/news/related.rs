use anyhow::{Context, Result};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::dedupe::dedupe;
use super::search::CategorySearcher;
use super::{has_http_scheme, Category, NewsEnvelope, NewsItem, Provenance, PLACEHOLDER_URL};
use crate::llm::prompt::{current_year, date_context};
use crate::llm::{parse_json_reply, preview, LlmProvider, LlmRequest};

/// Marker a section description carries when the editor wants stories related to a topic
pub const RELATED_MARKER: &str = "Find news related to:";

static RELATED_TOPIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Find news related to: "([^"]+)""#).expect("valid related-topic regex"));

/// Topic requested by a section description, if it carries the related-news directive.
///
/// A marker without a quoted topic makes the whole description the topic.
pub fn extract_related_topic(description: &str) -> Option<String> {
    if !description.contains(RELATED_MARKER) {
        return None;
    }
    let topic = RELATED_TOPIC
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| description.to_string());
    Some(topic)
}

/// Section-level search: related-topic lookup when asked for, otherwise a mix of categories.
pub struct RelatedSearcher {
    search_llm: Arc<dyn LlmProvider>,
    categories: Arc<CategorySearcher>,
}

impl RelatedSearcher {
    pub fn new(search_llm: Arc<dyn LlmProvider>, categories: Arc<CategorySearcher>) -> Self {
        Self {
            search_llm,
            categories,
        }
    }

    pub async fn search_related(
        &self,
        section_title: &str,
        section_description: &str,
        count: usize,
    ) -> Vec<NewsItem> {
        if let Some(topic) = extract_related_topic(section_description) {
            debug!(topic = %preview(&topic, 80), "searching related news");
            match self.search_topic(&topic, count).await {
                Ok(items) if !items.is_empty() => {
                    info!(count = items.len(), topic = %preview(&topic, 50), "found related news items");
                    return items;
                }
                Ok(_) => warn!("no valid items from related search, falling back to categories"),
                Err(e) => warn!(error = %e, "related news search failed, falling back to categories"),
            }
        }

        debug!(section = %section_title, "using category-based search for section");
        self.mixed_categories(count).await
    }

    async fn search_topic(&self, topic: &str, count: usize) -> Result<Vec<NewsItem>> {
        let year = current_year();
        let system = format!(
            r#"{date}

You are a digital marketing news researcher with real-time web access.

Search the web and find {count} REAL, recent news articles RELATED to this topic:
"{topic}"

Find news that:
- Covers similar themes or subjects
- Is from the same industry/niche
- Provides additional context or different perspectives
- Is recent (last 7 days preferred, from {year})

IMPORTANT: We are in {year}. All dates should be from {year}.

For each article provide:
1. title: The actual headline from the source
2. publisher: The actual publisher name
3. published_date: YYYY-MM-DD format (should be {year})
4. url: The ACTUAL, REAL URL (REQUIRED)
5. summary: 2-3 sentence summary
6. why_it_matters: Why this is relevant

Return ONLY valid JSON: {{"news": [...]}}"#,
            date = date_context(),
        );
        let prompt = format!(
            "Find {} news articles from {} related to: {}",
            count, year, topic
        );

        let response = self
            .search_llm
            .generate(LlmRequest::chat(system, prompt))
            .await
            .context("related news request failed")?;
        let envelope: NewsEnvelope = parse_json_reply(&response.content)?;

        Ok(related_items(envelope, count))
    }

    /// One fair share per searchable category, concatenated in category order, deduped.
    async fn mixed_categories(&self, count: usize) -> Vec<NewsItem> {
        let per_category = (count / Category::SEARCHABLE.len()).max(1);
        let fetches = Category::SEARCHABLE
            .iter()
            .map(|&category| self.categories.search(category, per_category));
        let items: Vec<NewsItem> = join_all(fetches).await.into_iter().flatten().collect();

        let mut unique = dedupe(items);
        unique.truncate(count);
        unique
    }
}

/// Items from a related search: sourced only, tagged `related`, bounded to `count`.
pub fn related_items(envelope: NewsEnvelope, count: usize) -> Vec<NewsItem> {
    envelope
        .news
        .into_iter()
        .take(count)
        .filter_map(|raw| {
            let provenance = Provenance::from_raw(&raw);
            let url = provenance.url.as_str();
            if url.is_empty() || url == PLACEHOLDER_URL || !has_http_scheme(url) {
                debug!(url, "skipping related item without a valid URL");
                return None;
            }
            let title = raw.title.unwrap_or_default().trim().to_string();
            if title.is_empty() {
                return None;
            }
            Some(NewsItem::new(Category::Related, title, provenance))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quoted_topic() {
        let desc = r#"Find news related to: "Google drops FAQ rich results". Keep it short."#;
        assert_eq!(
            extract_related_topic(desc).as_deref(),
            Some("Google drops FAQ rich results")
        );
    }

    #[test]
    fn marker_without_quotes_uses_whole_description() {
        let desc = "Find news related to: AI Overviews";
        assert_eq!(extract_related_topic(desc).as_deref(), Some(desc));
    }

    #[test]
    fn no_marker_no_topic() {
        assert!(extract_related_topic("Top industry headlines this week").is_none());
        assert!(extract_related_topic("").is_none());
    }

    #[test]
    fn related_items_apply_url_gate_without_scheme_repair() {
        let envelope: NewsEnvelope = parse_json_reply(
            r#"{"news": [
                {"title": "A", "url": "https://a.com/a", "publisher": "Adweek"},
                {"title": "B", "url": "b.com/no-scheme"},
                {"title": "H", "url": "httpbin.org/anything"},
                {"title": "C", "url": "https://..."},
                {"title": "", "url": "https://c.com"},
                {"title": "D"}
            ]}"#,
        )
        .unwrap();

        let items = related_items(envelope, 10);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A");
        assert_eq!(items[0].category, Category::Related);
        assert_eq!(items[0].tags, vec!["related", "digital-marketing"]);
    }

    #[test]
    fn related_items_bounded_before_filtering() {
        let envelope: NewsEnvelope = parse_json_reply(
            r#"{"news": [
                {"title": "A", "url": ""},
                {"title": "B", "url": "https://b.com"},
                {"title": "C", "url": "https://c.com"}
            ]}"#,
        )
        .unwrap();
        let items = related_items(envelope, 2);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "B");
    }
}
