use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use super::strategy::LastResort;
use super::search::SearchQuery;
use super::{Category, NewsEnvelope, NewsItem, Provenance};
use crate::llm::prompt::{current_month_label, current_year, date_context};
use crate::llm::{parse_json_reply, LlmProvider, LlmRequest};

/// Produces plausible, unsourced items on the content model when search yields nothing usable.
///
/// Every item it returns has an empty `url`: any link the model invents is discarded.
pub struct FallbackGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl FallbackGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Never fails; a transport or parse error yields an empty list.
    pub async fn generate(&self, category: Category, count: usize) -> Vec<NewsItem> {
        match self.try_generate(category, count).await {
            Ok(items) => {
                info!(%category, count = items.len(), "generated fallback news items (no real URLs)");
                items
            }
            Err(e) => {
                warn!(%category, error = %e, "fallback news generation failed");
                Vec::new()
            }
        }
    }

    async fn try_generate(&self, category: Category, count: usize) -> Result<Vec<NewsItem>> {
        let year = current_year();
        let month = current_month_label();
        let topic = category.as_str().to_uppercase();

        let system = format!(
            r#"{date}

You are a digital marketing news researcher and copywriter.

Generate {count} plausible, recent digital marketing news stories about {topic} from {month}.

IMPORTANT: We are in {year}. All content must be dated {year}, not earlier years.

For each story provide:
1. catchy_title: Dramatic hook title (use power words, reference {year} if mentioning a year)
2. publisher: Real publisher name (Search Engine Journal, Social Media Today, etc.)
3. published_date: YYYY-MM-DD format ({month})
4. url: Leave EMPTY ("") - never invent fake URLs
5. summary: 2-3 sentence summary
6. why_it_matters: 1-2 sentences on business impact

Return JSON: {{"news": [...]}}"#,
            date = date_context(),
        );
        let prompt = format!(
            "Generate {} plausible {} digital marketing news stories from {}.",
            count, topic, month
        );

        let response = self
            .llm
            .generate(LlmRequest::chat(system, prompt))
            .await
            .context("fallback generation request failed")?;
        let envelope: NewsEnvelope = parse_json_reply(&response.content)?;

        Ok(items_from_generated(category, envelope, count))
    }
}

/// Build unsourced items from a generation reply, bounded to `count`.
pub fn items_from_generated(category: Category, envelope: NewsEnvelope, count: usize) -> Vec<NewsItem> {
    envelope
        .news
        .into_iter()
        .take(count)
        .filter_map(|raw| {
            let title = raw
                .catchy_title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .or_else(|| raw.title.clone())
                .unwrap_or_default()
                .trim()
                .to_string();
            if title.is_empty() {
                return None;
            }

            let mut provenance = Provenance::from_raw(&raw);
            if !provenance.url.is_empty() {
                warn!(url = %provenance.url, "discarding URL from generated item");
                provenance.url.clear();
            }
            Some(NewsItem::new(category, title, provenance))
        })
        .collect()
}

#[async_trait::async_trait]
impl LastResort<SearchQuery, Vec<NewsItem>> for FallbackGenerator {
    fn name(&self) -> &'static str {
        "generated-news"
    }

    async fn produce(&self, query: &SearchQuery) -> Vec<NewsItem> {
        self.generate(query.category, query.count).await
    }
}
