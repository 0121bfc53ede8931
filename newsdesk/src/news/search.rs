use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use super::fallback::FallbackGenerator;
use super::rewrite::{TitleProjection, TitleRewriter};
use super::strategy::{Strategy, StrategyChain};
use super::{has_http_scheme, Category, NewsEnvelope, NewsItem, Provenance, RawArticle, PLACEHOLDER_URL};
use crate::llm::prompt::{current_year, date_context};
use crate::llm::{parse_json_reply, LlmProvider, LlmRequest};

/// What to look for: `count` items in `category`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchQuery {
    pub category: Category,
    pub count: usize,
}

/// Per-category news search: real sourced results first, generated items otherwise.
pub struct CategorySearcher {
    chain: StrategyChain<SearchQuery, Vec<NewsItem>>,
}

impl CategorySearcher {
    pub fn new(search_llm: Arc<dyn LlmProvider>, content_llm: Arc<dyn LlmProvider>) -> Self {
        let chain = StrategyChain::new(FallbackGenerator::new(content_llm.clone())).with_strategy(
            WebSearch {
                search_llm,
                rewriter: TitleRewriter::new(content_llm),
            },
        );
        Self { chain }
    }

    /// Never fails: search problems fall through to generated items.
    pub async fn search(&self, category: Category, count: usize) -> Vec<NewsItem> {
        self.chain.run(&SearchQuery { category, count }).await
    }
}

/// Search-model lookup with headline rewriting on the content model.
struct WebSearch {
    search_llm: Arc<dyn LlmProvider>,
    rewriter: TitleRewriter,
}

#[async_trait::async_trait]
impl Strategy<SearchQuery, Vec<NewsItem>> for WebSearch {
    fn name(&self) -> &'static str {
        "web-search"
    }

    async fn attempt(&self, query: &SearchQuery) -> Result<Vec<NewsItem>> {
        let response = self
            .search_llm
            .generate(search_request(query))
            .await
            .context("news search request failed")?;
        let envelope: NewsEnvelope = parse_json_reply(&response.content)?;

        if envelope.news.is_empty() {
            anyhow::bail!("search returned no results for {}", query.category);
        }

        let (_, titles) = split_articles(&envelope.news);
        let catchy = match self.rewriter.rewrite(&titles).await {
            Ok(map) => map,
            Err(e) => {
                warn!(category = %query.category, error = %e, "title rewrite failed, keeping original titles");
                HashMap::new()
            }
        };

        let items = merge_with_provenance(query.category, &envelope.news, &catchy, query.count);
        info!(category = %query.category, count = items.len(), "fetched news items with preserved URLs");
        Ok(items)
    }
}

fn search_request(query: &SearchQuery) -> LlmRequest {
    let year = current_year();
    let topic = query.category.as_str().to_uppercase();
    let count = query.count;

    let system = format!(
        r#"{date}

You are a digital marketing news researcher with real-time web access.

Search the web and find {count} REAL, recent news articles about {topic} digital marketing from the last 7 days.

For each article you find, provide:
1. title: The actual headline from the source
2. publisher: The actual publisher name (e.g., Search Engine Journal, Social Media Today)
3. published_date: The actual publication date in YYYY-MM-DD format (should be {year})
4. url: The ACTUAL, REAL URL from the web (REQUIRED - must be a real clickable link)
5. summary: 4-5 sentence summary of what the article is about
6. why_it_matters: Why this news is important for digital marketers

CRITICAL RULES:
- You MUST provide real URLs from actual websites
- Do NOT make up or fabricate URLs
- Only include articles that have verifiable URLs
- Return ONLY valid JSON, no markdown or extra text
- All dates should be from {year}

Return ONLY this JSON format (no other text):
{{"news": [{{"title": "...", "publisher": "...", "published_date": "YYYY-MM-DD", "url": "https://...", "summary": "...", "why_it_matters": "..."}}]}}"#,
        date = date_context(),
    );
    let prompt = format!(
        "Search the web for {} recent {} digital marketing news articles from {}. Return ONLY JSON.",
        count, topic, year
    );
    LlmRequest::chat(system, prompt)
}

/// Split raw records into index-keyed provenance and the title-only projection for rewriting.
pub fn split_articles(raw: &[RawArticle]) -> (BTreeMap<usize, Provenance>, Vec<TitleProjection>) {
    raw.iter()
        .enumerate()
        .map(|(index, article)| {
            (
                (index, Provenance::from_raw(article)),
                TitleProjection {
                    index,
                    title: article.title.clone().unwrap_or_default(),
                },
            )
        })
        .unzip()
}

/// Normalize a provenance URL; `None` when it cannot be used as a source link.
pub fn validated_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() || url == PLACEHOLDER_URL {
        return None;
    }
    if has_http_scheme(url) {
        Some(url.to_string())
    } else {
        Some(format!("https://{}", url))
    }
}

/// Rebuild items from provenance plus (optionally) rewritten titles.
///
/// Only the first `count` records are considered. Records without a usable URL are dropped.
pub fn merge_with_provenance(
    category: Category,
    raw: &[RawArticle],
    catchy: &HashMap<usize, String>,
    count: usize,
) -> Vec<NewsItem> {
    let (provenance, _) = split_articles(raw);

    provenance
        .into_iter()
        .take(count)
        .filter_map(|(index, mut prov)| {
            let original = raw[index].title.clone().unwrap_or_default();
            let Some(url) = validated_url(&prov.url) else {
                warn!(index, title = %original, "no valid URL for article, skipping");
                return None;
            };
            prov.url = url;

            let title = catchy
                .get(&index)
                .filter(|t| !t.is_empty())
                .cloned()
                .unwrap_or(original);
            if title.trim().is_empty() {
                return None;
            }
            Some(NewsItem::new(category, title, prov))
        })
        .collect()
}
