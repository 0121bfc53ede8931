use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use super::strategy::{LastResort, Strategy, StrategyChain};
use super::{Category, NewsItem, SectionAssignments, SectionIndices, SectionKey};
use crate::llm::prompt::{current_year, date_context};
use crate::llm::{parse_json_reply, preview, LlmProvider, LlmRequest};

/// Distributes fetched items over the fixed newsletter sections.
pub struct SectionAssigner {
    chain: StrategyChain<[NewsItem], SectionIndices>,
}

impl SectionAssigner {
    pub fn new(content_llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            chain: StrategyChain::new(SliceDistribution).with_strategy(ModelRanking { llm: content_llm }),
        }
    }

    /// Always returns all seven sections; empty input skips the model entirely.
    pub async fn assign(&self, by_category: BTreeMap<Category, Vec<NewsItem>>) -> SectionAssignments {
        let items = flatten(by_category);
        if items.is_empty() {
            info!("no news items to assign, returning empty sections");
            return SectionAssignments::empty();
        }

        let indices = self.chain.run(&items).await;
        SectionAssignments::from_indices(&indices, &items)
    }
}

/// Concatenate in category order, keeping each category's own order.
pub fn flatten(by_category: BTreeMap<Category, Vec<NewsItem>>) -> Vec<NewsItem> {
    by_category.into_values().flatten().collect()
}

/// One line per item: `[i] title (category) - summary prefix...`
pub fn digest(items: &[NewsItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "[{}] {} ({}) - {}...",
                i,
                item.title,
                item.category,
                preview(&item.summary, 100)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask the content model to rank items into sections.
struct ModelRanking {
    llm: Arc<dyn LlmProvider>,
}

#[async_trait::async_trait]
impl Strategy<[NewsItem], SectionIndices> for ModelRanking {
    fn name(&self) -> &'static str {
        "model-ranking"
    }

    async fn attempt(&self, items: &[NewsItem]) -> Result<SectionIndices> {
        let year = current_year();
        let system = format!(
            r#"{date}

You are a newsletter editor for a digital marketing publication in {year}.

SECTIONS TO FILL:
1. main-story: THE biggest, most impactful story (1 item)
2. main-story-summary: Summary for the main story (1 item)
3. second-story: Strong supporting story (1 item)
4. third-story: Additional interesting story (1 item)
5. trendsetter: Forward-looking, emerging trend (1-2 items)
6. top-news: Top industry headlines (2-3 items)
7. links: Valuable resources/guides (2-3 items)

RULES:
- Each item can only be used ONCE
- Pick the MOST impactful story for main-story
- Ensure variety across categories
- Prioritize stories relevant to {year}

Return JSON: {{"assignments": {{"main-story": [0], "second-story": [1], ...}}, "reasoning": "..."}}"#,
            date = date_context(),
        );
        let prompt = format!(
            "Here are {} news stories to assign:\n\n{}",
            items.len(),
            digest(items)
        );

        let response = self
            .llm
            .generate(LlmRequest::chat(system, prompt))
            .await
            .context("section ranking request failed")?;

        let indices = parse_assignments(&response.content, items.len())?;
        let placed: usize = indices.values().map(Vec::len).sum();
        if placed == 0 {
            anyhow::bail!("ranking placed no items");
        }
        info!(placed, total = items.len(), "model ranked news into sections");
        Ok(indices)
    }
}

#[derive(Debug, Deserialize)]
struct AssignmentReply {
    assignments: HashMap<String, serde_json::Value>,
}

/// Parse `{"assignments": {...}}` into per-section indices.
///
/// Sections claim indices in canonical section order; an index already claimed, out of range,
/// or not a non-negative integer is skipped. Unknown section keys are ignored.
pub fn parse_assignments(text: &str, item_count: usize) -> Result<SectionIndices> {
    let reply: AssignmentReply = parse_json_reply(text)?;

    let by_key: HashMap<SectionKey, &serde_json::Value> = reply
        .assignments
        .iter()
        .filter_map(|(key, value)| match SectionKey::parse(key) {
            Some(section) => Some((section, value)),
            None => {
                warn!(section = %key, "ignoring unknown section in ranking reply");
                None
            }
        })
        .collect();

    let mut used = HashSet::new();
    let mut out = SectionIndices::new();
    for section in SectionKey::ALL {
        let candidates: Vec<&serde_json::Value> = match by_key.get(&section) {
            Some(serde_json::Value::Array(values)) => values.iter().collect(),
            Some(single) => vec![*single],
            None => Vec::new(),
        };

        let claimed = candidates
            .into_iter()
            .filter_map(serde_json::Value::as_u64)
            .filter_map(|idx| usize::try_from(idx).ok())
            .filter(|&idx| idx < item_count && used.insert(idx))
            .collect();
        out.insert(section, claimed);
    }
    Ok(out)
}

/// Deterministic contiguous slices; total for any length.
///
/// Item 0 fills both main-story and main-story-summary.
pub fn slice_distribution(item_count: usize) -> SectionIndices {
    let slice = |start: usize, end: usize| (start.min(item_count)..end.min(item_count)).collect::<Vec<_>>();
    SectionIndices::from([
        (SectionKey::MainStory, slice(0, 1)),
        (SectionKey::MainStorySummary, slice(0, 1)),
        (SectionKey::SecondStory, slice(1, 2)),
        (SectionKey::ThirdStory, slice(2, 3)),
        (SectionKey::Trendsetter, slice(3, 5)),
        (SectionKey::TopNews, slice(5, 8)),
        (SectionKey::Links, slice(8, 11)),
    ])
}

struct SliceDistribution;

#[async_trait::async_trait]
impl LastResort<[NewsItem], SectionIndices> for SliceDistribution {
    fn name(&self) -> &'static str {
        "slice-distribution"
    }

    async fn produce(&self, items: &[NewsItem]) -> SectionIndices {
        slice_distribution(items.len())
    }
}
