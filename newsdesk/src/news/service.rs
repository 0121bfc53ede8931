use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::related::RelatedSearcher;
use super::search::CategorySearcher;
use super::sections::SectionAssigner;
use super::{Category, NewsItem, SectionAssignments};
use crate::llm::LlmProvider;

pub const DEFAULT_ITEMS_PER_CATEGORY: usize = 4;

/// Entry point of the news pipeline; one instance serves every request.
///
/// Holds no per-request state: each call builds its own lists and maps.
pub struct NewsService {
    searcher: Arc<CategorySearcher>,
    assigner: SectionAssigner,
    related: RelatedSearcher,
    items_per_category: usize,
}

impl NewsService {
    /// `search_llm` must be web-search capable; `content_llm` handles rewriting and ranking.
    pub fn new(search_llm: Arc<dyn LlmProvider>, content_llm: Arc<dyn LlmProvider>) -> Self {
        let searcher = Arc::new(CategorySearcher::new(search_llm.clone(), content_llm.clone()));
        Self {
            related: RelatedSearcher::new(search_llm, searcher.clone()),
            assigner: SectionAssigner::new(content_llm),
            searcher,
            items_per_category: DEFAULT_ITEMS_PER_CATEGORY,
        }
    }

    pub fn with_items_per_category(mut self, count: usize) -> Self {
        self.items_per_category = count.max(1);
        self
    }

    pub async fn category_news(&self, category: Category, count: usize) -> Vec<NewsItem> {
        self.searcher.search(category, count).await
    }

    /// Fetch every searchable category concurrently; keyed by category, not completion order.
    pub async fn fetch_all_categories(&self) -> BTreeMap<Category, Vec<NewsItem>> {
        let count = self.items_per_category;
        let fetches = Category::SEARCHABLE.iter().map(|&category| async move {
            (category, self.searcher.search(category, count).await)
        });
        join_all(fetches).await.into_iter().collect()
    }

    /// Fetch, rank and slot news into the newsletter sections.
    pub async fn generate_recommendations(&self) -> SectionAssignments {
        let all_news = self.fetch_all_categories().await;
        let fetched: usize = all_news.values().map(Vec::len).sum();
        info!(fetched, "assigning news to newsletter sections");
        self.assigner.assign(all_news).await
    }

    pub async fn search_section(
        &self,
        section_title: &str,
        section_description: &str,
        count: usize,
    ) -> Vec<NewsItem> {
        self.related
            .search_related(section_title, section_description, count)
            .await
    }
}
