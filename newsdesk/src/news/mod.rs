//! News acquisition and section assignment.
//!
//! Items flow search → title rewrite → merge with provenance → dedupe → section slots.
//! Every stage has a cheaper fallback so a newsletter can always be assembled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod dedupe;
pub mod fallback;
pub mod related;
pub mod rewrite;
pub mod search;
pub mod sections;
pub mod service;
pub mod strategy;

/// Tag carried by every item next to its category
pub const MARKETING_TAG: &str = "digital-marketing";

/// URL some models emit when they have no real link
pub const PLACEHOLDER_URL: &str = "https://...";

/// True when `url` starts with an explicit `http://` or `https://` scheme
pub fn has_http_scheme(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub const DEFAULT_PUBLISHER: &str = "Industry Source";

/// Topic category of a news item. Declaration order is the canonical concatenation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Seo,
    Ppc,
    SocialMedia,
    Website,
    Related,
}

impl Category {
    /// Categories searched when assembling a full newsletter
    pub const SEARCHABLE: [Category; 4] = [
        Category::Seo,
        Category::Ppc,
        Category::SocialMedia,
        Category::Website,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Seo => "seo",
            Category::Ppc => "ppc",
            Category::SocialMedia => "social_media",
            Category::Website => "website",
            Category::Related => "related",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "seo" => Ok(Category::Seo),
            "ppc" => Ok(Category::Ppc),
            "social_media" | "social" => Ok(Category::SocialMedia),
            "website" => Ok(Category::Website),
            "related" => Ok(Category::Related),
            other => anyhow::bail!("unknown news category: {}", other),
        }
    }
}

/// Unit moved through the whole pipeline.
///
/// Only `title` may differ from what the search model returned; everything else is
/// provenance copied verbatim at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub category: Category,
    pub title: String,
    pub publisher: String,
    pub published_date: String,
    /// Empty only for fallback-generated (unsourced) items
    pub url: String,
    pub summary: String,
    pub why_it_matters: String,
    pub tags: Vec<String>,
}

impl NewsItem {
    pub fn new(category: Category, title: String, provenance: Provenance) -> Self {
        Self {
            category,
            title,
            publisher: provenance.publisher,
            published_date: provenance.published_date,
            url: provenance.url,
            summary: provenance.summary,
            why_it_matters: provenance.why_it_matters,
            tags: vec![category.to_string(), MARKETING_TAG.to_string()],
        }
    }

    /// True when the item carries a source link (i.e. did not come from fallback generation)
    pub fn is_sourced(&self) -> bool {
        !self.url.is_empty()
    }
}

/// Ground-truth fields of a search result, never handed to a rewrite step
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub url: String,
    pub publisher: String,
    pub published_date: String,
    pub summary: String,
    pub why_it_matters: String,
}

impl Provenance {
    pub fn from_raw(raw: &RawArticle) -> Self {
        Self {
            url: raw.url.as_deref().unwrap_or_default().trim().to_string(),
            publisher: raw
                .publisher
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PUBLISHER.to_string()),
            published_date: raw
                .published_date
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(crate::llm::prompt::today_iso),
            summary: raw.summary.clone().unwrap_or_default(),
            why_it_matters: raw.why_it_matters.clone().unwrap_or_default(),
        }
    }
}

/// One record of a model's `news` array, every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub catchy_title: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub why_it_matters: Option<String>,
}

/// `{"news": [...]}` envelope returned by search and generation prompts
#[derive(Debug, Deserialize)]
pub struct NewsEnvelope {
    pub news: Vec<RawArticle>,
}

/// Fixed newsletter slot. Declaration order is the order sections claim indices in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKey {
    MainStory,
    MainStorySummary,
    SecondStory,
    ThirdStory,
    Trendsetter,
    TopNews,
    Links,
}

impl SectionKey {
    pub const ALL: [SectionKey; 7] = [
        SectionKey::MainStory,
        SectionKey::MainStorySummary,
        SectionKey::SecondStory,
        SectionKey::ThirdStory,
        SectionKey::Trendsetter,
        SectionKey::TopNews,
        SectionKey::Links,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::MainStory => "main-story",
            SectionKey::MainStorySummary => "main-story-summary",
            SectionKey::SecondStory => "second-story",
            SectionKey::ThirdStory => "third-story",
            SectionKey::Trendsetter => "trendsetter",
            SectionKey::TopNews => "top-news",
            SectionKey::Links => "links",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key.trim())
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Section key → indices into the flattened item list
pub type SectionIndices = BTreeMap<SectionKey, Vec<usize>>;

/// Section key → items. Always carries all seven keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SectionAssignments(BTreeMap<SectionKey, Vec<NewsItem>>);

impl SectionAssignments {
    pub fn empty() -> Self {
        Self(SectionKey::ALL.into_iter().map(|k| (k, Vec::new())).collect())
    }

    /// Resolve indices against the flattened list; out-of-range indices are skipped.
    pub fn from_indices(indices: &SectionIndices, items: &[NewsItem]) -> Self {
        let mut out = Self::empty();
        for (key, idxs) in indices {
            let slot = out.0.entry(*key).or_default();
            slot.extend(idxs.iter().filter_map(|&i| items.get(i).cloned()));
        }
        out
    }

    pub fn get(&self, key: SectionKey) -> &[NewsItem] {
        self.0.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn total_items(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SectionKey, &Vec<NewsItem>)> {
        self.0.iter()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn item(category: Category, title: &str) -> NewsItem {
        NewsItem::new(
            category,
            title.to_string(),
            Provenance {
                url: format!("https://example.com/{}", title.len()),
                publisher: "Search Engine Journal".to_string(),
                published_date: "2026-01-12".to_string(),
                summary: format!("Summary of {}", title),
                why_it_matters: "It matters".to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for cat in Category::SEARCHABLE {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
        assert_eq!("Social-Media".parse::<Category>().unwrap(), Category::SocialMedia);
        assert!("email".parse::<Category>().is_err());
    }

    #[test]
    fn new_item_carries_category_and_marketing_tags() {
        let item = test_support::item(Category::Ppc, "Bids");
        assert_eq!(item.tags, vec!["ppc".to_string(), MARKETING_TAG.to_string()]);
        assert!(item.is_sourced());
    }

    #[test]
    fn provenance_defaults_missing_fields() {
        let raw = RawArticle {
            title: Some("t".into()),
            url: Some("  https://a.com/x ".into()),
            ..Default::default()
        };
        let prov = Provenance::from_raw(&raw);
        assert_eq!(prov.url, "https://a.com/x");
        assert_eq!(prov.publisher, DEFAULT_PUBLISHER);
        assert_eq!(prov.published_date.len(), 10);
    }

    #[test]
    fn section_assignments_serialize_with_kebab_keys() {
        let json = serde_json::to_value(SectionAssignments::empty()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 7);
        assert!(obj.contains_key("main-story-summary"));
        assert!(obj.contains_key("top-news"));
    }

    #[test]
    fn http_scheme_must_be_explicit() {
        assert!(has_http_scheme("https://a.com"));
        assert!(has_http_scheme("HTTP://a.com"));
        assert!(!has_http_scheme("httpbin.org/x"));
        assert!(!has_http_scheme("https:/a.com"));
        assert!(!has_http_scheme("ftp://a.com"));
        assert!(!has_http_scheme(""));
    }

    #[test]
    fn section_key_parse() {
        assert_eq!(SectionKey::parse("third-story"), Some(SectionKey::ThirdStory));
        assert_eq!(SectionKey::parse("tomorrow-top"), None);
    }
}
