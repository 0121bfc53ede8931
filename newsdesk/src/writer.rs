// Newsletter copywriting on the content model
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::llm::prompt::{current_year, date_context};
use crate::llm::{parse_json_reply, LlmProvider, LlmRequest};

const PLAIN_STYLE: &str = "Write clearly and simply. Use active voice. Avoid corporate buzzwords, \
em dashes, and phrases like \"delve into\" or \"furthermore.\" Every sentence should add value, not filler.";

/// Business impact analysis for one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsImpact {
    pub why_it_matters: String,
    pub action_items: Vec<String>,
}

impl NewsImpact {
    fn unavailable() -> Self {
        Self {
            why_it_matters: "Unable to generate impact analysis.".to_string(),
            action_items: vec!["Please try again.".to_string()],
        }
    }
}

pub struct ContentWriter {
    llm: Arc<dyn LlmProvider>,
}

impl ContentWriter {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    async fn complete(&self, system: String, prompt: String) -> Result<String> {
        let response = self
            .llm
            .generate(LlmRequest::chat(system, prompt))
            .await
            .context("content generation failed")?;
        Ok(response.content.trim().to_string())
    }

    /// Magnetic, hook-style headline (under 10 words), without surrounding quotes.
    pub async fn hook_title(&self, original_title: &str) -> Result<String> {
        let system = format!(
            "{}\n\nYou are an expert copywriter specializing in hook-style headlines for digital marketing newsletters. \
Transform headlines into magnetic, click-worthy titles using power words, drama, intrigue, numbers, or questions. \
Keep under 10 words. Use current year ({}) if mentioning dates.\n\nReturn ONLY the new headline, nothing else.",
            date_context(),
            current_year()
        );
        let prompt = format!(
            "Rewrite this headline to be more catchy and attention-grabbing:\n\n{}",
            original_title
        );
        let title = self.complete(system, prompt).await?;
        Ok(title.trim_matches('"').to_string())
    }

    /// One or two sentence hook for the newsletter intro.
    pub async fn description(&self, title: &str) -> Result<String> {
        let system = format!(
            "{}\n\nYou are a digital marketing newsletter writer. Create a compelling 1-2 sentence description that hooks the reader.\n{}\n\
GUIDELINES:\n- Be intriguing and create curiosity\n- Reference the main topic\n- Use active voice\n- Keep it under 20 words",
            date_context(),
            PLAIN_STYLE
        );
        let prompt = format!(
            "Write a compelling description for a newsletter with this main story:\n\n{}",
            title
        );
        self.complete(system, prompt).await
    }

    /// 100-130 word summary; a short existing summary (10 chars or less) is ignored as context.
    pub async fn summary(&self, title: &str, existing_summary: Option<&str>) -> Result<String> {
        let mut context = format!("Title: {}", title);
        if let Some(existing) = existing_summary.filter(|s| s.trim().len() > 10) {
            context.push_str(&format!("\n\nOriginal Content/Context: {}", existing));
        }

        let year = current_year();
        let system = format!(
            r#"{date}

You are a senior digital marketing journalist. Write a comprehensive, detailed summary.
{style}
REQUIREMENTS:
- Write 100-130 words
- Expand on the news with relevant context and analysis
- Explain the business impact for digital marketers
- Include specific insights, data points, or examples where relevant
- Format with 2-3 short paragraphs for readability
- Use **bold** for key terms

IMPORTANT: We are in {year}. Do NOT reference past years as current.
If the content is brief, expand it with relevant industry context and implications."#,
            date = date_context(),
            style = PLAIN_STYLE,
        );
        self.complete(system, format!("Write a detailed summary based on this news:\n\n{}", context))
            .await
    }

    /// 400-500 word story for the second and third story sections.
    pub async fn full_story(&self, title: &str, summary: &str) -> Result<String> {
        let year = current_year();
        let system = format!(
            r#"{date}

You are a senior digital marketing journalist writing for a B2B newsletter.
{style}
Write a compelling 400-500 word article that:
- Opens with a strong hook
- Explains the news and its context
- Discusses the business implications
- Provides actionable insights for marketers
- Ends with a forward-looking statement

IMPORTANT: We are in {year}. Do NOT reference past years as current.
FORMAT: Use short paragraphs (2-3 sentences each) for readability."#,
            date = date_context(),
            style = PLAIN_STYLE,
        );
        let prompt = format!(
            "Write a 400-500 word article about:\n\nTitle: {}\nContext: {}",
            title,
            context_or_placeholder(summary)
        );
        self.complete(system, prompt).await
    }

    /// 250-350 word feature article placed after the trendsetter section.
    pub async fn main_article(&self, title: &str, summary: &str) -> Result<String> {
        let year = current_year();
        let system = format!(
            r#"{date}

You are a senior digital marketing thought leader writing the main feature article for a B2B newsletter.
{style}
Write a polished, newsletter-ready 250-350 word article.

STRUCTURE:
1. OPENING (2-3 sentences): Hook the reader with the topic's significance
2. ANALYSIS (2 paragraphs): Insights and industry context for {year}. Use **bold** for 2-3 key terms only
3. ACTIONABLE TAKEAWAYS: An Actionable Takeaways heading (###) with 2-3 bullet points starting with action verbs
4. CLOSING (1-2 sentences): A forward-looking statement

Use ### only once and bullet points only for the takeaways."#,
            date = date_context(),
            style = PLAIN_STYLE,
        );
        let prompt = format!(
            "Write a polished 250-350 word newsletter feature article about:\n\nTitle: {}\nContext: {}",
            title,
            context_or_placeholder(summary)
        );
        self.complete(system, prompt).await
    }

    /// Punchy one-liner (15 words max) for trendsetter and top-news entries.
    pub async fn one_liner(&self, title: &str) -> Result<String> {
        let system = format!(
            "{}\n\nYou are a digital marketing editor. Write a punchy one-liner (max 15 words) that captures the essence of this news.\n\n\
STYLE: Concise, impactful, informative. No fluff.",
            date_context()
        );
        self.complete(system, format!("Write a one-liner for:\n\n{}", title))
            .await
    }

    /// Impact analysis; any model or parse failure yields the placeholder analysis.
    pub async fn news_impact(
        &self,
        title: &str,
        description: &str,
        source: &str,
        category: &str,
    ) -> NewsImpact {
        let system = format!(
            "{}\n\nYou are a digital marketing expert. Analyze news impact for business owners.\n{}\n\
Provide:\n1. whyItMatters: 1-2 sentence explanation of business impact\n2. actionItems: Array of 1-2 specific actions\n\n\
Respond in valid JSON with keys whyItMatters and actionItems. Keep under 80 words total.",
            date_context(),
            PLAIN_STYLE
        );
        let prompt = format!(
            "News Article:\nTitle: {}\nDescription: {}\nSource: {}\nCategory: {}\n\nAnalyze the business impact:",
            title, description, source, category
        );

        let result = async {
            let reply = self.complete(system, prompt).await?;
            parse_json_reply::<NewsImpact>(&reply)
        }
        .await;

        match result {
            Ok(impact) => {
                info!("impact analysis generated: {} action items", impact.action_items.len());
                impact
            }
            Err(e) => {
                warn!("impact analysis failed: {}, returning placeholder", e);
                NewsImpact::unavailable()
            }
        }
    }
}

fn context_or_placeholder(summary: &str) -> &str {
    if summary.trim().is_empty() {
        "No additional context"
    } else {
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_reply_uses_camel_case_keys() {
        let impact: NewsImpact = parse_json_reply(
            r#"{"whyItMatters": "CPCs rise", "actionItems": ["Audit bids", "Test broad match"]}"#,
        )
        .unwrap();
        assert_eq!(impact.why_it_matters, "CPCs rise");
        assert_eq!(impact.action_items.len(), 2);
    }

    #[test]
    fn placeholder_impact() {
        let impact = NewsImpact::unavailable();
        assert_eq!(impact.why_it_matters, "Unable to generate impact analysis.");
        assert_eq!(impact.action_items, vec!["Please try again.".to_string()]);
    }

    #[test]
    fn empty_context_gets_placeholder() {
        assert_eq!(context_or_placeholder("  "), "No additional context");
        assert_eq!(context_or_placeholder("Real context"), "Real context");
    }
}
