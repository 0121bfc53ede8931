use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Rocket, State};
use serde::{Deserialize, Serialize};

use common::Config;

use crate::campaign::{CampaignClient, CampaignError, CampaignStatus, PushRequest, Sender};
use crate::news::service::NewsService;
use crate::news::{Category, NewsItem, SectionAssignments};
use crate::writer::{ContentWriter, NewsImpact};

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub news: Arc<NewsService>,
    pub writer: Arc<ContentWriter>,
    /// `None` when ActiveCampaign credentials are missing; campaign routes then answer 500.
    pub campaigns: Option<Arc<CampaignClient>>,
}

impl AppState {
    pub fn new(
        news: Arc<NewsService>,
        writer: Arc<ContentWriter>,
        campaigns: Option<Arc<CampaignClient>>,
    ) -> Self {
        Self {
            started_at: Utc::now(),
            news,
            writer,
            campaigns,
        }
    }
}

/// Error body, `{"detail": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

type ApiError = Custom<Json<ErrorBody>>;

fn api_error(status: Status, detail: impl Into<String>) -> ApiError {
    Custom(
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: i64,
    campaigns_configured: bool,
}

#[derive(Serialize)]
struct NewsResponse {
    news: Vec<NewsItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionSearchRequest {
    section_title: String,
    #[serde(default)]
    section_description: String,
    #[serde(default = "default_section_items")]
    num_items: usize,
}

fn default_section_items() -> usize {
    3
}

#[derive(Deserialize)]
struct TitleRequest {
    title: String,
}

#[derive(Deserialize)]
struct SummaryRequest {
    title: String,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Deserialize)]
struct StoryRequest {
    title: String,
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct ImpactRequest {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    category: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedText {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    one_liner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    story: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    article: Option<String>,
}

impl GeneratedText {
    fn empty() -> Self {
        Self {
            title: None,
            summary: None,
            one_liner: None,
            description: None,
            story: None,
            article: None,
        }
    }
}

#[derive(Serialize)]
struct ListsResponse {
    lists: Vec<crate::campaign::SubscriberList>,
}

#[derive(Serialize)]
struct AddressesResponse {
    addresses: Vec<crate::campaign::MailingAddress>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushCampaignBody {
    list_id: String,
    campaign_name: String,
    subject: String,
    html_content: String,
    #[serde(default)]
    campaign_status: CampaignStatus,
    address_id: Option<String>,
    scheduled_date: Option<String>,
    sender_name: Option<String>,
    sender_email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PushCampaignResponse {
    success: bool,
    campaign_id: String,
    status: CampaignStatus,
    message: String,
}

#[get("/health")]
async fn health(state: &State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        campaigns_configured: state.campaigns.is_some(),
    })
}

/// Full pipeline: all categories, ranked into the seven newsletter sections.
#[get("/api/news/recommendations")]
async fn recommendations(state: &State<AppState>) -> Json<SectionAssignments> {
    Json(state.news.generate_recommendations().await)
}

#[get("/api/news/category/<category>?<count>")]
async fn category_news(
    state: &State<AppState>,
    category: &str,
    count: Option<usize>,
) -> Result<Json<NewsResponse>, ApiError> {
    let category = Category::from_str(category)
        .ok()
        .filter(|c| *c != Category::Related)
        .ok_or_else(|| api_error(Status::NotFound, format!("Unknown category: {}", category)))?;
    let news = state
        .news
        .category_news(category, count.unwrap_or(4).clamp(1, 20))
        .await;
    Ok(Json(NewsResponse { news }))
}

#[post("/api/news/search-section", data = "<body>")]
async fn search_section(
    state: &State<AppState>,
    body: Json<SectionSearchRequest>,
) -> Json<NewsResponse> {
    let news = state
        .news
        .search_section(
            &body.section_title,
            &body.section_description,
            body.num_items.clamp(1, 20),
        )
        .await;
    Json(NewsResponse { news })
}

fn generation_failed(e: anyhow::Error) -> ApiError {
    tracing::error!("content generation failed: {:#}", e);
    api_error(Status::InternalServerError, format!("Generation failed: {}", e))
}

#[post("/api/ai/hook-title", data = "<body>")]
async fn hook_title(
    state: &State<AppState>,
    body: Json<TitleRequest>,
) -> Result<Json<GeneratedText>, ApiError> {
    let title = state.writer.hook_title(&body.title).await.map_err(generation_failed)?;
    Ok(Json(GeneratedText {
        title: Some(title),
        ..GeneratedText::empty()
    }))
}

#[post("/api/ai/summary", data = "<body>")]
async fn summary(
    state: &State<AppState>,
    body: Json<SummaryRequest>,
) -> Result<Json<GeneratedText>, ApiError> {
    let summary = state
        .writer
        .summary(&body.title, body.summary.as_deref())
        .await
        .map_err(generation_failed)?;
    Ok(Json(GeneratedText {
        summary: Some(summary),
        ..GeneratedText::empty()
    }))
}

#[post("/api/ai/one-liner", data = "<body>")]
async fn one_liner(
    state: &State<AppState>,
    body: Json<TitleRequest>,
) -> Result<Json<GeneratedText>, ApiError> {
    let line = state.writer.one_liner(&body.title).await.map_err(generation_failed)?;
    Ok(Json(GeneratedText {
        one_liner: Some(line),
        ..GeneratedText::empty()
    }))
}

#[post("/api/ai/description", data = "<body>")]
async fn description(
    state: &State<AppState>,
    body: Json<TitleRequest>,
) -> Result<Json<GeneratedText>, ApiError> {
    let description = state.writer.description(&body.title).await.map_err(generation_failed)?;
    Ok(Json(GeneratedText {
        description: Some(description),
        ..GeneratedText::empty()
    }))
}

/// Long-form story for the second and third story slots
#[post("/api/ai/full-story", data = "<body>")]
async fn full_story(
    state: &State<AppState>,
    body: Json<StoryRequest>,
) -> Result<Json<GeneratedText>, ApiError> {
    let story = state
        .writer
        .full_story(&body.title, &body.summary)
        .await
        .map_err(generation_failed)?;
    Ok(Json(GeneratedText {
        story: Some(story),
        ..GeneratedText::empty()
    }))
}

#[post("/api/ai/main-article", data = "<body>")]
async fn main_article(
    state: &State<AppState>,
    body: Json<StoryRequest>,
) -> Result<Json<GeneratedText>, ApiError> {
    let article = state
        .writer
        .main_article(&body.title, &body.summary)
        .await
        .map_err(generation_failed)?;
    Ok(Json(GeneratedText {
        article: Some(article),
        ..GeneratedText::empty()
    }))
}

#[post("/api/ai/impact", data = "<body>")]
async fn impact(state: &State<AppState>, body: Json<ImpactRequest>) -> Json<NewsImpact> {
    Json(
        state
            .writer
            .news_impact(&body.title, &body.description, &body.source, &body.category)
            .await,
    )
}

fn campaign_client(state: &AppState) -> Result<&CampaignClient, ApiError> {
    state.campaigns.as_deref().ok_or_else(|| {
        api_error(
            Status::InternalServerError,
            "ActiveCampaign not configured: ActiveCampaign URL and API Key must be configured",
        )
    })
}

/// Map a client error to a 500 with `prefix` unless it is a configuration problem.
fn campaign_failure(prefix: &str, e: CampaignError) -> ApiError {
    tracing::error!("{}: {}", prefix, e);
    match e {
        CampaignError::NotConfigured(_) => api_error(Status::InternalServerError, e.to_string()),
        other => api_error(Status::InternalServerError, format!("{}: {}", prefix, other)),
    }
}

#[get("/api/activecampaign/lists")]
async fn campaign_lists(state: &State<AppState>) -> Result<Json<ListsResponse>, ApiError> {
    let client = campaign_client(state)?;
    let lists = client
        .lists()
        .await
        .map_err(|e| campaign_failure("Failed to fetch lists", e))?;
    Ok(Json(ListsResponse { lists }))
}

#[get("/api/activecampaign/addresses")]
async fn campaign_addresses(state: &State<AppState>) -> Result<Json<AddressesResponse>, ApiError> {
    let client = campaign_client(state)?;
    let addresses = client
        .addresses()
        .await
        .map_err(|e| campaign_failure("Failed to fetch addresses", e))?;
    Ok(Json(AddressesResponse { addresses }))
}

#[post("/api/activecampaign/push", data = "<body>")]
async fn campaign_push(
    state: &State<AppState>,
    body: Json<PushCampaignBody>,
) -> Result<Json<PushCampaignResponse>, ApiError> {
    let client = campaign_client(state)?;
    let body = body.into_inner();
    let request = PushRequest {
        list_id: body.list_id,
        campaign_name: body.campaign_name,
        subject: body.subject,
        html_content: body.html_content,
        status: body.campaign_status,
        address_id: body.address_id,
        scheduled_date: body.scheduled_date,
        sender: Sender {
            name: body.sender_name,
            email: body.sender_email,
        },
    };

    let outcome = client
        .push_newsletter(&request)
        .await
        .map_err(|e| campaign_failure("Failed to push campaign", e))?;

    Ok(Json(PushCampaignResponse {
        success: true,
        message: status_message(outcome.status, request.scheduled_date.as_deref()),
        campaign_id: outcome.campaign_id,
        status: outcome.status,
    }))
}

fn status_message(status: CampaignStatus, scheduled_date: Option<&str>) -> String {
    match status {
        CampaignStatus::Draft => "Campaign draft created successfully".to_string(),
        CampaignStatus::Scheduled => {
            format!("Campaign scheduled for {}", scheduled_date.unwrap_or_default())
        }
        CampaignStatus::Immediate => "Campaign sent successfully".to_string(),
    }
}

/// Build the Rocket instance with managed state and all routes mounted.
pub fn build_rocket(figment: rocket::figment::Figment, state: AppState) -> Rocket<Build> {
    rocket::custom(figment).manage(state).mount(
        "/",
        routes![
            health,
            recommendations,
            category_news,
            search_section,
            hook_title,
            summary,
            one_liner,
            description,
            full_story,
            main_article,
            impact,
            campaign_lists,
            campaign_addresses,
            campaign_push,
        ],
    )
}

/// Build and launch a Rocket server, applying `[server] bind/port` from the loaded config.
///
/// Blocks until the server shuts down.
pub async fn launch_rocket(config: &Config, state: AppState) -> Result<()> {
    let mut fig = rocket::Config::figment();
    if let Some(bind) = &config.server.bind {
        fig = fig.merge(("address", bind.clone()));
    }
    if let Some(port) = config.server.port {
        fig = fig.merge(("port", port));
    }

    tracing::info!("Starting Rocket HTTP server");
    build_rocket(fig, state)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
