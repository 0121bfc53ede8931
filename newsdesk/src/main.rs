/*
newsdesk - single-binary main.rs
This binary loads configuration, builds the two model clients and starts the Rocket HTTP server.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newsdesk::campaign::CampaignClient;
use newsdesk::llm::remote::RemoteLlmProvider;
use newsdesk::llm::LlmProvider;
use newsdesk::news::service::NewsService;
use newsdesk::server::{launch_rocket, AppState};
use newsdesk::writer::ContentWriter;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Parser, Debug)]
#[command(name = "newsdesk", about = "Newsdesk newsletter assembly server")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Run the recommendation pipeline once, print the sections as JSON and exit
    #[arg(long)]
    recommendations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // .env is optional; real environment variables win
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(%e, "failed to load configuration");
        e
    })?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    // Both model keys are required
    let search = RemoteLlmProvider::from_config(
        &config.llm.search,
        OPENROUTER_URL,
        "perplexity/sonar-pro",
        0.3,
    )
    .context("search model is not configured")?;
    info!(model = search.model(), url = search.base_url(), "search model initialized");

    let content = RemoteLlmProvider::from_config(&config.llm.content, OPENAI_URL, "gpt-4.1-mini", 0.7)
        .context("content model is not configured")?;
    info!(model = content.model(), url = content.base_url(), "content model initialized");

    let search_llm: Arc<dyn LlmProvider> = Arc::new(search);
    let content_llm: Arc<dyn LlmProvider> = Arc::new(content);

    let news = Arc::new(
        NewsService::new(search_llm, content_llm.clone())
            .with_items_per_category(config.items_per_category()),
    );

    if args.recommendations {
        let sections = news.generate_recommendations().await;
        println!("{}", serde_json::to_string_pretty(&sections)?);
        return Ok(());
    }

    let campaigns = match config.activecampaign.as_ref() {
        Some(cfg) => match CampaignClient::from_config(cfg) {
            Ok(client) => {
                info!("ActiveCampaign client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!("ActiveCampaign disabled: {}", e);
                None
            }
        },
        None => {
            warn!("no [activecampaign] section, campaign routes will answer 500");
            None
        }
    };

    let state = AppState::new(news, Arc::new(ContentWriter::new(content_llm)), campaigns);

    if let Err(e) = launch_rocket(&config, state).await {
        error!(%e, "server failed");
        return Err(e);
    }
    Ok(())
}
