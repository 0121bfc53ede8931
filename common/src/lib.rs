/*!
common/src/lib.rs

Shared configuration types and helpers for Newsdesk.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default file with an optional override file
- Helpers resolving API keys from the environment variables named in the config
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// HTTP server configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (e.g. "0.0.0.0")
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// OpenAI-compatible chat endpoint used by one of the model roles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl RemoteLlmConfig {
    /// Read the API key from the environment variable named by `api_key_env`.
    pub fn resolve_api_key(&self) -> Result<String> {
        let env_name = self
            .api_key_env
            .as_deref()
            .context("missing api_key_env in LLM config")?;
        let key = std::env::var(env_name)
            .with_context(|| format!("LLM API key env var '{}' not set", env_name))?;
        if key.trim().is_empty() {
            anyhow::bail!("LLM API key env var '{}' is empty", env_name);
        }
        Ok(key)
    }
}

/// The two model roles of the news pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Web-search capable model (real news with URLs)
    pub search: RemoteLlmConfig,
    /// Content model (title rewriting, ranking, fallback generation, copywriting)
    pub content: RemoteLlmConfig,
}

/// Newsletter assembly knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterConfig {
    pub items_per_category: Option<usize>,
}

/// ActiveCampaign credentials and sender defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveCampaignConfig {
    pub url: Option<String>,
    pub api_key_env: Option<String>,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
}

impl ActiveCampaignConfig {
    /// Account base URL without trailing slash, validated as an absolute URL.
    pub fn base_url(&self) -> Result<String> {
        let raw = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .context("ActiveCampaign URL is not configured")?;
        url::Url::parse(raw).with_context(|| format!("invalid ActiveCampaign URL: {}", raw))?;
        Ok(raw.trim_end_matches('/').to_string())
    }

    pub fn api_key(&self) -> Result<String> {
        let env_name = self
            .api_key_env
            .as_deref()
            .context("ActiveCampaign api_key_env is not configured")?;
        std::env::var(env_name)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("ActiveCampaign API key env var '{}' not set", env_name))
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub newsletter: Option<NewsletterConfig>,
    pub activecampaign: Option<ActiveCampaignConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    pub fn items_per_category(&self) -> usize {
        self.newsletter
            .as_ref()
            .and_then(|n| n.items_per_category)
            .unwrap_or(4)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BASE: &str = r#"
        [server]
        bind = "127.0.0.1"
        port = 8000

        [llm.search]
        api_url = "https://openrouter.ai/api/v1/chat/completions"
        api_key_env = "OPENROUTER_API_KEY"
        model = "perplexity/sonar-pro"
        temperature = 0.3

        [llm.content]
        api_url = "https://api.openai.com/v1/chat/completions"
        api_key_env = "OPENAI_API_KEY"
        model = "gpt-4.1-mini"
    "#;

    #[test]
    fn config_from_string() {
        let cfg: Config = toml::from_str(BASE).expect("parse config");
        assert_eq!(cfg.server.port, Some(8000));
        assert_eq!(cfg.llm.search.model.as_deref(), Some("perplexity/sonar-pro"));
        assert_eq!(cfg.llm.search.temperature, Some(0.3));
        assert!(cfg.activecampaign.is_none());
        assert_eq!(cfg.items_per_category(), 4);
    }

    #[tokio::test]
    async fn override_file_takes_precedence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");
        fs::write(&default_path, BASE).expect("write default");
        fs::write(
            &override_path,
            r#"
            [llm.content]
            model = "gpt-4.1"

            [newsletter]
            items_per_category = 6
            "#,
        )
        .expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load");

        assert_eq!(cfg.llm.content.model.as_deref(), Some("gpt-4.1"));
        // untouched keys survive the merge
        assert_eq!(cfg.llm.content.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(cfg.items_per_category(), 6);
    }

    #[test]
    fn activecampaign_base_url_is_normalized() {
        let ac = ActiveCampaignConfig {
            url: Some("https://acme.api-us1.com/".to_string()),
            api_key_env: None,
            sender_name: None,
            sender_email: None,
        };
        assert_eq!(ac.base_url().unwrap(), "https://acme.api-us1.com");

        let missing = ActiveCampaignConfig { url: Some("  ".to_string()), ..ac.clone() };
        assert!(missing.base_url().is_err());
        assert!(ac.api_key().is_err());
    }

    #[test]
    fn missing_key_env_is_an_error() {
        let cfg = RemoteLlmConfig {
            api_url: None,
            api_key_env: Some("NEWSDESK_TEST_UNSET_KEY".to_string()),
            model: None,
            timeout_seconds: None,
            max_tokens: None,
            temperature: None,
        };
        let err = cfg.resolve_api_key().unwrap_err();
        assert!(err.to_string().contains("NEWSDESK_TEST_UNSET_KEY"));
    }
}
