//! ActiveCampaign client.
//!
//! Lists, addresses and message creation go through the v3 REST API; campaign creation uses
//! the legacy v1 `admin/api.php` endpoint because v3 cannot link a message to a campaign.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("ActiveCampaign not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to send HTTP request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} failed: {message} (HTTP {status})")]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("{operation} failed: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("Scheduled date is required for scheduled campaigns")]
    MissingScheduleDate,

    #[error("Failed to decode {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("Failed to {step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<CampaignError>,
    },
}

pub type Result<T> = std::result::Result<T, CampaignError>;

/// How the campaign should be created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Scheduled,
    Immediate,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Immediate => "immediate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriberList {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingAddress {
    pub id: String,
    pub company_name: String,
    pub display: String,
}

/// Optional sender identity overriding the configured defaults
#[derive(Debug, Clone, Default)]
pub struct Sender {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PushRequest {
    pub list_id: String,
    pub campaign_name: String,
    pub subject: String,
    pub html_content: String,
    pub status: CampaignStatus,
    pub address_id: Option<String>,
    /// ISO 8601, e.g. "2026-01-20T10:00:00"
    pub scheduled_date: Option<String>,
    pub sender: Sender,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushOutcome {
    pub campaign_id: String,
    pub message_id: String,
    pub status: CampaignStatus,
}

pub struct CampaignClient {
    base_url: String,
    api_key: String,
    sender_name: String,
    sender_email: String,
    client: reqwest::Client,
}

impl CampaignClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        sender_name: impl Into<String>,
        sender_email: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        let api_key = api_key.into();
        if base_url.is_empty() || api_key.is_empty() {
            return Err(CampaignError::NotConfigured(
                "ActiveCampaign URL and API Key must be configured".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base_url,
            api_key,
            sender_name: sender_name.into(),
            sender_email: sender_email.into(),
            client,
        })
    }

    /// Build from the `[activecampaign]` config section, reading the key from the environment.
    pub fn from_config(cfg: &common::ActiveCampaignConfig) -> Result<Self> {
        let base_url = cfg
            .base_url()
            .map_err(|e| CampaignError::NotConfigured(e.to_string()))?;
        let api_key = cfg
            .api_key()
            .map_err(|e| CampaignError::NotConfigured(e.to_string()))?;
        Self::new(
            base_url,
            api_key,
            cfg.sender_name.clone().unwrap_or_else(|| "Newsletter".to_string()),
            cfg.sender_email.clone().unwrap_or_default(),
        )
    }

    fn v3(&self, path: &str) -> String {
        format!("{}/api/3/{}", self.base_url, path)
    }

    pub async fn lists(&self) -> Result<Vec<SubscriberList>> {
        #[derive(Deserialize)]
        struct ListsBody {
            #[serde(default)]
            lists: Vec<RawList>,
        }
        #[derive(Deserialize)]
        struct RawList {
            id: String,
            name: String,
        }

        let response = self
            .client
            .get(self.v3("lists"))
            .header("Api-Token", &self.api_key)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;
        let body: ListsBody = read_v3(response, "Get lists").await?;

        Ok(body
            .lists
            .into_iter()
            .map(|l| SubscriberList { id: l.id, name: l.name })
            .collect())
    }

    pub async fn addresses(&self) -> Result<Vec<MailingAddress>> {
        #[derive(Deserialize)]
        struct AddressesBody {
            #[serde(default)]
            addresses: Vec<RawAddress>,
        }

        let response = self
            .client
            .get(self.v3("addresses"))
            .header("Api-Token", &self.api_key)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;
        let body: AddressesBody = read_v3(response, "Get addresses").await?;

        Ok(body.addresses.into_iter().map(RawAddress::into_address).collect())
    }

    /// Create the email message (v3). Returns the message id.
    pub async fn create_message(&self, subject: &str, html: &str, sender: &Sender) -> Result<String> {
        let (from_name, from_email) = self.sender_identity(sender);
        let payload = serde_json::json!({
            "message": {
                "fromname": from_name,
                "fromemail": from_email,
                "reply2": from_email,
                "subject": subject,
                "html": html,
                "text": "Please view this email in an HTML-compatible email client."
            }
        });

        #[derive(Deserialize)]
        struct MessageBody {
            message: CreatedMessage,
        }
        #[derive(Deserialize)]
        struct CreatedMessage {
            id: serde_json::Value,
        }

        let response = self
            .client
            .post(self.v3("messages"))
            .header("Api-Token", &self.api_key)
            .json(&payload)
            .send()
            .await?;
        let body: MessageBody = read_v3(response, "Create message (v3)").await?;
        Ok(id_string(&body.message.id))
    }

    /// Create the campaign (v1) linking `message_id` to `list_id`. Returns the campaign id.
    pub async fn create_campaign(
        &self,
        request: &PushRequest,
        message_id: &str,
    ) -> Result<String> {
        let (status, sdate) = schedule_fields(request.status, request.scheduled_date.as_deref())?;
        let (from_name, from_email) = self.sender_identity(&request.sender);
        let list_id = request.list_id.as_str();

        let form: Vec<(String, String)> = vec![
            ("type".into(), "single".into()),
            ("name".into(), request.campaign_name.clone()),
            ("sdate".into(), sdate),
            ("status".into(), status.to_string()),
            ("public".into(), "1".into()),
            ("tracklinks".into(), "all".into()),
            ("trackreads".into(), "1".into()),
            ("trackreplies".into(), "0".into()),
            ("htmlunsub".into(), "1".into()),
            ("textunsub".into(), "1".into()),
            ("analytics_campaign_name".into(), request.campaign_name.clone()),
            (
                "addressid".into(),
                request.address_id.clone().unwrap_or_else(|| "0".to_string()),
            ),
            (format!("p[{}]", list_id), list_id.to_string()),
            // 100% of recipients get this message
            (format!("m[{}]", message_id), "100".into()),
            ("fromemail".into(), from_email.clone()),
            ("fromname".into(), from_name),
            ("reply2".into(), from_email),
            ("subject".into(), request.subject.clone()),
        ];

        info!(
            name = %request.campaign_name,
            status = request.status.as_str(),
            list = %list_id,
            message = %message_id,
            "creating campaign"
        );

        let response = self
            .client
            .post(format!("{}/admin/api.php", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("api_action", "campaign_create"),
                ("api_output", "json"),
            ])
            .timeout(Duration::from_secs(30))
            .form(&form)
            .send()
            .await?;

        let text = response.text().await?;
        let campaign_id = parse_v1_campaign(&text)?;
        info!(campaign_id = %campaign_id, status = request.status.as_str(), "campaign created");
        Ok(campaign_id)
    }

    /// Message first, then campaign.
    pub async fn push_newsletter(&self, request: &PushRequest) -> Result<PushOutcome> {
        // Checked up front so a bad schedule never leaves an orphan message behind
        schedule_fields(request.status, request.scheduled_date.as_deref())?;

        info!(subject = %request.subject, "step 1: creating message");
        let message_id = self
            .create_message(&request.subject, &request.html_content, &request.sender)
            .await
            .map_err(|e| {
                error!("step 1 failed (create_message): {}", e);
                CampaignError::Step {
                    step: "create message",
                    source: Box::new(e),
                }
            })?;

        info!(name = %request.campaign_name, list = %request.list_id, "step 2: creating campaign");
        let campaign_id = self
            .create_campaign(request, &message_id)
            .await
            .map_err(|e| {
                error!("step 2 failed (create_campaign): {}", e);
                CampaignError::Step {
                    step: "create campaign",
                    source: Box::new(e),
                }
            })?;

        Ok(PushOutcome {
            campaign_id,
            message_id,
            status: request.status,
        })
    }

    fn sender_identity(&self, sender: &Sender) -> (String, String) {
        (
            sender.name.clone().unwrap_or_else(|| self.sender_name.clone()),
            sender.email.clone().unwrap_or_else(|| self.sender_email.clone()),
        )
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAddress {
    id: String,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    address1: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl RawAddress {
    fn into_address(self) -> MailingAddress {
        let company = self.company_name.unwrap_or_default();
        let mut parts = vec![company.clone()];
        if let Some(street) = self.address1.filter(|s| !s.is_empty()) {
            parts.push(street);
        }
        if let Some(city) = self.city.filter(|s| !s.is_empty()) {
            match self.state.filter(|s| !s.is_empty()) {
                Some(state) => parts.push(format!("{}, {}", city, state)),
                None => parts.push(city),
            }
        }

        let display = parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" - ");
        MailingAddress {
            display: if display.is_empty() {
                format!("Address #{}", self.id)
            } else {
                display
            },
            id: self.id,
            company_name: company,
        }
    }
}

/// Decode a v3 response, turning HTTP errors into `CampaignError::Api` with the best message.
async fn read_v3<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_client_error() || status.is_server_error() {
        return Err(CampaignError::Api {
            operation,
            status: status.as_u16(),
            message: v3_error_message(&text, status.as_u16()),
        });
    }

    serde_json::from_str(&text).map_err(|e| CampaignError::Decode {
        operation,
        message: e.to_string(),
    })
}

fn v3_error_message(body: &str, status: u16) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            if let Some(errors) = value.get("errors") {
                errors.to_string()
            } else if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
                message.to_string()
            } else {
                value.to_string()
            }
        }
        Err(_) if !body.trim().is_empty() => body.to_string(),
        Err(_) => format!("HTTP {}", status),
    }
}

/// v1 replies carry `result_code` (0 = failure) and the new campaign `id`.
fn parse_v1_campaign(body: &str) -> Result<String> {
    const OPERATION: &str = "Create campaign (v1)";
    let data: serde_json::Value = serde_json::from_str(body).map_err(|_| CampaignError::Rejected {
        operation: OPERATION,
        message: body.to_string(),
    })?;

    let code = data.get("result_code");
    let failed = code.and_then(|c| c.as_i64()) == Some(0)
        || code.and_then(|c| c.as_str()) == Some("0");
    if failed {
        let message = data
            .get("result_message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        return Err(CampaignError::Rejected {
            operation: OPERATION,
            message,
        });
    }

    data.get("id")
        .map(id_string)
        .ok_or_else(|| CampaignError::Decode {
            operation: OPERATION,
            message: "missing campaign id".to_string(),
        })
}

/// v1 `status` and `sdate` for the requested campaign mode.
pub fn schedule_fields(status: CampaignStatus, scheduled_date: Option<&str>) -> Result<(u8, String)> {
    match status {
        CampaignStatus::Draft => Ok((0, String::new())),
        CampaignStatus::Immediate => Ok((1, String::new())),
        CampaignStatus::Scheduled => {
            let raw = scheduled_date
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .ok_or(CampaignError::MissingScheduleDate)?;
            Ok((1, format_sdate(raw)))
        }
    }
}

/// ISO 8601 → "YYYY-MM-DD HH:MM:SS"; unparseable input is passed through unchanged.
fn format_sdate(raw: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format("%Y-%m-%d %H:%M:%S").to_string();
        }
    }
    raw.to_string()
}

fn id_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_fields_per_status() {
        assert_eq!(schedule_fields(CampaignStatus::Draft, None).unwrap(), (0, String::new()));
        assert_eq!(
            schedule_fields(CampaignStatus::Immediate, Some("2026-01-20T10:00:00")).unwrap(),
            (1, String::new())
        );
        assert_eq!(
            schedule_fields(CampaignStatus::Scheduled, Some("2026-01-20T10:00:00")).unwrap(),
            (1, "2026-01-20 10:00:00".to_string())
        );
        assert!(matches!(
            schedule_fields(CampaignStatus::Scheduled, None),
            Err(CampaignError::MissingScheduleDate)
        ));
    }

    #[test]
    fn sdate_accepts_zulu_and_passes_through_garbage() {
        assert_eq!(format_sdate("2026-01-20T10:00:00Z"), "2026-01-20 10:00:00");
        assert_eq!(format_sdate("next tuesday"), "next tuesday");
    }

    #[test]
    fn v1_result_code_zero_is_rejected() {
        let err = parse_v1_campaign(r#"{"result_code": 0, "result_message": "List not found"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Create campaign (v1) failed: List not found");

        assert_eq!(
            parse_v1_campaign(r#"{"result_code": 1, "id": 77}"#).unwrap(),
            "77"
        );
        assert!(parse_v1_campaign("<html>oops</html>").is_err());
    }

    #[test]
    fn v3_error_message_prefers_errors_then_message() {
        assert_eq!(v3_error_message(r#"{"message": "No Result found"}"#, 404), "No Result found");
        assert!(v3_error_message(r#"{"errors": [{"title": "bad"}]}"#, 422).contains("bad"));
        assert_eq!(v3_error_message("", 500), "HTTP 500");
        assert_eq!(v3_error_message("Forbidden", 403), "Forbidden");
    }

    #[test]
    fn address_display_joins_parts() {
        let full = RawAddress {
            id: "1".into(),
            company_name: Some("Ready Artwork".into()),
            address1: Some("1 Main St".into()),
            city: Some("Austin".into()),
            state: Some("TX".into()),
        }
        .into_address();
        assert_eq!(full.display, "Ready Artwork - 1 Main St - Austin, TX");

        let bare = RawAddress {
            id: "9".into(),
            company_name: None,
            address1: None,
            city: None,
            state: None,
        }
        .into_address();
        assert_eq!(bare.display, "Address #9");
    }

    #[test]
    fn missing_credentials_are_a_configuration_error() {
        let err = CampaignClient::new("", "key", "n", "e").err().unwrap();
        assert!(matches!(err, CampaignError::NotConfigured(_)));
    }
}
