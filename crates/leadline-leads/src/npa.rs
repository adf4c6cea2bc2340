//! HTTP client for the NPA lead API.

use crate::api::{DeliveryError, LeadApi, LeadSubmission};
use crate::mapping::build_payload;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const CREATE_LEAD_PATH: &str = "/api/Lead/LeadCreate";

fn default_lead_source() -> String {
    "IVR".to_string()
}

fn default_placeholder_email_domain() -> String {
    "powersportbuyers.com".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

/// Lead API connection settings.
#[derive(Clone, Deserialize)]
pub struct LeadApiConfig {
    /// Base URL, without the `/api/...` path.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_lead_source")]
    pub lead_source: String,
    /// Domain of the synthetic address used when no email was collected.
    #[serde(default = "default_placeholder_email_domain")]
    pub placeholder_email_domain: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LeadApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            lead_source: default_lead_source(),
            placeholder_email_domain: default_placeholder_email_domain(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LeadApiConfig {
    /// Whether a base URL and both credentials are present.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for LeadApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeadApiConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("lead_source", &self.lead_source)
            .field("placeholder_email_domain", &self.placeholder_email_domain)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CreateLeadResponse {
    success: bool,
    #[serde(rename = "recordID")]
    record_id: Option<String>,
    message: Option<String>,
}

/// [`LeadApi`] over HTTPS.
#[derive(Debug, Clone)]
pub struct NpaClient {
    http: reqwest::Client,
    config: LeadApiConfig,
}

impl NpaClient {
    pub fn new(config: LeadApiConfig) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{CREATE_LEAD_PATH}",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl LeadApi for NpaClient {
    async fn create_lead(&self, submission: &LeadSubmission) -> Result<String, DeliveryError> {
        if self.config.base_url.is_empty() {
            return Err(DeliveryError::NotConfigured("lead_api.base_url is empty"));
        }
        if self.config.username.is_empty() || self.config.password.is_empty() {
            return Err(DeliveryError::NotConfigured("lead_api credentials are empty"));
        }

        let payload = build_payload(&self.config, submission);
        let body = serde_json::to_vec(&payload)
            .map_err(|e| DeliveryError::InvalidResponse(format!("could not encode lead: {e}")))?;

        tracing::info!(
            session_id = submission.session_id,
            channel = submission.channel.as_str(),
            "submitting lead"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header(CONTENT_TYPE, "application/json-patch+json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CreateLeadResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;

        if !parsed.success {
            return Err(DeliveryError::Rejected(
                parsed.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        parsed
            .record_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DeliveryError::InvalidResponse("success without recordID".to_string()))
    }
}
