//! The lead API seam.

use async_trait::async_trait;
use leadline_types::{Channel, LeadFields};
use thiserror::Error;

/// A lead ready to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadSubmission {
    pub session_id: i64,
    pub channel: Channel,
    pub lead: LeadFields,
}

/// Why a delivery attempt failed. Every variant is operator-retryable.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("lead API is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("lead API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("lead API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("lead API error: {0}")]
    Rejected(String),
    #[error("unexpected lead API response: {0}")]
    InvalidResponse(String),
}

/// Creates leads in the downstream lead-management system.
#[async_trait]
pub trait LeadApi: Send + Sync {
    /// Delivers one lead and returns the provider's record id.
    async fn create_lead(&self, submission: &LeadSubmission) -> Result<String, DeliveryError>;
}
