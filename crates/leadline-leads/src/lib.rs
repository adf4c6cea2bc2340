//! Lead submission and the lead ledgers.
//!
//! A finished intake session leaves through [`LeadSubmitter::finalize`]:
//! eligibility runs once, a rejected lead is recorded without contacting the
//! lead API, and an eligible lead is delivered exactly once. Failed
//! deliveries stay in the failed ledger until an operator retries them.

mod api;
mod filter;
pub mod ledger;
mod mapping;
mod npa;
mod submitter;

pub use api::{DeliveryError, LeadApi, LeadSubmission};
pub use filter::{parse_window, InvalidWindow, LedgerFilter};
pub use ledger::{FailedLead, RejectedLead, SucceededLead};
pub use mapping::{build_payload, LeadPayload};
pub use npa::{LeadApiConfig, NpaClient};
pub use submitter::{LeadSubmitter, RetryOutcome, RetrySummary, SubmissionOutcome};

use leadline_sessions::SessionError;
use thiserror::Error;

/// Errors from the submission pipeline. Delivery failures are not errors
/// here; they become [`SubmissionOutcome::Failed`].
#[derive(Debug, Error)]
pub enum LeadError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("failed lead {0} not found")]
    NotFound(i64),
    #[error("failed lead {0} is already resolved")]
    AlreadyResolved(i64),
    #[error("session {0} is already closed")]
    SessionClosed(i64),
}
