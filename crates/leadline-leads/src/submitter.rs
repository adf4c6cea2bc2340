//! Lead finalization, delivery, and operator retry.

use crate::api::{LeadApi, LeadSubmission};
use crate::filter::LedgerFilter;
use crate::ledger::{self, FailedLead, RejectedLead, SucceededLead};
use crate::LeadError;
use chrono::{Duration, Utc};
use leadline_db::{sqlite_timestamp, DbPool};
use leadline_eligibility::{evaluate, Rejection, Verdict};
use leadline_sessions::{close_session, get_session, list_open_sessions, Session, SessionError};
use rusqlite::Connection;
use std::sync::Arc;

const SIGN_OFF: &str = "Have a great day!";

/// What happened to a finalized session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Succeeded { record_id: String },
    /// Delivery failed; the lead sits in the failed ledger for an operator.
    Failed { error: String },
    Rejected(Rejection),
}

impl SubmissionOutcome {
    /// Final words for the caller. Always ends with the sign-off the voice
    /// bridge listens for.
    pub fn closing_message(&self) -> String {
        match self {
            // The caller is not told about delivery failures; an operator
            // retries them.
            SubmissionOutcome::Succeeded { .. } | SubmissionOutcome::Failed { .. } => format!(
                "Thank you! Your information has been submitted and an agent will contact you within 24 hours. {SIGN_OFF}"
            ),
            SubmissionOutcome::Rejected(rejection) => {
                format!("{} {SIGN_OFF}", rejection.decline_message())
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Succeeded { .. } => "succeeded",
            SubmissionOutcome::Failed { .. } => "failed",
            SubmissionOutcome::Rejected(_) => "rejected",
        }
    }
}

/// Result of one operator retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded { record_id: String },
    Failed { error: String, retry_count: i64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Moves sessions into the lead ledgers.
///
/// Every path that closes a session writes its ledger row in the same
/// transaction, so a closed session always has exactly one entry.
#[derive(Clone)]
pub struct LeadSubmitter {
    pool: DbPool,
    api: Arc<dyn LeadApi>,
}

impl LeadSubmitter {
    pub fn new(pool: DbPool, api: Arc<dyn LeadApi>) -> Self {
        Self { pool, api }
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, LeadError>
    where
        F: FnOnce(&mut Connection) -> Result<T, LeadError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }

    /// Runs eligibility once, then records a rejection or delivers the lead.
    pub async fn finalize(
        &self,
        submission: LeadSubmission,
    ) -> Result<SubmissionOutcome, LeadError> {
        match evaluate(&submission.lead) {
            Verdict::Eligible => self.submit(submission).await,
            Verdict::Rejected(rejection) => {
                tracing::info!(
                    session_id = submission.session_id,
                    category = rejection.category.as_str(),
                    reason = %rejection.reason,
                    "lead rejected"
                );
                let stored = rejection.clone();
                self.with_conn(move |conn| {
                    let tx = conn.transaction()?;
                    close_open(&tx, submission.session_id)?;
                    ledger::insert_rejected(
                        &tx,
                        submission.session_id,
                        submission.channel,
                        &submission.lead,
                        &stored.reason,
                        stored.category,
                    )?;
                    tx.commit()?;
                    Ok(())
                })
                .await?;
                Ok(SubmissionOutcome::Rejected(rejection))
            }
        }
    }

    /// Delivers a lead once and records the outcome.
    ///
    /// The session must still be open; it is closed alongside the ledger
    /// insert whether delivery worked or not.
    pub async fn submit(&self, submission: LeadSubmission) -> Result<SubmissionOutcome, LeadError> {
        let session_id = submission.session_id;
        let session = self
            .with_conn(move |conn| Ok(get_session(conn, session_id)?))
            .await?;
        if !session.is_open() {
            return Err(LeadError::SessionClosed(session_id));
        }

        let outcome = match self.api.create_lead(&submission).await {
            Ok(record_id) => {
                tracing::info!(session_id, record_id = %record_id, "lead delivered");
                SubmissionOutcome::Succeeded { record_id }
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "lead delivery failed");
                SubmissionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let recorded = outcome.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            close_open(&tx, session_id)?;
            match &recorded {
                SubmissionOutcome::Succeeded { record_id } => {
                    ledger::insert_succeeded(
                        &tx,
                        session_id,
                        submission.channel,
                        &submission.lead,
                        record_id,
                    )?;
                }
                SubmissionOutcome::Failed { error } => {
                    ledger::insert_failed(
                        &tx,
                        session_id,
                        submission.channel,
                        &submission.lead,
                        error,
                    )?;
                }
                SubmissionOutcome::Rejected(_) => {}
            }
            tx.commit()?;
            Ok(())
        })
        .await?;

        Ok(outcome)
    }

    /// Re-attempts delivery of one failed lead.
    pub async fn retry(&self, failed_id: i64) -> Result<RetryOutcome, LeadError> {
        let failed = self
            .with_conn(move |conn| {
                ledger::get_failed(conn, failed_id)?.ok_or(LeadError::NotFound(failed_id))
            })
            .await?;
        if failed.resolved {
            return Err(LeadError::AlreadyResolved(failed_id));
        }

        let submission = LeadSubmission {
            session_id: failed.session_id,
            channel: failed.channel,
            lead: failed.lead,
        };

        match self.api.create_lead(&submission).await {
            Ok(record_id) => {
                let stored = record_id.clone();
                self.with_conn(move |conn| {
                    let tx = conn.transaction()?;
                    if ledger::mark_retry_succeeded(&tx, failed_id)? == 0 {
                        return Err(LeadError::AlreadyResolved(failed_id));
                    }
                    ledger::insert_succeeded(
                        &tx,
                        submission.session_id,
                        submission.channel,
                        &submission.lead,
                        &stored,
                    )?;
                    tx.commit()?;
                    Ok(())
                })
                .await?;
                tracing::info!(failed_id, record_id = %record_id, "retry delivered lead");
                Ok(RetryOutcome::Succeeded { record_id })
            }
            Err(e) => {
                let error = e.to_string();
                let stored = error.clone();
                let retry_count = self
                    .with_conn(move |conn| Ok(ledger::mark_retry_failed(conn, failed_id, &stored)?))
                    .await?;
                tracing::warn!(failed_id, retry_count, error = %error, "retry failed");
                Ok(RetryOutcome::Failed { error, retry_count })
            }
        }
    }

    /// Retries every unresolved failed lead, one at a time.
    pub async fn retry_all(&self) -> Result<RetrySummary, LeadError> {
        let pending = self.list_failed(false).await?;
        let mut summary = RetrySummary::default();
        for failed in pending {
            match self.retry(failed.id).await? {
                RetryOutcome::Succeeded { .. } => summary.succeeded += 1,
                RetryOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "retry pass complete"
        );
        Ok(summary)
    }

    pub async fn list_failed(&self, include_resolved: bool) -> Result<Vec<FailedLead>, LeadError> {
        self.with_conn(move |conn| Ok(ledger::list_failed(conn, include_resolved)?))
            .await
    }

    pub async fn list_rejected(&self, filter: LedgerFilter) -> Result<Vec<RejectedLead>, LeadError> {
        self.with_conn(move |conn| Ok(ledger::list_rejected(conn, &filter)?))
            .await
    }

    /// Succeeded entries for cross-checking against the provider.
    pub async fn reconcile_succeeded(
        &self,
        filter: LedgerFilter,
    ) -> Result<Vec<SucceededLead>, LeadError> {
        self.with_conn(move |conn| Ok(ledger::list_succeeded(conn, &filter)?))
            .await
    }

    /// Open sessions with no activity for at least `older_than`.
    pub async fn list_abandoned(&self, older_than: Duration) -> Result<Vec<Session>, LeadError> {
        let cutoff = sqlite_timestamp(Utc::now() - older_than);
        self.with_conn(move |conn| Ok(list_open_sessions(conn, None, Some(&cutoff))?))
            .await
    }
}

fn close_open(conn: &Connection, session_id: i64) -> Result<(), LeadError> {
    close_session(conn, session_id).map_err(|e| match e {
        SessionError::Closed(id) => LeadError::SessionClosed(id),
        other => LeadError::Session(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadline_types::RejectionCategory;

    #[test]
    fn closing_messages_end_with_sign_off() {
        let outcomes = [
            SubmissionOutcome::Succeeded {
                record_id: "R1".into(),
            },
            SubmissionOutcome::Failed {
                error: "timeout".into(),
            },
            SubmissionOutcome::Rejected(Rejection {
                category: RejectionCategory::ZipCode,
                reason: "We don't currently serve Alaska.".into(),
            }),
        ];
        for outcome in outcomes {
            assert!(outcome.closing_message().ends_with(SIGN_OFF), "{outcome:?}");
        }
    }

    #[test]
    fn failed_delivery_reads_like_success_to_the_caller() {
        let ok = SubmissionOutcome::Succeeded {
            record_id: "R1".into(),
        };
        let failed = SubmissionOutcome::Failed {
            error: "HTTP 500".into(),
        };
        assert_eq!(ok.closing_message(), failed.closing_message());
        assert!(!failed.closing_message().contains("500"));
    }
}
