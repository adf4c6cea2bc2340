//! Ledger query filters and operator time windows.

use chrono::{DateTime, Duration, Utc};
use leadline_types::{Channel, RejectionCategory};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time window '{0}', expected e.g. 24h, 7d, or 2w")]
pub struct InvalidWindow(pub String);

/// Parses an operator window such as `30m`, `24h`, `7d`, or `2w`.
pub fn parse_window(text: &str) -> Result<Duration, InvalidWindow> {
    let text = text.trim();
    let invalid = || InvalidWindow(text.to_string());
    let unit = text.chars().last().ok_or_else(invalid)?;
    let amount: i64 = text[..text.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }
    match unit {
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        'w' => Duration::try_weeks(amount),
        _ => None,
    }
    .ok_or_else(invalid)
}

/// Filter for rejected and succeeded ledger listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    /// Entries at or after this instant.
    pub since: Option<DateTime<Utc>>,
    pub channel: Option<Channel>,
    /// Only meaningful for rejected leads.
    pub category: Option<RejectionCategory>,
}

impl LedgerFilter {
    /// Sets `since` to `now - window`.
    pub fn within(mut self, window: Duration) -> Self {
        self.since = Some(Utc::now() - window);
        self
    }
}
