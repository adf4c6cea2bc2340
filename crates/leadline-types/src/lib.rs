//! Shared types for the Leadline workspace.
//!
//! This crate holds the vocabulary every other crate speaks: the intake
//! channel a conversation arrived on, the lifecycle status of a session,
//! the analytics tag attached to an eligibility rejection, and the final
//! field set of a collected lead.
//!
//! Nothing here performs I/O. Enums carry a canonical lowercase string
//! form (`as_str` / `FromStr`) which is what gets written to SQLite.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing an unknown enum label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseLabelError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseLabelError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// The conversational channel a lead arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Text-message intake.
    Sms,
    /// Phone call intake.
    Voice,
}

impl Channel {
    /// Returns the canonical string label for this channel.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Voice => "voice",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Self::Sms),
            "voice" => Ok(Self::Voice),
            _ => Err(ParseLabelError::new("channel", s)),
        }
    }
}

/// Lifecycle status of a stored session.
///
/// A session moves from `Open` to `Closed` exactly once and is never
/// reopened; a returning caller gets a fresh row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    /// Returns the canonical string label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseLabelError::new("session status", s)),
        }
    }
}

/// Analytics tag recorded with every eligibility rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCategory {
    /// Postal code falls in an excluded service region.
    ZipCode,
    /// Model belongs to a different make than the one declared.
    MakeModel,
    /// Electric powertrain.
    Electric,
    /// Three-wheeled Slingshot line.
    Slingshot,
    /// Vehicle year is at or below its category cutoff.
    VehicleAge,
}

impl RejectionCategory {
    /// Returns the canonical string label for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZipCode => "zip_code",
            Self::MakeModel => "make_model",
            Self::Electric => "electric",
            Self::Slingshot => "slingshot",
            Self::VehicleAge => "vehicle_age",
        }
    }

    /// All categories, in rule-evaluation order.
    pub const ALL: [RejectionCategory; 5] = [
        Self::ZipCode,
        Self::MakeModel,
        Self::Electric,
        Self::Slingshot,
        Self::VehicleAge,
    ];
}

impl std::fmt::Display for RejectionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RejectionCategory {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseLabelError::new("rejection category", s))
    }
}

/// The final, normalized field set of a fully collected lead.
///
/// Produced by the intake state machine once every required field is
/// confirmed. This is the value handed to eligibility evaluation and
/// written verbatim (as JSON) into whichever ledger records the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadFields {
    pub full_name: String,
    /// Five-digit postal code.
    pub zip_code: String,
    /// Formatted as `(NNN) NNN-NNNN`.
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub vehicle_year: i32,
    pub vehicle_make: String,
    pub vehicle_model: String,
}

impl LeadFields {
    /// Returns the vehicle as a single display string, e.g. `2020 Yamaha Grizzly`.
    pub fn vehicle_label(&self) -> String {
        format!(
            "{} {} {}",
            self.vehicle_year, self.vehicle_make, self.vehicle_model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip() {
        for category in RejectionCategory::ALL {
            let parsed: RejectionCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert!("bogus".parse::<RejectionCategory>().is_err());
    }

    #[test]
    fn category_serializes_as_snake_case() {
        let json = serde_json::to_string(&RejectionCategory::VehicleAge).unwrap();
        assert_eq!(json, "\"vehicle_age\"");
    }

    #[test]
    fn channel_parse_rejects_unknown() {
        let err = "fax".parse::<Channel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown channel: fax");
    }

    #[test]
    fn lead_fields_omit_missing_email() {
        let fields = LeadFields {
            full_name: "Tim Fox".into(),
            zip_code: "30093".into(),
            phone: "(720) 555-1234".into(),
            email: None,
            vehicle_year: 2020,
            vehicle_make: "Yamaha".into(),
            vehicle_model: "Grizzly".into(),
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(fields.vehicle_label(), "2020 Yamaha Grizzly");
    }
}
