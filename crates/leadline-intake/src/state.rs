//! Per-field slot states and the single pending confirmation.

use crate::field::{Field, UnknownField};
use crate::normalize::{normalize, parse_confirmation, parse_vehicle, ValidationError};
use leadline_types::LeadFields;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Pseudo field name the engine uses to report a yes/no answer.
pub const CONFIRMATION_FIELD: &str = "confirmation";
/// Pseudo field name for a one-line vehicle description.
pub const VEHICLE_FIELD: &str = "vehicle";

/// Where a candidate value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Spoken by the caller.
    Caller,
    /// Taken from the incoming caller number.
    CallerId,
}

/// A normalized value waiting to be confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub value: String,
    pub origin: Origin,
}

/// State of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "candidate", rename_all = "snake_case")]
pub enum Slot {
    #[default]
    Unset,
    /// Heard while another confirmation was outstanding.
    Extracted(Candidate),
    /// Being read back to the caller.
    PendingConfirm(Candidate),
    Confirmed(String),
}

static UNSET: Slot = Slot::Unset;

impl Slot {
    pub fn value(&self) -> Option<&str> {
        match self {
            Slot::Unset => None,
            Slot::Extracted(c) | Slot::PendingConfirm(c) => Some(&c.value),
            Slot::Confirmed(v) => Some(v),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Slot::Confirmed(_))
    }
}

/// The one outstanding read-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Fields read back together, in canonical order.
    pub fields: Vec<Field>,
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
    #[error("there is nothing waiting for confirmation")]
    NothingToConfirm,
    #[error("answer was neither yes nor no: {0}")]
    UnclearConfirmation(String),
}

impl IntakeError {
    /// What the engine should say next after this error.
    pub fn reprompt(&self) -> String {
        match self {
            IntakeError::Validation(e) => e.reprompt(),
            IntakeError::UnknownField(e) => {
                format!("Field {} is not collected. Ask for the next field instead.", e.0)
            }
            IntakeError::NothingToConfirm => {
                "There was nothing to confirm. Continue with the next question.".to_string()
            }
            IntakeError::UnclearConfirmation(_) => {
                "Sorry, I didn't catch that. Could you answer yes or no?".to_string()
            }
        }
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Every value matched what was already held.
    Unchanged,
    /// New or corrected values were recorded.
    Saved(Vec<Field>),
    Confirmed(Vec<Field>),
    Denied(Vec<Field>),
}

impl SaveOutcome {
    /// Fields whose state changed.
    pub fn fields(&self) -> &[Field] {
        match self {
            SaveOutcome::Unchanged => &[],
            SaveOutcome::Saved(f) | SaveOutcome::Confirmed(f) | SaveOutcome::Denied(f) => f,
        }
    }
}

/// Slot-filling state for one conversation.
///
/// Serialized as the `state_json` column of the session row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntakeState {
    #[serde(default)]
    slots: BTreeMap<Field, Slot>,
    #[serde(default)]
    pending: Option<PendingConfirmation>,
}

impl IntakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, field: Field) -> &Slot {
        self.slots.get(&field).unwrap_or(&UNSET)
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    /// Applies a structured call from the engine.
    ///
    /// `name` is a field name, [`VEHICLE_FIELD`], or [`CONFIRMATION_FIELD`].
    pub fn apply(&mut self, name: &str, value: &str) -> Result<SaveOutcome, IntakeError> {
        match name.trim().to_ascii_lowercase().as_str() {
            CONFIRMATION_FIELD => match parse_confirmation(value) {
                Some(answer) => self.confirm(answer),
                None => Err(IntakeError::UnclearConfirmation(value.to_string())),
            },
            VEHICLE_FIELD => self.save_vehicle(value),
            _ => {
                let field: Field = name.parse()?;
                self.save(field, value, Origin::Caller)
            }
        }
    }

    /// Validates and stages one field value.
    pub fn save(
        &mut self,
        field: Field,
        raw: &str,
        origin: Origin,
    ) -> Result<SaveOutcome, IntakeError> {
        let value = normalize(field, raw)?;
        Ok(self.stage(vec![(field, value)], origin))
    }

    /// Stages year, make, and model from one description under one read-back.
    pub fn save_vehicle(&mut self, raw: &str) -> Result<SaveOutcome, IntakeError> {
        let vehicle = parse_vehicle(raw)?;
        Ok(self.stage(
            vec![
                (Field::VehicleYear, vehicle.year.to_string()),
                (Field::VehicleMake, vehicle.make),
                (Field::VehicleModel, vehicle.model),
            ],
            Origin::Caller,
        ))
    }

    fn stage(&mut self, values: Vec<(Field, String)>, origin: Origin) -> SaveOutcome {
        let opens_confirmation = self.pending.is_none();
        let mut changed = Vec::new();

        for (field, value) in values {
            if self.slot(field).value() == Some(value.as_str()) {
                continue;
            }
            let candidate = Candidate { value, origin };
            let already_pending = self
                .pending
                .as_ref()
                .is_some_and(|p| p.fields.contains(&field));

            if opens_confirmation || already_pending {
                // A replaced pending value is read back again; the old one is gone.
                self.slots.insert(field, Slot::PendingConfirm(candidate));
                let pending = self.pending.get_or_insert_with(|| PendingConfirmation {
                    fields: Vec::new(),
                    origin,
                });
                if !pending.fields.contains(&field) {
                    pending.fields.push(field);
                    pending.fields.sort();
                }
                pending.origin = origin;
            } else {
                self.slots.insert(field, Slot::Extracted(candidate));
            }
            changed.push(field);
        }

        if changed.is_empty() {
            SaveOutcome::Unchanged
        } else {
            SaveOutcome::Saved(changed)
        }
    }

    /// Resolves the pending read-back with the caller's answer.
    ///
    /// Afterwards the earliest extracted field, if any, becomes pending.
    pub fn confirm(&mut self, affirmative: bool) -> Result<SaveOutcome, IntakeError> {
        let pending = self.pending.take().ok_or(IntakeError::NothingToConfirm)?;

        for field in &pending.fields {
            let next = match self.slots.remove(field) {
                Some(Slot::PendingConfirm(c)) if affirmative => Slot::Confirmed(c.value),
                _ => Slot::Unset,
            };
            if next != Slot::Unset {
                self.slots.insert(*field, next);
            }
        }

        self.promote_next_extracted();

        Ok(if affirmative {
            SaveOutcome::Confirmed(pending.fields)
        } else {
            SaveOutcome::Denied(pending.fields)
        })
    }

    fn promote_next_extracted(&mut self) {
        let next = Field::ALL
            .into_iter()
            .find(|f| matches!(self.slot(*f), Slot::Extracted(_)));
        if let Some(field) = next {
            if let Some(Slot::Extracted(candidate)) = self.slots.remove(&field) {
                let origin = candidate.origin;
                self.slots.insert(field, Slot::PendingConfirm(candidate));
                self.pending = Some(PendingConfirmation {
                    fields: vec![field],
                    origin,
                });
            }
        }
    }

    /// Earliest required field with no value at all.
    pub fn next_field(&self) -> Option<Field> {
        Field::REQUIRED
            .into_iter()
            .find(|f| *self.slot(*f) == Slot::Unset)
    }

    /// Whether every required field is confirmed.
    pub fn is_complete(&self) -> bool {
        Field::REQUIRED.iter().all(|f| self.slot(*f).is_confirmed())
    }

    fn confirmed(&self, field: Field) -> Option<&str> {
        match self.slot(field) {
            Slot::Confirmed(v) => Some(v),
            _ => None,
        }
    }

    /// The final lead, once every required field is confirmed.
    pub fn lead_fields(&self) -> Option<LeadFields> {
        Some(LeadFields {
            full_name: self.confirmed(Field::FullName)?.to_string(),
            zip_code: self.confirmed(Field::ZipCode)?.to_string(),
            phone: self.confirmed(Field::Phone)?.to_string(),
            email: self.confirmed(Field::Email).map(str::to_string),
            vehicle_year: self.confirmed(Field::VehicleYear)?.parse().ok()?,
            vehicle_make: self.confirmed(Field::VehicleMake)?.to_string(),
            vehicle_model: self.confirmed(Field::VehicleModel)?.to_string(),
        })
    }

    /// Plain `field -> value` map of every field holding a value.
    pub fn values(&self) -> BTreeMap<Field, String> {
        self.slots
            .iter()
            .filter_map(|(f, s)| s.value().map(|v| (*f, v.to_string())))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
