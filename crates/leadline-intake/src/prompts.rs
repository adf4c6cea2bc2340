//! What the engine should say next, derived from the slot state.

use crate::field::Field;
use crate::state::{IntakeState, Origin, Slot};

/// The next conversational move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guidance {
    /// Read a pending value back and wait for yes or no.
    Confirm { fields: Vec<Field>, prompt: String },
    /// Ask for the next missing field.
    Ask { field: Field, prompt: String },
    /// Everything is confirmed; call `submit_lead`.
    Submit,
}

impl Guidance {
    pub fn prompt(&self) -> &str {
        match self {
            Guidance::Confirm { prompt, .. } | Guidance::Ask { prompt, .. } => prompt,
            Guidance::Submit => "All details are confirmed. Call submit_lead now.",
        }
    }

    /// The field being asked about or confirmed, for `last_prompt_field`.
    pub fn field(&self) -> Option<Field> {
        match self {
            Guidance::Confirm { fields, .. } => fields.first().copied(),
            Guidance::Ask { field, .. } => Some(*field),
            Guidance::Submit => None,
        }
    }
}

/// Reads digits one at a time so the caller can check them.
fn spell_digits(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_digit)
        .map(String::from)
        .collect::<Vec<_>>()
        .join(" ")
}

fn readback(state: &IntakeState, fields: &[Field], origin: Origin) -> String {
    let value = |f: Field| state.slot(f).value().unwrap_or_default().to_string();

    let vehicle = [Field::VehicleYear, Field::VehicleMake, Field::VehicleModel];
    if fields.len() > 1 && fields.iter().all(|f| vehicle.contains(f)) {
        let described: Vec<String> = vehicle
            .iter()
            .filter(|f| fields.contains(*f))
            .map(|f| value(*f))
            .collect();
        return format!("Just to confirm, that's a {}?", described.join(" "));
    }

    match fields {
        [Field::FullName] => format!("I have your name as {}. Is that right?", value(Field::FullName)),
        [Field::ZipCode] => format!(
            "I have your ZIP code as {}. Is that correct?",
            spell_digits(&value(Field::ZipCode))
        ),
        [Field::Phone] if origin == Origin::CallerId => format!(
            "Is {}, the number you're calling from, the best number to reach you?",
            value(Field::Phone)
        ),
        [Field::Phone] => format!(
            "I have your phone number as {}. Is that correct?",
            value(Field::Phone)
        ),
        [Field::Email] => format!("I have your email as {}. Is that correct?", value(Field::Email)),
        [Field::VehicleYear] => format!("The year is {}, correct?", value(Field::VehicleYear)),
        [Field::VehicleMake] => format!("The make is {}, correct?", value(Field::VehicleMake)),
        [Field::VehicleModel] => format!("The model is {}, correct?", value(Field::VehicleModel)),
        _ => {
            let parts: Vec<String> = fields
                .iter()
                .map(|f| format!("{} {}", f.spoken_name(), value(*f)))
                .collect();
            format!("I have {}. Is that all correct?", parts.join(", "))
        }
    }
}

impl IntakeState {
    /// The next thing the engine should say.
    pub fn guidance(&self) -> Guidance {
        if let Some(pending) = self.pending() {
            return Guidance::Confirm {
                fields: pending.fields.clone(),
                prompt: readback(self, &pending.fields, pending.origin),
            };
        }
        if let Some(field) = self.next_field() {
            return Guidance::Ask {
                field,
                prompt: field.question().to_string(),
            };
        }
        // Required fields may still hold extracted values during a correction.
        match Field::REQUIRED
            .into_iter()
            .find(|f| !matches!(self.slot(*f), Slot::Confirmed(_)))
        {
            Some(field) => Guidance::Ask {
                field,
                prompt: field.question().to_string(),
            },
            None => Guidance::Submit,
        }
    }
}
