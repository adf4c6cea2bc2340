//! Assistant instructions and the function schema offered to the engine.

use leadline_intake::{Field, CONFIRMATION_FIELD, VEHICLE_FIELD};
use leadline_voice::ToolSpec;
use serde_json::json;

pub const SAVE_FIELD: &str = "save_field";
pub const SUBMIT_LEAD: &str = "submit_lead";

pub const DEFAULT_INSTRUCTIONS: &str = "\
You are a friendly phone assistant for National Powersport Buyers, where we make selling your \
powersport vehicle stress free.

Start by saying: \"Thank you for calling National Powersport Buyers. I'm an AI assistant and I'll \
start the process of selling your vehicle.\"

Collect, one question at a time: full name, ZIP code, phone number, vehicle year, make, and \
model. An email address is optional.

Every time the caller gives you a value, call save_field right away and follow the `next` \
instruction in the result exactly. When the result asks you to confirm a value, read it back and \
report the caller's yes or no answer with save_field using field_name \"confirmation\". If the \
caller describes the whole vehicle at once, save it with field_name \"vehicle\".

If save_field returns success false, say the `reprompt` text and ask again.

When the result says everything is confirmed, call submit_lead and then say the returned \
`message` word for word. Do not say goodbye any other way.";

/// Functions the engine may call during an intake call.
pub fn intake_tools() -> Vec<ToolSpec> {
    let mut names: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
    names.push(VEHICLE_FIELD);
    names.push(CONFIRMATION_FIELD);

    vec![
        ToolSpec {
            name: SAVE_FIELD.to_string(),
            description: "Save one value the caller provided, or their yes/no answer to a \
                          read-back."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "field_name": { "type": "string", "enum": names },
                    "field_value": { "type": "string" },
                },
                "required": ["field_name", "field_value"],
            }),
        },
        ToolSpec {
            name: SUBMIT_LEAD.to_string(),
            description: "Submit the lead once every required field is confirmed.".to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_field_offers_every_field_plus_vehicle_and_confirmation() {
        let tools = intake_tools();
        assert_eq!(tools.len(), 2);
        let names = tools[0].parameters["properties"]["field_name"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(names.len(), Field::ALL.len() + 2);
        assert!(names.iter().any(|n| n == "zip_code"));
        assert!(names.iter().any(|n| n == "confirmation"));
        assert_eq!(tools[1].name, SUBMIT_LEAD);
    }
}
