//! Canonical field mapping for the lead API create call.

use crate::api::LeadSubmission;
use crate::npa::LeadApiConfig;
use base64::Engine;
use serde::Serialize;

/// 1x1 transparent PNG sent when no photos were collected.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0xb5,
    0x1c, 0x0c, 0x02, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64,
    0x60, 0x00, 0x00, 0x00, 0x06, 0x00, 0x02, 0x30, 0x81, 0xd0, 0x2f, 0x00, 0x00, 0x00, 0x00,
    0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];
const PLACEHOLDER_IMAGE_NAME: &str = "placeholder.png";
const PLACEHOLDER_LAST_NAME: &str = "Unknown";
const DEFAULT_VIN: &str = "N/A";
const DEFAULT_MILES_HOURS: &str = "1";
const DEFAULT_ASKING_PRICE: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadImage {
    pub name: String,
    pub base64: String,
}

/// Request body of `POST /api/Lead/LeadCreate`.
///
/// No `Debug` impl: the body carries the API password.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPayload {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub state: String,
    pub zip: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: String,
    pub miles_hours: String,
    pub asking_price: i64,
    pub session_token: String,
    pub data_provider_dealer_token: String,
    pub gclid: String,
    pub resize_images: bool,
    pub is_financed: bool,
    pub ok_to_text: String,
    pub images: Vec<LeadImage>,
    pub additional_notes: String,
    pub lead_source: String,
}

/// Splits a full name into first and last parts.
///
/// Everything after the first word is the last name; a single word gets a
/// placeholder last name.
pub fn split_name(full_name: &str) -> (String, String) {
    let mut words = full_name.split_whitespace();
    let first = words.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = words.collect();
    let last = if rest.is_empty() {
        PLACEHOLDER_LAST_NAME.to_string()
    } else {
        rest.join(" ")
    };
    (first, last)
}

/// Address used when the caller gave no email, unique per phone number.
pub fn placeholder_email(submission: &LeadSubmission, domain: &str) -> String {
    let digits: String = submission
        .lead
        .phone
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    format!("{}+{digits}@{domain}", submission.channel.as_str())
}

fn notes(submission: &LeadSubmission) -> String {
    let lead = &submission.lead;
    format!(
        "Lead captured via {} intake (session {}). Vehicle: {}. ZIP: {}. Phone: {}.",
        submission.channel.as_str(),
        submission.session_id,
        lead.vehicle_label(),
        lead.zip_code,
        lead.phone
    )
}

pub fn build_payload(config: &LeadApiConfig, submission: &LeadSubmission) -> LeadPayload {
    let lead = &submission.lead;
    let (first_name, last_name) = split_name(&lead.full_name);
    let email = lead
        .email
        .clone()
        .unwrap_or_else(|| placeholder_email(submission, &config.placeholder_email_domain));

    LeadPayload {
        username: config.username.clone(),
        password: config.password.clone(),
        first_name,
        last_name,
        email,
        phone: lead.phone.clone(),
        state: String::new(),
        zip: lead.zip_code.clone(),
        make: lead.vehicle_make.clone(),
        model: lead.vehicle_model.clone(),
        year: lead.vehicle_year,
        vin: DEFAULT_VIN.to_string(),
        miles_hours: DEFAULT_MILES_HOURS.to_string(),
        asking_price: DEFAULT_ASKING_PRICE,
        session_token: String::new(),
        data_provider_dealer_token: String::new(),
        gclid: String::new(),
        resize_images: false,
        is_financed: false,
        ok_to_text: "true".to_string(),
        images: vec![LeadImage {
            name: PLACEHOLDER_IMAGE_NAME.to_string(),
            base64: base64::engine::general_purpose::STANDARD.encode(PLACEHOLDER_PNG),
        }],
        additional_notes: notes(submission),
        lead_source: config.lead_source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadline_types::{Channel, LeadFields};

    fn submission(email: Option<&str>, name: &str) -> LeadSubmission {
        LeadSubmission {
            session_id: 7,
            channel: Channel::Voice,
            lead: LeadFields {
                full_name: name.into(),
                zip_code: "30093".into(),
                phone: "(720) 555-1234".into(),
                email: email.map(str::to_string),
                vehicle_year: 2020,
                vehicle_make: "Yamaha".into(),
                vehicle_model: "Grizzly".into(),
            },
        }
    }

    #[test]
    fn names_split_on_first_word() {
        assert_eq!(split_name("Tim Fox"), ("Tim".into(), "Fox".into()));
        assert_eq!(split_name("Mary Jane Watson"), ("Mary".into(), "Jane Watson".into()));
        assert_eq!(split_name("Cher"), ("Cher".into(), "Unknown".into()));
    }

    #[test]
    fn payload_defaults_and_placeholders() {
        let config = LeadApiConfig {
            username: "user".into(),
            password: "pass".into(),
            lead_source: "IVR".into(),
            ..LeadApiConfig::default()
        };
        let payload = build_payload(&config, &submission(None, "Tim Fox"));
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["firstName"], "Tim");
        assert_eq!(json["lastName"], "Fox");
        assert_eq!(json["email"], "voice+7205551234@powersportbuyers.com");
        assert_eq!(json["zip"], "30093");
        assert_eq!(json["year"], 2020);
        assert_eq!(json["vin"], "N/A");
        assert_eq!(json["milesHours"], "1");
        assert_eq!(json["askingPrice"], 1);
        assert_eq!(json["okToText"], "true");
        assert_eq!(json["resizeImages"], false);
        assert_eq!(json["images"][0]["name"], "placeholder.png");
        assert!(json["images"][0]["base64"]
            .as_str()
            .unwrap()
            .starts_with("iVBORw0KGgo"));
        assert!(json["additionalNotes"].as_str().unwrap().contains("voice"));
        assert_eq!(json["leadSource"], "IVR");
    }

    #[test]
    fn caller_email_is_kept() {
        let payload = build_payload(
            &LeadApiConfig::default(),
            &submission(Some("tfox@yahoo.com"), "Tim Fox"),
        );
        assert_eq!(payload.email, "tfox@yahoo.com");
    }
}
