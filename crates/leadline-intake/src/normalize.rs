//! Per-field validators and normalizers.
//!
//! Each normalizer takes the text the speech engine heard and either returns
//! the canonical stored form or a [`ValidationError`] whose message is
//! phrased so it can be read back to the caller.

use crate::field::Field;
use chrono::Datelike;
use leadline_eligibility::{canonical_make, normalize_zip};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());
static SPOKEN_AT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+at\s+").unwrap());
static SPOKEN_DOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+dot\s+").unwrap());
static SPOKEN_DASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+(dash|hyphen)\s+").unwrap());
static SPOKEN_UNDERSCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+underscore\s+").unwrap());

/// Bare mail domains completed with `.com`.
const COMMON_DOMAINS: &[&str] = &[
    "gmail",
    "yahoo",
    "hotmail",
    "outlook",
    "icloud",
    "aol",
    "protonmail",
    "msn",
];

const OLDEST_YEAR: i32 = 1950;
const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

/// A field value that failed its format checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    /// Caller-facing explanation, lowercase, no trailing punctuation.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// A field-targeted re-ask for the caller.
    pub fn reprompt(&self) -> String {
        format!(
            "Sorry, {}. Could you give me your {} again?",
            self.message,
            self.field.spoken_name()
        )
    }
}

/// Normalizes a raw value for the given field.
pub fn normalize(field: Field, raw: &str) -> Result<String, ValidationError> {
    match field {
        Field::FullName => normalize_name(raw),
        Field::ZipCode => normalize_zip_code(raw),
        Field::Phone => normalize_phone(raw),
        Field::VehicleYear => normalize_year(raw).map(|y| y.to_string()),
        Field::VehicleMake => normalize_make(raw),
        Field::VehicleModel => normalize_model(raw),
        Field::Email => normalize_email(raw),
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Title-cases words typed entirely in one case; mixed-case words are kept.
fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let alpha_only = word.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-');
            let one_case = word == word.to_lowercase() || word == word.to_uppercase();
            if alpha_only && one_case {
                word.split('-').map(capitalize).collect::<Vec<_>>().join("-")
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_name(raw: &str) -> Result<String, ValidationError> {
    let name = collapse_whitespace(raw);
    if name.is_empty() {
        return Err(ValidationError::new(Field::FullName, "I didn't catch your name"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::new(Field::FullName, "that name is too long"));
    }
    let allowed = name
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.'));
    if !allowed || !name.chars().any(char::is_alphabetic) {
        return Err(ValidationError::new(
            Field::FullName,
            "that doesn't sound like a name",
        ));
    }
    Ok(title_case(&name))
}

pub fn normalize_zip_code(raw: &str) -> Result<String, ValidationError> {
    normalize_zip(raw).ok_or_else(|| {
        ValidationError::new(Field::ZipCode, "a ZIP code should be five digits")
    })
}

/// Replaces spoken digit words with digits ("seven two oh" becomes "720").
fn spoken_digits(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .map(|word| match word.to_ascii_lowercase().as_str() {
            "zero" | "oh" | "o" => "0".to_string(),
            "one" => "1".to_string(),
            "two" => "2".to_string(),
            "three" => "3".to_string(),
            "four" => "4".to_string(),
            "five" => "5".to_string(),
            "six" => "6".to_string(),
            "seven" => "7".to_string(),
            "eight" => "8".to_string(),
            "nine" => "9".to_string(),
            _ => word.to_string(),
        })
        .collect()
}

/// Formats a US number as `(NNN) NNN-NNNN` after North American numbering checks.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let invalid = |msg: &str| ValidationError::new(Field::Phone, msg);
    let mut digits: String = spoken_digits(raw)
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    if digits.is_empty() {
        return Err(invalid("I didn't catch a phone number"));
    }
    if digits.len() == 11 {
        if !digits.starts_with('1') {
            return Err(invalid("an eleven digit number has to start with one"));
        }
        digits.remove(0);
    }
    if digits.len() != 10 {
        return Err(ValidationError::new(
            Field::Phone,
            format!("a phone number needs ten digits and I heard {}", digits.len()),
        ));
    }

    let bytes = digits.as_bytes();
    if matches!(bytes[0], b'0' | b'1') {
        return Err(invalid("an area code can't start with zero or one"));
    }
    // 555 numbers are fictional and skip the exchange check.
    if &digits[..3] != "555" && matches!(bytes[3], b'0' | b'1') {
        return Err(invalid("that exchange can't start with zero or one"));
    }
    if bytes.iter().all(|b| *b == bytes[0]) {
        return Err(invalid("that number doesn't look valid"));
    }

    Ok(format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]))
}

/// Extracts a model year between 1950 and next year.
pub fn normalize_year(raw: &str) -> Result<i32, ValidationError> {
    let invalid = |msg: String| ValidationError::new(Field::VehicleYear, msg);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("I didn't catch the vehicle year".into()));
    }

    let year: i32 = match YEAR_RE.captures(trimmed) {
        Some(caps) => caps[1].parse().map_err(|_| {
            invalid("the vehicle year should be a number like 2020 or 1999".into())
        })?,
        None => match trimmed.parse::<i32>() {
            Ok(n) if (1000..=9999).contains(&n) => n,
            Ok(_) => return Err(invalid("the vehicle year should be a four digit year".into())),
            Err(_) => {
                return Err(invalid(
                    "the vehicle year should be a number like 2020 or 1999".into(),
                ))
            }
        },
    };

    let max_year = chrono::Utc::now().year() + 1;
    if year < OLDEST_YEAR {
        return Err(invalid(format!(
            "that year seems too old, we handle vehicles from {OLDEST_YEAR} onwards"
        )));
    }
    if year > max_year {
        return Err(invalid(format!(
            "the vehicle year can't be later than {max_year}"
        )));
    }
    Ok(year)
}

pub fn normalize_make(raw: &str) -> Result<String, ValidationError> {
    let make = collapse_whitespace(raw);
    if make.is_empty() {
        return Err(ValidationError::new(Field::VehicleMake, "I didn't catch the make"));
    }
    Ok(canonical_make(&make)
        .map(str::to_string)
        .unwrap_or_else(|| title_case(&make)))
}

pub fn normalize_model(raw: &str) -> Result<String, ValidationError> {
    let model = collapse_whitespace(raw);
    if model.is_empty() {
        return Err(ValidationError::new(Field::VehicleModel, "I didn't catch the model"));
    }
    Ok(title_case(&model))
}

/// Turns a transcribed address ("tfox at yahoo dot com") into `tfox@yahoo.com`.
pub fn normalize_transcribed_email(raw: &str) -> String {
    let text = format!(" {} ", raw.trim().to_lowercase());
    let text = SPOKEN_AT_RE.replace_all(&text, "@");
    let text = SPOKEN_DOT_RE.replace_all(&text, ".");
    let text = SPOKEN_DASH_RE.replace_all(&text, "-");
    let text = SPOKEN_UNDERSCORE_RE.replace_all(&text, "_");
    let mut text: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    let bare_domain = text
        .split_once('@')
        .is_some_and(|(_, domain)| COMMON_DOMAINS.contains(&domain));
    if bare_domain {
        text.push_str(".com");
    }
    text
}

pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let invalid = |msg: &str| ValidationError::new(Field::Email, msg);
    let email = normalize_transcribed_email(raw);

    if email.is_empty() {
        return Err(invalid("I didn't catch your email address"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(invalid("that email address is too long"));
    }
    match email.matches('@').count() {
        0 => return Err(invalid("I didn't hear the 'at' in your email address")),
        1 => {}
        _ => return Err(invalid("I heard more than one 'at' in your email")),
    }
    if let Some((local, domain)) = email.split_once('@') {
        if local.is_empty() {
            return Err(invalid("I didn't hear the part before the 'at'"));
        }
        if domain.is_empty() {
            return Err(invalid("I didn't hear the domain after the 'at'"));
        }
        if !domain.contains('.') {
            return Err(invalid("the email domain needs a 'dot', like gmail dot com"));
        }
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(invalid("that email format doesn't look right"));
    }
    Ok(email)
}

/// A vehicle described in one utterance, e.g. "2020 Yamaha Grizzly".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleDescription {
    pub year: i32,
    pub make: String,
    pub model: String,
}

/// Splits a one-line vehicle description into year, make, and model.
///
/// The year may appear anywhere. The make is the longest leading run of up
/// to three words that names a known make, or else the first word.
pub fn parse_vehicle(raw: &str) -> Result<VehicleDescription, ValidationError> {
    let text = collapse_whitespace(raw);
    let Some(year_match) = YEAR_RE.find(&text) else {
        return Err(ValidationError::new(
            Field::VehicleYear,
            "I didn't catch the year of the vehicle",
        ));
    };
    let year = normalize_year(year_match.as_str())?;

    let rest = format!("{} {}", &text[..year_match.start()], &text[year_match.end()..]);
    let words: Vec<&str> = rest.split_whitespace().collect();
    if words.is_empty() {
        return Err(ValidationError::new(Field::VehicleMake, "I didn't catch the make"));
    }

    let make_len = (1..=words.len().min(3))
        .rev()
        .find(|n| canonical_make(&words[..*n].join(" ")).is_some())
        .unwrap_or(1);

    let make = normalize_make(&words[..make_len].join(" "))?;
    let model_words = &words[make_len..];
    if model_words.is_empty() {
        return Err(ValidationError::new(
            Field::VehicleModel,
            format!("I heard {make} but not the model"),
        ));
    }
    let model = normalize_model(&model_words.join(" "))?;

    Ok(VehicleDescription { year, make, model })
}

/// Reads a yes/no answer. Returns `None` when the answer is unclear.
pub fn parse_confirmation(raw: &str) -> Option<bool> {
    let answer = raw
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_ascii_lowercase();
    match answer.as_str() {
        "yes" | "y" | "yeah" | "yep" | "yup" | "correct" | "right" | "that's right"
        | "that is correct" | "sure" | "true" | "affirmative" | "ok" | "okay" => Some(true),
        "no" | "n" | "nope" | "nah" | "wrong" | "incorrect" | "false" | "that's wrong"
        | "negative" => Some(false),
        _ => None,
    }
}
