//! The collected field set and its canonical order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single lead field.
///
/// Declaration order is the canonical question order; `Email` is optional
/// and only recorded when the caller volunteers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FullName,
    ZipCode,
    Phone,
    VehicleYear,
    VehicleMake,
    VehicleModel,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field: {0}")]
pub struct UnknownField(pub String);

impl Field {
    /// Required fields in the order they are asked for.
    pub const REQUIRED: [Field; 6] = [
        Field::FullName,
        Field::ZipCode,
        Field::Phone,
        Field::VehicleYear,
        Field::VehicleMake,
        Field::VehicleModel,
    ];

    pub const ALL: [Field; 7] = [
        Field::FullName,
        Field::ZipCode,
        Field::Phone,
        Field::VehicleYear,
        Field::VehicleMake,
        Field::VehicleModel,
        Field::Email,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::ZipCode => "zip_code",
            Self::Phone => "phone",
            Self::VehicleYear => "vehicle_year",
            Self::VehicleMake => "vehicle_make",
            Self::VehicleModel => "vehicle_model",
            Self::Email => "email",
        }
    }

    pub fn is_required(self) -> bool {
        self != Self::Email
    }

    /// The question asked when this field is next.
    pub fn question(self) -> &'static str {
        match self {
            Self::FullName => "What's your full name?",
            Self::ZipCode => "What's the ZIP code where the vehicle is located?",
            Self::Phone => "What's the best phone number to reach you?",
            Self::VehicleYear => "What year is the vehicle?",
            Self::VehicleMake => "What make is it?",
            Self::VehicleModel => "And what model is it?",
            Self::Email => "What's a good email address for you?",
        }
    }

    /// Short spoken noun for the field, e.g. "ZIP code".
    pub fn spoken_name(self) -> &'static str {
        match self {
            Self::FullName => "name",
            Self::ZipCode => "ZIP code",
            Self::Phone => "phone number",
            Self::VehicleYear => "vehicle year",
            Self::VehicleMake => "make",
            Self::VehicleModel => "model",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let field = match key.as_str() {
            "full_name" | "name" => Self::FullName,
            "zip_code" | "zip" | "postal_code" => Self::ZipCode,
            "phone" | "phone_number" => Self::Phone,
            "vehicle_year" | "year" => Self::VehicleYear,
            "vehicle_make" | "make" => Self::VehicleMake,
            "vehicle_model" | "model" => Self::VehicleModel,
            "email" => Self::Email,
            _ => return Err(UnknownField(s.to_string())),
        };
        Ok(field)
    }
}
