//! Vehicle classification, absolute exclusions, and age cutoffs.

use crate::catalog::{canonical_make, compact, has_any_keyword, has_keyword};
use leadline_types::RejectionCategory;

const SIDE_BY_SIDE_MODELS: &[&str] = &[
    "rzr", "maverick", "rhino", "teryx", "ranger", "mule", "gator", "pioneer", "viking",
    "wolverine", "prowler", "wildcat",
];
const ATV_MODELS: &[&str] = &[
    "rancher", "grizzly", "sportsman", "outlander", "kodiak", "foreman", "rubicon", "kingquad",
    "bruteforce", "renegade",
];
const DIRT_BIKE_MODELS: &[&str] = &["crf", "yz", "kx", "rm", "rmz", "sx", "exc", "xc", "mx"];
const SCOOTER_MODELS: &[&str] = &["metropolitan", "zuma", "vespa", "ruckus", "scoopy", "pcx"];
const SPORT_MODELS: &[&str] = &["cbr", "r1", "r6", "ninja", "gsxr"];

const CRUISER_MAKES: &[&str] = &["Harley-Davidson", "Indian", "Victory"];
const METRIC_MAKES: &[&str] = &[
    "Honda", "Yamaha", "Kawasaki", "Suzuki", "Ducati", "BMW", "Triumph", "KTM",
];
const ELECTRIC_MAKES: &[&str] = &["Zero", "LiveWire"];

/// The class a vehicle is sorted into for age cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleClass {
    SideBySide,
    Atv,
    DirtBike,
    Scooter,
    Cruiser,
    SportBike,
    Metric,
    Unknown,
}

impl VehicleClass {
    /// Newest model year that is still too old to buy, if any.
    pub fn cutoff_year(self) -> Option<i32> {
        match self {
            Self::Cruiser => Some(1999),
            Self::SportBike | Self::Metric => Some(2005),
            Self::SideBySide => Some(2009),
            Self::Atv | Self::DirtBike | Self::Scooter => Some(2015),
            Self::Unknown => None,
        }
    }

    /// Plural noun used in decline messages.
    pub fn plural(self) -> &'static str {
        match self {
            Self::SideBySide => "side-by-sides",
            Self::Atv => "ATVs",
            Self::DirtBike => "dirt bikes",
            Self::Scooter => "scooters",
            Self::Cruiser => "domestic cruisers",
            Self::SportBike | Self::Metric => "metric motorcycles",
            Self::Unknown => "vehicles",
        }
    }
}

/// Sorts a vehicle into its class.
///
/// Model keywords outrank the make, so a Honda Rancher is an ATV rather
/// than a metric motorcycle.
pub fn classify(make: &str, model: &str) -> VehicleClass {
    let canonical = canonical_make(make);

    if has_any_keyword(model, SIDE_BY_SIDE_MODELS) {
        VehicleClass::SideBySide
    } else if has_any_keyword(model, ATV_MODELS) {
        VehicleClass::Atv
    } else if has_any_keyword(model, DIRT_BIKE_MODELS) {
        VehicleClass::DirtBike
    } else if has_any_keyword(model, SCOOTER_MODELS) || canonical == Some("Vespa") {
        VehicleClass::Scooter
    } else if canonical.is_some_and(|m| CRUISER_MAKES.contains(&m)) {
        VehicleClass::Cruiser
    } else if has_any_keyword(model, SPORT_MODELS) {
        VehicleClass::SportBike
    } else if canonical.is_some_and(|m| METRIC_MAKES.contains(&m)) {
        VehicleClass::Metric
    } else {
        VehicleClass::Unknown
    }
}

/// Vehicles rejected regardless of year, with the rejection category.
pub fn absolute_exclusion(make: &str, model: &str) -> Option<(RejectionCategory, &'static str)> {
    let canonical = canonical_make(make);
    let make_compact = compact(make);

    let electric = canonical.is_some_and(|m| ELECTRIC_MAKES.contains(&m))
        || make_compact.contains("livewire")
        || has_keyword(model, "zero")
        || has_keyword(model, "livewire");
    if electric {
        return Some((
            RejectionCategory::Electric,
            "We don't currently purchase electric motorcycles.",
        ));
    }

    if make_compact.contains("slingshot") || has_keyword(model, "slingshot") {
        return Some((
            RejectionCategory::Slingshot,
            "We are not interested in that unit.",
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_examples() {
        assert_eq!(classify("Yamaha", "Grizzly"), VehicleClass::Atv);
        assert_eq!(classify("Honda", "Rancher 420"), VehicleClass::Atv);
        assert_eq!(classify("Polaris", "RZR XP 1000"), VehicleClass::SideBySide);
        assert_eq!(classify("Honda", "CRF450R"), VehicleClass::DirtBike);
        assert_eq!(classify("Vespa", "Primavera"), VehicleClass::Scooter);
        assert_eq!(classify("Harley", "Road King"), VehicleClass::Cruiser);
        assert_eq!(classify("Kawasaki", "Ninja 650"), VehicleClass::SportBike);
        assert_eq!(classify("Ducati", "Monster"), VehicleClass::Metric);
        assert_eq!(classify("Ural", "Gear Up"), VehicleClass::Unknown);
    }

    #[test]
    fn exclusions_ignore_year() {
        let (category, _) = absolute_exclusion("Zero", "SR/F").unwrap();
        assert_eq!(category, RejectionCategory::Electric);
        let (category, _) = absolute_exclusion("Harley-Davidson", "LiveWire One").unwrap();
        assert_eq!(category, RejectionCategory::Electric);
        let (category, _) = absolute_exclusion("Polaris", "Slingshot SL").unwrap();
        assert_eq!(category, RejectionCategory::Slingshot);
        assert!(absolute_exclusion("Yamaha", "Grizzly").is_none());
    }

    #[test]
    fn unknown_has_no_cutoff() {
        assert_eq!(VehicleClass::Unknown.cutoff_year(), None);
        assert_eq!(VehicleClass::Atv.cutoff_year(), Some(2015));
    }
}
