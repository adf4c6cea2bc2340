//! Eligibility rules for collected leads.
//!
//! Evaluation is pure and deterministic. Rules run in a fixed order and the
//! first failing rule decides the rejection category:
//!
//! 1. service area (excluded ZIP prefixes),
//! 2. make/model plausibility (cross-brand model dictionary),
//! 3. absolute exclusions, then category age cutoffs.
//!
//! Unknown makes and models pass rule 2 and have no age cutoff in rule 3.

pub mod catalog;
pub mod category;
pub mod service_area;

pub use catalog::canonical_make;
pub use category::{classify, VehicleClass};
pub use service_area::normalize_zip;

use leadline_types::{LeadFields, RejectionCategory};

/// Why a lead was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub category: RejectionCategory,
    /// Human-readable reason, stored in the rejected-leads ledger.
    pub reason: String,
}

impl Rejection {
    fn new(category: RejectionCategory, reason: impl Into<String>) -> Self {
        Self {
            category,
            reason: reason.into(),
        }
    }

    /// What the caller hears before the call ends.
    pub fn decline_message(&self) -> String {
        match self.category {
            RejectionCategory::ZipCode => format!(
                "I'm sorry, but we can't help with this one. {} Thank you for calling.",
                self.reason
            ),
            RejectionCategory::MakeModel => format!(
                "I'm sorry, {} If you'd like, call back and we can go over the vehicle again.",
                self.reason
            ),
            RejectionCategory::Electric | RejectionCategory::Slingshot => format!(
                "Thanks for telling me about it. {} We appreciate you thinking of us.",
                self.reason
            ),
            RejectionCategory::VehicleAge => format!(
                "Thanks for the details. {} If you have a newer vehicle, we'd love to hear from you.",
                self.reason
            ),
        }
    }
}

/// Outcome of evaluating a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible)
    }
}

/// Evaluates a fully collected lead against every rule.
pub fn evaluate(lead: &LeadFields) -> Verdict {
    match check_service_area(&lead.zip_code)
        .and_then(|()| check_make_model(&lead.vehicle_make, &lead.vehicle_model))
        .and_then(|()| {
            check_vehicle(lead.vehicle_year, &lead.vehicle_make, &lead.vehicle_model)
        }) {
        Ok(()) => Verdict::Eligible,
        Err(rejection) => Verdict::Rejected(rejection),
    }
}

/// Rejects postal codes inside an excluded region.
pub fn check_service_area(zip: &str) -> Result<(), Rejection> {
    let zip = normalize_zip(zip).ok_or_else(|| {
        Rejection::new(
            RejectionCategory::ZipCode,
            "ZIP code must be exactly 5 digits.",
        )
    })?;
    match service_area::excluded_region(&zip) {
        Some(region) => Err(Rejection::new(
            RejectionCategory::ZipCode,
            format!(
                "We don't currently service {region}. We only service the continental United States."
            ),
        )),
        None => Ok(()),
    }
}

/// Rejects a known model declared under a different known make.
pub fn check_make_model(make: &str, model: &str) -> Result<(), Rejection> {
    let Some(declared) = canonical_make(make) else {
        return Ok(());
    };
    let owners = catalog::model_owners(model);
    if owners.is_empty() || owners.contains(&declared) {
        return Ok(());
    }
    Err(Rejection::new(
        RejectionCategory::MakeModel,
        format!(
            "the {model} is a {} model, not a {declared}.",
            owners.join(" or ")
        ),
    ))
}

/// Applies absolute exclusions and then the class age cutoff.
pub fn check_vehicle(year: i32, make: &str, model: &str) -> Result<(), Rejection> {
    if let Some((category, reason)) = category::absolute_exclusion(make, model) {
        return Err(Rejection::new(category, reason));
    }
    let class = classify(make, model);
    match class.cutoff_year() {
        Some(cutoff) if year <= cutoff => Err(Rejection::new(
            RejectionCategory::VehicleAge,
            format!(
                "We don't currently purchase {} from {year} and older.",
                class.plural()
            ),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(zip: &str, year: i32, make: &str, model: &str) -> LeadFields {
        LeadFields {
            full_name: "Tim Fox".into(),
            zip_code: zip.into(),
            phone: "(720) 555-1234".into(),
            email: None,
            vehicle_year: year,
            vehicle_make: make.into(),
            vehicle_model: model.into(),
        }
    }

    fn category_of(verdict: Verdict) -> RejectionCategory {
        match verdict {
            Verdict::Rejected(r) => r.category,
            Verdict::Eligible => panic!("expected a rejection"),
        }
    }

    #[test]
    fn accepted_lead_is_eligible() {
        assert!(evaluate(&lead("30093", 2020, "Yamaha", "Grizzly")).is_eligible());
    }

    #[test]
    fn zip_plus_four_passes_service_area() {
        assert!(evaluate(&lead("30093-1234", 2020, "Yamaha", "Grizzly")).is_eligible());
    }

    #[test]
    fn alaska_zip_is_rejected() {
        let verdict = evaluate(&lead("99501", 2020, "Yamaha", "Grizzly"));
        assert_eq!(category_of(verdict), RejectionCategory::ZipCode);
    }

    #[test]
    fn service_area_runs_before_vehicle_rules() {
        let verdict = evaluate(&lead("96801", 2023, "Zero", "SR/F"));
        assert_eq!(category_of(verdict), RejectionCategory::ZipCode);
    }

    #[test]
    fn electric_rejected_regardless_of_year() {
        let verdict = evaluate(&lead("30093", 2023, "Zero", "SR/F"));
        assert_eq!(category_of(verdict), RejectionCategory::Electric);
    }

    #[test]
    fn atv_cutoff_boundary() {
        let verdict = evaluate(&lead("30093", 2015, "Honda", "Rancher"));
        match verdict {
            Verdict::Rejected(r) => {
                assert_eq!(r.category, RejectionCategory::VehicleAge);
                assert_eq!(r.reason, "We don't currently purchase ATVs from 2015 and older.");
            }
            Verdict::Eligible => panic!("2015 Rancher should be rejected"),
        }
        assert!(evaluate(&lead("30093", 2016, "Honda", "Rancher")).is_eligible());
    }

    #[test]
    fn cruiser_and_side_by_side_cutoffs() {
        assert_eq!(
            category_of(evaluate(&lead("30093", 1999, "Harley", "Road King"))),
            RejectionCategory::VehicleAge
        );
        assert!(evaluate(&lead("30093", 2000, "Harley", "Road King")).is_eligible());
        assert_eq!(
            category_of(evaluate(&lead("30093", 2009, "Polaris", "RZR 800"))),
            RejectionCategory::VehicleAge
        );
        assert!(evaluate(&lead("30093", 2010, "Polaris", "RZR 800")).is_eligible());
    }

    #[test]
    fn cross_brand_model_is_rejected() {
        let verdict = evaluate(&lead("30093", 2020, "Yamaha", "Rancher"));
        assert_eq!(category_of(verdict), RejectionCategory::MakeModel);
    }

    #[test]
    fn bmw_boxers_are_not_mistaken_for_yamaha_sport_bikes() {
        assert!(evaluate(&lead("30093", 2018, "BMW", "R1200GS")).is_eligible());
        assert!(evaluate(&lead("30093", 2021, "BMW", "R1250GS")).is_eligible());
        assert!(evaluate(&lead("30093", 2020, "BMW", "R18")).is_eligible());
        let verdict = evaluate(&lead("30093", 2020, "Honda", "YZF-R1"));
        assert_eq!(category_of(verdict), RejectionCategory::MakeModel);
    }

    #[test]
    fn unknown_make_and_model_pass() {
        assert!(evaluate(&lead("30093", 1975, "Ural", "Gear Up")).is_eligible());
        assert!(evaluate(&lead("30093", 2020, "Yamaha", "Mystery 9000")).is_eligible());
    }

    #[test]
    fn decline_messages_differ_by_category() {
        let zip = Rejection::new(RejectionCategory::ZipCode, "x");
        let age = Rejection::new(RejectionCategory::VehicleAge, "x");
        assert_ne!(zip.decline_message(), age.decline_message());
    }
}
