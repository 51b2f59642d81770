//! URL-safe slugs for `Phase` (spec.md §6 "Analogous endpoints for system
//! design, effort, cost, value, financial model"): one parameterized route
//! per phase instead of five near-identical literal routes.

use casegen_case_store::Phase;

pub fn phase_from_slug(slug: &str) -> Option<Phase> {
    match slug {
        "prd" => Some(Phase::Prd),
        "system-design" => Some(Phase::SystemDesign),
        "effort" => Some(Phase::Effort),
        "cost" => Some(Phase::Cost),
        "value" => Some(Phase::Value),
        "financial" => Some(Phase::Financial),
        _ => None,
    }
}
