use thiserror::Error;

/// Errors surfaced by the case store's persistence contract (spec.md §4.1).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("case {0} already exists")]
    Conflict(String),

    #[error("case {0} not found")]
    NotFound(String),

    #[error("expected version {expected} but case {case_id} is at version {actual}")]
    ConcurrencyConflict {
        case_id: String,
        expected: u64,
        actual: u64,
    },
}

/// Errors surfaced when an artifact fails its §3 invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("effort estimate: total_hours {total} does not equal sum of role hours {sum}")]
    EffortHoursMismatch { total: u64, sum: u64 },

    #[error("effort estimate: duration_weeks must be >= 1, got {0}")]
    DurationTooShort(u32),

    #[error("cost estimate: role '{role}' is not present in rate card {rate_card_id}")]
    RoleMissingFromRateCard { role: String, rate_card_id: String },

    #[error("cost estimate: total_cost for role '{role}' is {actual} cents, expected {expected} cents")]
    TotalCostMismatch {
        role: String,
        expected: i64,
        actual: i64,
    },

    #[error("cost estimate: estimated_cost is {actual} cents, expected sum of line items {expected} cents")]
    EstimatedCostMismatch { expected: i64, actual: i64 },

    #[error("value projection: scenario '{0:?}' is missing")]
    ScenarioMissing(crate::model::ScenarioCase),

    #[error("value projection: scenario '{0:?}' is duplicated")]
    ScenarioDuplicated(crate::model::ScenarioCase),

    #[error("value projection: scenarios are not ordered Low <= Base <= High ({low} / {base} / {high})")]
    ScenariosNotMonotone { low: i64, base: i64, high: i64 },

    #[error("financial summary: net_value_base {actual} does not equal value - cost ({expected})")]
    NetValueMismatch { expected: i64, actual: i64 },

    #[error("financial summary: roi_percentage_base {actual} does not match 100 * net / cost ({expected})")]
    RoiMismatch { expected: f64, actual: f64 },

    #[error("markdown content must not be empty")]
    EmptyMarkdown,
}
