//! Case Store: core data model
//!
//! Case, HistoryEntry, and the six artifact shapes from spec.md §3. The Case
//! exclusively owns its artifacts and history; they are embedded, not shared.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Opaque, globally unique case identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseId(pub Uuid);

impl CaseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer-cents money type so artifact-invariant equalities are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl std::ops::Add for Cents {
    type Output = Cents;
    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Cents {
    type Output = Cents;
    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |a, b| a + b)
    }
}

/// System roles recognized by the workflow state machine (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Developer,
    TechnicalArchitect,
    FinanceApprover,
    SalesManagerApprover,
    FinalApprover,
    CaseInitiator,
}

/// One stage of the workflow, owning exactly one artifact kind (GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Prd,
    SystemDesign,
    Effort,
    Cost,
    Value,
    Financial,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Prd,
        Phase::SystemDesign,
        Phase::Effort,
        Phase::Cost,
        Phase::Value,
        Phase::Financial,
    ];

    /// Phase that the orchestrator chains into once this phase is approved
    /// (spec.md §4.7). `Financial` has no downstream chain target.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Prd => Some(Phase::SystemDesign),
            Phase::SystemDesign => Some(Phase::Effort),
            Phase::Effort => Some(Phase::Cost),
            Phase::Cost => Some(Phase::Value),
            Phase::Value => Some(Phase::Financial),
            Phase::Financial => None,
        }
    }
}

/// Status set (spec.md §4.2), grouped by phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Intake,

    PrdDrafting,
    PrdReview,
    PrdApproved,
    PrdRejected,

    SystemDesignDrafting,
    SystemDesignDrafted,
    SystemDesignPendingReview,
    SystemDesignApproved,
    SystemDesignRejected,

    PlanningInProgress,
    PlanningComplete,
    EffortPendingReview,
    EffortApproved,
    EffortRejected,

    CostingInProgress,
    CostingComplete,
    CostingPendingReview,
    CostingApproved,
    CostingRejected,

    ValueAnalysisInProgress,
    ValueAnalysisComplete,
    ValuePendingReview,
    ValueApproved,
    ValueRejected,

    FinancialModelInProgress,
    FinancialModelComplete,
    FinancialModelPendingReview,
    FinancialModelApproved,
    FinancialModelRejected,

    PendingFinalApproval,
    Approved,
    Rejected,
}

impl Status {
    /// Terminal statuses end the case lifecycle (spec.md §3 "Lifecycle").
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Approved | Status::Rejected)
    }
}

/// Origin of a history entry / event (spec.md §3 HistoryEntry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    User,
    Agent,
    System,
}

/// A single append-only history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub actor_user_id: Option<String>,
    pub actor_role: Option<Role>,
    pub source: Source,
    pub event_kind: String,
    pub from_status: Status,
    pub to_status: Status,
    pub message: Option<String>,
    pub artifact_ref: Option<Phase>,
}

/// A named link attached to a case (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevantLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ScenarioCase {
    Low,
    Base,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrdDraft {
    pub title: String,
    pub content_markdown: String,
    pub version_label: String,
}

impl PrdDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content_markdown.trim().is_empty() {
            return Err(ValidationError::EmptyMarkdown);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDesign {
    pub content_markdown: String,
    pub generated_by: String,
    pub version_label: String,
    pub generated_at: DateTime<Utc>,
}

impl SystemDesign {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content_markdown.trim().is_empty() {
            return Err(ValidationError::EmptyMarkdown);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleHours {
    pub role: String,
    pub hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortEstimate {
    pub roles: Vec<RoleHours>,
    pub total_hours: u64,
    pub duration_weeks: u32,
    pub complexity_assessment: String,
    pub notes: Option<String>,
}

impl EffortEstimate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let sum: u64 = self.roles.iter().map(|r| r.hours).sum();
        if sum != self.total_hours {
            return Err(ValidationError::EffortHoursMismatch {
                total: self.total_hours,
                sum,
            });
        }
        if self.duration_weeks < 1 {
            return Err(ValidationError::DurationTooShort(self.duration_weeks));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLineItem {
    pub role: String,
    pub hours: u64,
    pub hourly_rate: Cents,
    pub total_cost: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCardSnapshot {
    pub rate_card_id: String,
    pub rates: BTreeMap<String, Cents>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub breakdown: Vec<CostLineItem>,
    pub estimated_cost: Cents,
    pub currency: String,
    pub rate_card: RateCardSnapshot,
    pub calculation_method: String,
    pub notes: Option<String>,
}

impl CostEstimate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for item in &self.breakdown {
            if !self.rate_card.rates.contains_key(&item.role.to_lowercase()) {
                return Err(ValidationError::RoleMissingFromRateCard {
                    role: item.role.clone(),
                    rate_card_id: self.rate_card.rate_card_id.clone(),
                });
            }
            let expected = Cents(item.hours as i64 * item.hourly_rate.0);
            if expected != item.total_cost {
                return Err(ValidationError::TotalCostMismatch {
                    role: item.role.clone(),
                    expected: expected.0,
                    actual: item.total_cost.0,
                });
            }
        }
        let sum: Cents = self.breakdown.iter().map(|i| i.total_cost).sum();
        if sum != self.estimated_cost {
            return Err(ValidationError::EstimatedCostMismatch {
                expected: sum.0,
                actual: self.estimated_cost.0,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueScenario {
    pub case: ScenarioCase,
    pub value: Cents,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueProjection {
    pub scenarios: Vec<ValueScenario>,
    pub currency: String,
    pub template_id: String,
    pub methodology: String,
    pub assumptions: Vec<String>,
}

impl ValueProjection {
    /// Also used standalone by `RegistryError`-raising pricing-template
    /// authoring (§9 open-question resolution) on bare Low/Base/High triples.
    pub fn check_monotone(low: Cents, base: Cents, high: Cents) -> Result<(), ValidationError> {
        if !(low <= base && base <= high) {
            return Err(ValidationError::ScenariosNotMonotone {
                low: low.0,
                base: base.0,
                high: high.0,
            });
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut by_case: BTreeMap<&str, Cents> = BTreeMap::new();
        for s in &self.scenarios {
            let key = match s.case {
                ScenarioCase::Low => "low",
                ScenarioCase::Base => "base",
                ScenarioCase::High => "high",
            };
            if by_case.insert(key, s.value).is_some() {
                return Err(ValidationError::ScenarioDuplicated(s.case));
            }
        }
        for (case, key) in [
            (ScenarioCase::Low, "low"),
            (ScenarioCase::Base, "base"),
            (ScenarioCase::High, "high"),
        ] {
            if !by_case.contains_key(key) {
                return Err(ValidationError::ScenarioMissing(case));
            }
        }
        Self::check_monotone(by_case["low"], by_case["base"], by_case["high"])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_estimated_cost: Cents,
    pub total_projected_value_base: Cents,
    pub net_value_base: Cents,
    pub roi_percentage_base: Option<f64>,
    pub payback_period_months: Option<f64>,
    pub currency: String,
    pub key_assumptions: Vec<String>,
}

impl FinancialSummary {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let expected_net = self.total_projected_value_base - self.total_estimated_cost;
        if expected_net != self.net_value_base {
            return Err(ValidationError::NetValueMismatch {
                expected: expected_net.0,
                actual: self.net_value_base.0,
            });
        }
        if self.total_estimated_cost.0 > 0 {
            let expected_roi = 100.0 * self.net_value_base.0 as f64 / self.total_estimated_cost.0 as f64;
            match self.roi_percentage_base {
                Some(actual) if (actual - expected_roi).abs() < 0.01 => {}
                actual => {
                    return Err(ValidationError::RoiMismatch {
                        expected: expected_roi,
                        actual: actual.unwrap_or(f64::NAN),
                    })
                }
            }
        }
        Ok(())
    }
}

/// The aggregate root (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub case_id: CaseId,
    pub owner_user_id: String,
    pub title: String,
    pub problem_statement: String,
    pub relevant_links: Vec<RelevantLink>,
    pub status: Status,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub prd_draft: Option<PrdDraft>,
    pub system_design: Option<SystemDesign>,
    pub effort_estimate: Option<EffortEstimate>,
    pub cost_estimate: Option<CostEstimate>,
    pub value_projection: Option<ValueProjection>,
    pub financial_summary: Option<FinancialSummary>,

    /// Phases whose upstream inputs changed since generation (§9 resolution).
    /// Tracked on the case, not the artifact, so historical snapshots stay
    /// immutable.
    pub stale_phases: Vec<Phase>,

    pub history: Vec<HistoryEntry>,
}

impl Case {
    pub fn new(owner_user_id: impl Into<String>, title: impl Into<String>, problem_statement: impl Into<String>, relevant_links: Vec<RelevantLink>) -> Self {
        let now = Utc::now();
        Self {
            case_id: CaseId::new(),
            owner_user_id: owner_user_id.into(),
            title: title.into(),
            problem_statement: problem_statement.into(),
            relevant_links,
            status: Status::Intake,
            version: 0,
            created_at: now,
            updated_at: now,
            prd_draft: None,
            system_design: None,
            effort_estimate: None,
            cost_estimate: None,
            value_projection: None,
            financial_summary: None,
            stale_phases: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn is_stale(&self) -> bool {
        !self.stale_phases.is_empty()
    }
}
