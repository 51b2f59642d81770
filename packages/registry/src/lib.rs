//! Rate Card & Pricing Template Registry — spec.md §4.6.
//!
//! Read-mostly lookups. No admin CRUD here (out of scope per spec.md §1);
//! the registries are populated by whatever bootstraps the process and only
//! expose the lookup contract the agent runners need.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use casegen_case_store::{Cents, RateCardSnapshot, ValueProjection};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("rate card '{0}' not found")]
    RateCardNotFound(String),

    #[error("no active rate card configured")]
    NoActiveRateCard,

    #[error("pricing template '{0}' not found")]
    TemplateNotFound(String),

    #[error("pricing template scenarios violate Low <= Base <= High ({low} / {base} / {high})")]
    TemplateNotMonotone { low: i64, base: i64, high: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCard {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub default_hourly_rate: Cents,
    pub roles: Vec<RoleRate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRate {
    pub role_name: String,
    pub hourly_rate: Cents,
}

impl RateCard {
    /// Case-insensitive role lookup, falling back to the card's default
    /// (spec.md §4.6).
    pub fn resolve_role_rate(&self, role: &str) -> Cents {
        let needle = role.to_lowercase();
        self.roles
            .iter()
            .find(|r| r.role_name.to_lowercase() == needle)
            .map(|r| r.hourly_rate)
            .unwrap_or(self.default_hourly_rate)
    }

    /// Snapshot of every role this cost estimate will reference, keyed
    /// lower-case, plus the default for roles resolved via fallback
    /// (spec.md §3: "captured by id + snapshot ... at generation time").
    pub fn snapshot_for(&self, roles: &[String]) -> RateCardSnapshot {
        let mut rates = std::collections::BTreeMap::new();
        for role in roles {
            rates.insert(role.to_lowercase(), self.resolve_role_rate(role));
        }
        RateCardSnapshot {
            rate_card_id: self.id.clone(),
            rates,
        }
    }
}

#[derive(Default)]
pub struct RateCardRegistry {
    cards: RwLock<HashMap<String, RateCard>>,
}

impl RateCardRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, card: RateCard) {
        self.cards.write().insert(card.id.clone(), card);
    }

    pub fn get(&self, id: &str) -> Result<RateCard, RegistryError> {
        self.cards
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::RateCardNotFound(id.to_string()))
    }

    pub fn active(&self) -> Result<RateCard, RegistryError> {
        self.cards
            .read()
            .values()
            .find(|c| c.is_active)
            .cloned()
            .ok_or(RegistryError::NoActiveRateCard)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioTemplate {
    pub case_label: String,
    pub multiplier_hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTemplate {
    pub id: String,
    pub name: String,
    pub methodology: String,
    pub low: ScenarioTemplate,
    pub base: ScenarioTemplate,
    pub high: ScenarioTemplate,
}

#[derive(Default)]
pub struct PricingTemplateRegistry {
    templates: RwLock<HashMap<String, PricingTemplate>>,
}

impl PricingTemplateRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registration, not just lookup, validates the §9-open-question
    /// resolution up front: a template that cannot even in principle respect
    /// Low <= Base <= High is rejected here rather than trusted to generation
    /// time (spec.md §9 "admin template writes should be rejected if they
    /// cannot satisfy it").
    pub fn register(&self, template: PricingTemplate, sample_low: Cents, sample_base: Cents, sample_high: Cents) -> Result<(), RegistryError> {
        ValueProjection::check_monotone(sample_low, sample_base, sample_high).map_err(|_| {
            RegistryError::TemplateNotMonotone {
                low: sample_low.0,
                base: sample_base.0,
                high: sample_high.0,
            }
        })?;
        self.templates.write().insert(template.id.clone(), template);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<PricingTemplate, RegistryError> {
        self.templates
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::TemplateNotFound(id.to_string()))
    }
}
