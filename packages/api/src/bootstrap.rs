//! Process bootstrap: wires the case store, catalog, registries, and agent
//! runners into one `Orchestrator` (spec.md §9 "global mutable state ...
//! process-wide state with init-on-first-use").
//!
//! No real LLM endpoint is wired in: spec.md never specifies one beyond "an
//! LLM backend", so the only implementation is the deterministic
//! `StubLlmBackend` the agents crate already tests against. A real
//! deployment would swap in an HTTP-backed `LlmBackend` behind the same
//! trait without touching the orchestrator.

use std::sync::Arc;

use casegen_agents::{
    ArchitectAgent, CostAnalystAgent, FinancialModelAgent, PlannerAgent, ProductManagerAgent,
    SalesValueAnalystAgent, StubLlmBackend,
};
use casegen_case_store::{Cents, MemoryCaseStore};
use casegen_orchestrator::{Config, Orchestrator};
use casegen_policy_config::PolicyConfig;
use casegen_prompt_catalog::{PromptCatalog, PromptEntry, PromptVersion};
use casegen_registry::{PricingTemplate, RateCard, RateCardRegistry, RoleRate, ScenarioTemplate};

pub struct Runtime {
    pub orchestrator: Arc<Orchestrator>,
    pub llm: Arc<StubLlmBackend>,
}

pub fn build() -> Runtime {
    let config = Config::from_env();

    let store = MemoryCaseStore::new();
    let policy = PolicyConfig::new(&config.final_approver_role_name)
        .expect("default final approver role name must be a recognized role");

    let catalog = PromptCatalog::new();
    seed_prompts(&catalog);

    let rate_cards = RateCardRegistry::new();
    rate_cards.register(default_rate_card(&config.default_rate_card_id));

    let templates = casegen_registry::PricingTemplateRegistry::new();
    templates
        .register(
            standard_pricing_template(),
            Cents::ZERO,
            Cents(1),
            Cents(2),
        )
        .expect("the standard template's sample scenarios are monotone by construction");

    let llm = StubLlmBackend::new();

    let runners: Vec<Arc<dyn casegen_agents::AgentRunner>> = vec![
        Arc::new(ProductManagerAgent::new(catalog.clone(), llm.clone())),
        Arc::new(ArchitectAgent::new(catalog.clone(), llm.clone())),
        Arc::new(PlannerAgent::new(catalog.clone(), llm.clone())),
        Arc::new(CostAnalystAgent::new(
            catalog.clone(),
            llm.clone(),
            rate_cards.clone(),
            config.default_rate_card_id.clone(),
        )),
        Arc::new(SalesValueAnalystAgent::new(
            catalog.clone(),
            llm.clone(),
            templates.clone(),
            "standard_value_template",
        )),
        Arc::new(FinancialModelAgent::new(catalog.clone(), llm.clone())),
    ];

    let orchestrator = Orchestrator::new(store, policy, config.clone(), runners);
    orchestrator.spawn_recovery_sweep(config.generation_timeout());

    Runtime { orchestrator, llm }
}

fn default_rate_card(id: &str) -> RateCard {
    RateCard {
        id: id.to_string(),
        name: "Default Development Rates".to_string(),
        is_active: true,
        default_hourly_rate: Cents(10_000),
        roles: vec![
            RoleRate { role_name: "Engineer".to_string(), hourly_rate: Cents(15_000) },
            RoleRate { role_name: "Designer".to_string(), hourly_rate: Cents(12_000) },
            RoleRate { role_name: "QA Engineer".to_string(), hourly_rate: Cents(21_000) },
        ],
    }
}

fn standard_pricing_template() -> PricingTemplate {
    PricingTemplate {
        id: "standard_value_template".to_string(),
        name: "Standard Comparable-Deals Template".to_string(),
        methodology: "comparable enterprise deals, discounted for adoption risk".to_string(),
        low: ScenarioTemplate { case_label: "Conservative adoption".to_string(), multiplier_hint: "0.4x of comparable deal value".to_string() },
        base: ScenarioTemplate { case_label: "Expected adoption".to_string(), multiplier_hint: "1.0x of comparable deal value".to_string() },
        high: ScenarioTemplate { case_label: "Accelerated adoption".to_string(), multiplier_hint: "2.0x of comparable deal value".to_string() },
    }
}

fn prompt(agent_name: &str, agent_function: &str, placeholders: &[&str], template_text: &str) -> PromptEntry {
    let now = chrono::Utc::now();
    PromptEntry {
        prompt_id: format!("{agent_name}-{agent_function}"),
        agent_name: agent_name.to_string(),
        agent_function: agent_function.to_string(),
        title: format!("{agent_name} / {agent_function}"),
        description: format!("Default prompt for {agent_name}'s {agent_function} step"),
        category: agent_name.to_string(),
        is_enabled: true,
        current_version: "v1".to_string(),
        versions: vec![PromptVersion {
            label: "v1".to_string(),
            template_text: template_text.to_string(),
            placeholders: placeholders.iter().map(|p| p.to_string()).collect(),
            description: "initial version".to_string(),
            is_active: true,
            created_at: now,
        }],
        usage_count: 0,
    }
}

fn seed_prompts(catalog: &PromptCatalog) {
    catalog.create_prompt(prompt(
        "product_manager",
        "draft_prd",
        &["title", "problem_statement", "relevant_links"],
        "Draft a PRD in markdown for \"{{title}}\". Problem statement: {{problem_statement}}. Relevant links: {{relevant_links}}.",
    ));
    catalog.create_prompt(prompt(
        "architect",
        "draft_system_design",
        &["title", "prd_markdown"],
        "Draft a system design in markdown for \"{{title}}\" based on this PRD:\n{{prd_markdown}}",
    ));
    catalog.create_prompt(prompt(
        "planner",
        "estimate_effort",
        &["title", "prd_markdown", "system_design_markdown"],
        "Given the PRD and system design for \"{{title}}\", return a JSON effort estimate. PRD:\n{{prd_markdown}}\nSystem design:\n{{system_design_markdown}}",
    ));
    catalog.create_prompt(prompt(
        "cost_analyst",
        "estimate_cost",
        &["title", "case_id", "effort_summary"],
        "Explain the costing methodology for case {{case_id}} (\"{{title}}\"): {{effort_summary}}",
    ));
    catalog.create_prompt(prompt(
        "sales_value_analyst",
        "project_value",
        &["title", "estimated_cost_cents", "methodology"],
        "Project Low/Base/High value scenarios for \"{{title}}\" (estimated cost {{estimated_cost_cents}} cents) using methodology: {{methodology}}",
    ));
    catalog.create_prompt(prompt(
        "financial_model",
        "summarize_financials",
        &["title", "estimated_cost_cents", "projected_value_base_cents"],
        "Summarize the financial case for \"{{title}}\": cost {{estimated_cost_cents}} cents, base value {{projected_value_base_cents}} cents.",
    ));
}
