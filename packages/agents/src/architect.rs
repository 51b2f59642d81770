use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use casegen_case_store::{Phase, SystemDesign};
use casegen_prompt_catalog::PromptCatalog;

use crate::contract::{AgentRunner, Artifact, CaseSnapshot};
use crate::error::AgentError;
use crate::llm::{LlmBackend, LlmRequest};

pub const AGENT_NAME: &str = "architect";
pub const AGENT_FUNCTION: &str = "draft_system_design";

/// Drafts the system design from the approved PRD markdown and the case
/// title (spec.md §4.4 table, row 2).
pub struct ArchitectAgent {
    catalog: Arc<PromptCatalog>,
    llm: Arc<dyn LlmBackend>,
}

impl ArchitectAgent {
    pub fn new(catalog: Arc<PromptCatalog>, llm: Arc<dyn LlmBackend>) -> Self {
        Self { catalog, llm }
    }
}

#[async_trait]
impl AgentRunner for ArchitectAgent {
    fn phase(&self) -> Phase {
        Phase::SystemDesign
    }

    async fn run(&self, snapshot: &CaseSnapshot) -> Result<Artifact, AgentError> {
        let prd = snapshot
            .prd_draft
            .as_ref()
            .ok_or_else(|| AgentError::DependencyMissing("prd_draft".to_string()))?;

        let mut values = HashMap::new();
        values.insert("title".to_string(), snapshot.title.clone());
        values.insert("prd_markdown".to_string(), prd.content_markdown.clone());

        let rendered = self.catalog.resolve_active(AGENT_NAME, AGENT_FUNCTION, &values)?;

        let content_markdown = self
            .llm
            .complete(LlmRequest {
                agent_name: AGENT_NAME.to_string(),
                agent_function: AGENT_FUNCTION.to_string(),
                prompt: rendered.text,
            })
            .await?;

        let design = SystemDesign {
            content_markdown,
            generated_by: AGENT_NAME.to_string(),
            version_label: rendered.version_label,
            generated_at: Utc::now(),
        };
        design.validate()?;
        Ok(Artifact::SystemDesign(design))
    }
}
