use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use casegen_case_store::{Phase, PrdDraft};
use casegen_prompt_catalog::PromptCatalog;

use crate::contract::{AgentRunner, Artifact, CaseSnapshot};
use crate::error::AgentError;
use crate::llm::{LlmBackend, LlmRequest};

pub const AGENT_NAME: &str = "product_manager";
pub const AGENT_FUNCTION: &str = "draft_prd";

/// Drafts the PRD from the case's title, problem statement, and relevant
/// links (spec.md §4.4 table, row 1). The LLM's markdown comes back verbatim
/// as `content_markdown`; no further structuring is needed for this agent.
pub struct ProductManagerAgent {
    catalog: Arc<PromptCatalog>,
    llm: Arc<dyn LlmBackend>,
}

impl ProductManagerAgent {
    pub fn new(catalog: Arc<PromptCatalog>, llm: Arc<dyn LlmBackend>) -> Self {
        Self { catalog, llm }
    }
}

#[async_trait]
impl AgentRunner for ProductManagerAgent {
    fn phase(&self) -> Phase {
        Phase::Prd
    }

    async fn run(&self, snapshot: &CaseSnapshot) -> Result<Artifact, AgentError> {
        let mut values = HashMap::new();
        values.insert("title".to_string(), snapshot.title.clone());
        values.insert("problem_statement".to_string(), snapshot.problem_statement.clone());
        values.insert(
            "relevant_links".to_string(),
            snapshot
                .relevant_links
                .iter()
                .map(|l| format!("{} ({})", l.name, l.url))
                .collect::<Vec<_>>()
                .join(", "),
        );

        let rendered = self.catalog.resolve_active(AGENT_NAME, AGENT_FUNCTION, &values)?;

        let content_markdown = self
            .llm
            .complete(LlmRequest {
                agent_name: AGENT_NAME.to_string(),
                agent_function: AGENT_FUNCTION.to_string(),
                prompt: rendered.text,
            })
            .await?;

        let draft = PrdDraft {
            title: snapshot.title.clone(),
            content_markdown,
            version_label: rendered.version_label,
        };
        draft.validate()?;
        Ok(Artifact::Prd(draft))
    }
}
