//! Prompt Catalog — spec.md §4.5.
//!
//! Versioned prompt templates keyed by `(agent_name, agent_function)`.
//! Guarded the same way the teacher's state store guards its `HashMap`: a
//! single `parking_lot::RwLock`, one write-lock critical section per
//! mutation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type PromptId = String;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no prompt registered for ({agent_name}, {agent_function})")]
    PromptMissing { agent_name: String, agent_function: String },

    #[error("prompt {0} not found")]
    NotFound(PromptId),

    #[error("version '{0}' not found on this prompt")]
    VersionNotFound(String),

    #[error("prompt {0} has no active version")]
    NoActiveVersion(PromptId),

    #[error("missing placeholder '{0}' when rendering prompt")]
    MissingPlaceholder(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersion {
    pub label: String,
    pub template_text: String,
    pub placeholders: Vec<String>,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptEntry {
    pub prompt_id: PromptId,
    pub agent_name: String,
    pub agent_function: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub is_enabled: bool,
    pub current_version: String,
    pub versions: Vec<PromptVersion>,
    pub usage_count: u64,
}

impl PromptEntry {
    pub fn active_version(&self) -> Option<&PromptVersion> {
        self.versions.iter().find(|v| v.is_active)
    }
}

/// A resolved, placeholder-filled prompt ready for the LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub prompt_id: PromptId,
    pub version_label: String,
    pub text: String,
}

#[derive(Default)]
pub struct PromptCatalog {
    prompts: RwLock<HashMap<PromptId, PromptEntry>>,
    // Usage counters live outside the RwLock so `resolve_active` (a hot path)
    // only needs a read lock; spec.md §4.5 explicitly tolerates undercounting
    // under concurrency.
    usage_counters: RwLock<HashMap<PromptId, Arc<AtomicU64>>>,
}

impl PromptCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn list(&self) -> Vec<PromptEntry> {
        self.prompts.read().values().cloned().collect()
    }

    pub fn get(&self, prompt_id: &str) -> Result<PromptEntry, CatalogError> {
        self.prompts
            .read()
            .get(prompt_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(prompt_id.to_string()))
    }

    pub fn create_prompt(&self, entry: PromptEntry) {
        let mut prompts = self.prompts.write();
        self.usage_counters
            .write()
            .entry(entry.prompt_id.clone())
            .or_insert_with(|| Arc::new(AtomicU64::new(entry.usage_count)));
        prompts.insert(entry.prompt_id.clone(), entry);
    }

    pub fn update_prompt_metadata(
        &self,
        prompt_id: &str,
        title: Option<String>,
        description: Option<String>,
        is_enabled: Option<bool>,
    ) -> Result<(), CatalogError> {
        let mut prompts = self.prompts.write();
        let entry = prompts
            .get_mut(prompt_id)
            .ok_or_else(|| CatalogError::NotFound(prompt_id.to_string()))?;
        if let Some(t) = title {
            entry.title = t;
        }
        if let Some(d) = description {
            entry.description = d;
        }
        if let Some(e) = is_enabled {
            entry.is_enabled = e;
        }
        Ok(())
    }

    pub fn add_version(&self, prompt_id: &str, version: PromptVersion) -> Result<(), CatalogError> {
        let mut prompts = self.prompts.write();
        let entry = prompts
            .get_mut(prompt_id)
            .ok_or_else(|| CatalogError::NotFound(prompt_id.to_string()))?;
        entry.versions.push(version);
        Ok(())
    }

    /// Atomically flips exactly one version active (spec.md §4.5: "a write
    /// that would leave zero or more-than-one active versions must fail").
    /// Constructing the new version list head-on makes that failure mode
    /// unreachable rather than merely checked after the fact.
    pub fn set_active_version(&self, prompt_id: &str, version_label: &str) -> Result<(), CatalogError> {
        let mut prompts = self.prompts.write();
        let entry = prompts
            .get_mut(prompt_id)
            .ok_or_else(|| CatalogError::NotFound(prompt_id.to_string()))?;

        if !entry.versions.iter().any(|v| v.label == version_label) {
            return Err(CatalogError::VersionNotFound(version_label.to_string()));
        }

        for v in entry.versions.iter_mut() {
            v.is_active = v.label == version_label;
        }
        entry.current_version = version_label.to_string();
        Ok(())
    }

    /// Resolve the active version for `(agent_name, agent_function)`, render
    /// its placeholders, and increment `usage_count` (spec.md §4.5).
    pub fn resolve_active(
        &self,
        agent_name: &str,
        agent_function: &str,
        values: &HashMap<String, String>,
    ) -> Result<RenderedPrompt, CatalogError> {
        let prompt_id = {
            let prompts = self.prompts.read();
            prompts
                .values()
                .find(|p| p.agent_name == agent_name && p.agent_function == agent_function && p.is_enabled)
                .map(|p| p.prompt_id.clone())
                .ok_or_else(|| CatalogError::PromptMissing {
                    agent_name: agent_name.to_string(),
                    agent_function: agent_function.to_string(),
                })?
        };

        let (version_label, template_text) = {
            let prompts = self.prompts.read();
            let entry = prompts.get(&prompt_id).expect("looked up above");
            let active = entry
                .active_version()
                .ok_or_else(|| CatalogError::NoActiveVersion(prompt_id.clone()))?;
            (active.label.clone(), active.template_text.clone())
        };

        let text = render(&template_text, values)?;

        if let Some(counter) = self.usage_counters.read().get(&prompt_id) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        Ok(RenderedPrompt {
            prompt_id,
            version_label,
            text,
        })
    }

    pub fn usage_count(&self, prompt_id: &str) -> u64 {
        self.usage_counters
            .read()
            .get(prompt_id)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

/// Fill `{{placeholder}}` tokens. A placeholder absent from `values` is a
/// hard error rather than left verbatim — a silently unrendered prompt would
/// reach the LLM backend looking like valid instructions.
fn render(template: &str, values: &HashMap<String, String>) -> Result<String, CatalogError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| CatalogError::MissingPlaceholder("unterminated {{".to_string()))?;
        let key = after[..end].trim();
        let value = values
            .get(key)
            .ok_or_else(|| CatalogError::MissingPlaceholder(key.to_string()))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}
