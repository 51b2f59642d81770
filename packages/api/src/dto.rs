//! Request/response bodies for the JSON-over-HTTP surface (spec.md §6).
//!
//! The six artifact shapes already derive `Serialize`/`Deserialize` in
//! `casegen-case-store`, so the phase-specific edit endpoints accept and
//! return them directly rather than through a parallel set of DTOs.

use serde::{Deserialize, Serialize};

use casegen_case_store::{CaseId, RelevantLink, Status};

#[derive(Debug, Deserialize)]
pub struct CreateCaseRequest {
    pub title: String,
    pub problem_statement: String,
    #[serde(default)]
    pub relevant_links: Vec<RelevantLinkDto>,
}

#[derive(Debug, Deserialize)]
pub struct RelevantLinkDto {
    pub name: String,
    pub url: String,
}

impl From<RelevantLinkDto> for RelevantLink {
    fn from(dto: RelevantLinkDto) -> Self {
        RelevantLink { name: dto.name, url: dto.url }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateCaseResponse {
    pub case_id: CaseId,
    pub initial_status: Status,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: Option<String>,
}
