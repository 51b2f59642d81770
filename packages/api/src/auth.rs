//! Dev-only identity extractor (spec.md §6 "environment variables ... only
//! for bootstrapping ... the identity verifier"): a real deployment would
//! verify a bearer token against that verifier and build the same `Actor`;
//! this reads plain headers instead so the HTTP surface is exercisable
//! without standing up an identity provider.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use casegen_case_store::Role;
use casegen_workflow::Actor;

use crate::error::ApiError;

pub struct AuthContext(pub Actor);

fn parse_role(name: &str) -> Option<Role> {
    match name {
        "ADMIN" => Some(Role::Admin),
        "DEVELOPER" => Some(Role::Developer),
        "TECHNICAL_ARCHITECT" => Some(Role::TechnicalArchitect),
        "FINANCE_APPROVER" => Some(Role::FinanceApprover),
        "SALES_MANAGER_APPROVER" => Some(Role::SalesManagerApprover),
        "FINAL_APPROVER" => Some(Role::FinalApprover),
        "CASE_INITIATOR" => Some(Role::CaseInitiator),
        _ => None,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("missing X-User-Id header".to_string()))?;

        let role_header = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("missing X-User-Role header".to_string()))?;

        let role = parse_role(role_header)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown role '{role_header}'")))?;

        Ok(AuthContext(Actor { user_id, role }))
    }
}
