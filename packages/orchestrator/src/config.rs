//! Orchestrator configuration — spec.md §6 "Configuration (recognized options)".
//!
//! Plain env-var bootstrapping, same as the teacher's `server.rs` reading
//! `PORT` directly with `unwrap_or_else`: no config-file framework, since
//! spec.md §6 is explicit that "no business behavior depends on environment"
//! beyond these bootstrap knobs.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub generation_timeout_ms: u64,
    pub concurrency_retry_limit: u32,
    pub llm_retry_limit: u32,
    pub final_approver_role_name: String,
    pub default_rate_card_id: String,
    pub prompt_cache_ttl_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation_timeout_ms: 1_200_000,
            concurrency_retry_limit: 3,
            llm_retry_limit: 2,
            final_approver_role_name: "FINAL_APPROVER".to_string(),
            default_rate_card_id: "default_dev_rates".to_string(),
            prompt_cache_ttl_ms: 60_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            generation_timeout_ms: env_u64("GENERATION_TIMEOUT_MS", defaults.generation_timeout_ms),
            concurrency_retry_limit: env_u32("CONCURRENCY_RETRY_LIMIT", defaults.concurrency_retry_limit),
            llm_retry_limit: env_u32("LLM_RETRY_LIMIT", defaults.llm_retry_limit),
            final_approver_role_name: std::env::var("FINAL_APPROVER_ROLE_NAME")
                .unwrap_or(defaults.final_approver_role_name),
            default_rate_card_id: std::env::var("DEFAULT_RATE_CARD_ID").unwrap_or(defaults.default_rate_card_id),
            prompt_cache_ttl_ms: env_u64("PROMPT_CACHE_TTL_MS", defaults.prompt_cache_ttl_ms),
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// Backoff schedule for `StoreError::ConcurrencyConflict` retries
    /// (spec.md §4.3: 50/200/800 ms, fixed regardless of `concurrency_retry_limit`).
    pub fn concurrency_backoff(attempt: u32) -> Duration {
        let ms = match attempt {
            1 => 50,
            2 => 200,
            _ => 800,
        };
        Duration::from_millis(ms)
    }

    /// Backoff schedule for retryable `AgentError`s (spec.md §4.4: 2s, 8s).
    pub fn agent_retry_backoff(attempt: u32) -> Duration {
        let secs = match attempt {
            1 => 2,
            _ => 8,
        };
        Duration::from_secs(secs)
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
