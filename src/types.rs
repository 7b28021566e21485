//! Core types for agquota
//!
//! This module defines the data model shared across the crate: the
//! on-disk credential store produced by `opencode-antigravity-auth`,
//! the wire payloads of the cloudcode endpoints, and the normalized
//! per-model quota entries the report is built from.
//!
//! The credential store is read-only input. Refreshed access tokens are
//! never written back, and the rate-limit ledger is never mutated.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// One configured Google account from the credential store
///
/// The email can be absent in stores written by older auth versions;
/// [`AccountsConfig::assign_placeholder_emails`] substitutes a
/// deterministic `account-<n>` name so every account stays addressable
/// in the report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Google account email, if the auth component recorded one
    #[serde(default)]
    pub email: Option<String>,
    /// Long-lived OAuth refresh token
    pub refresh_token: String,
    /// Explicitly configured quota project
    #[serde(default)]
    pub project_id: Option<String>,
    /// Project provisioned by the managed onboarding flow
    #[serde(default)]
    pub managed_project_id: Option<String>,
    /// Model key -> cached rate-limit reset time in epoch ms (0 = never used)
    #[serde(default)]
    pub rate_limit_reset_times: BTreeMap<String, i64>,
}

impl Account {
    /// Display email, valid after placeholder assignment
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}

/// The credential store document (`antigravity-accounts.json`)
///
/// `active_index` and `active_index_by_family` belong to the auth
/// component's rotation state; they are tolerated here so the document
/// round-trips, but the quota engine never consults them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsConfig {
    /// Ordered account list; report order follows this order
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub active_index: i64,
    #[serde(default)]
    pub active_index_by_family: Option<BTreeMap<String, i64>>,
}

impl AccountsConfig {
    /// Substitute `account-<1-based-index>` for accounts without an email
    pub fn assign_placeholder_emails(&mut self) {
        for (index, account) in self.accounts.iter_mut().enumerate() {
            if account.email.as_deref().is_none_or(str::is_empty) {
                account.email = Some(format!("account-{}", index + 1));
            }
        }
    }
}

/// Token endpoint response (OAuth refresh-token grant)
///
/// Only the access token is read; the endpoint's other fields
/// (`expires_in`, `token_type`) are irrelevant to a single
/// orchestration pass and serde skips them.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// loadCodeAssist response, reduced to the fields the engine reads
///
/// `cloudaicompanionProject` has been observed both as a bare project-id
/// string and as an object with an `id` field, so it stays an untyped
/// value until [`crate::format::extract_project_id`] picks it apart.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadCodeAssistResponse {
    #[serde(default)]
    pub cloudaicompanion_project: Option<serde_json::Value>,
}

/// Per-model quota block in the fetchAvailableModels response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudCodeQuotaInfo {
    #[serde(default)]
    pub remaining_fraction: Option<f64>,
    #[serde(default)]
    pub reset_time: Option<String>,
}

/// Per-model entry in the fetchAvailableModels response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudCodeModelInfo {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub quota_info: Option<CloudCodeQuotaInfo>,
    #[serde(default)]
    pub recommended: Option<bool>,
    #[serde(default)]
    pub tag_title: Option<String>,
}

/// fetchAvailableModels response
///
/// A `BTreeMap` keeps model iteration deterministic; the upstream JSON
/// object carries no meaningful order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudCodeQuotaResponse {
    #[serde(default)]
    pub models: Option<BTreeMap<String, CloudCodeModelInfo>>,
}

/// Normalized quota entry for one model of one account
///
/// Derived once per fetch and immutable afterwards. `remaining_percentage`
/// is always within [0, 100].
#[derive(Debug, Clone)]
pub struct ModelQuota {
    /// Display label (upstream display name, else the raw model key)
    pub label: String,
    /// Stable model identifier used for cross-account grouping
    pub model_id: String,
    /// Remaining quota as a percentage in [0, 100]
    pub remaining_percentage: f64,
    /// True when no quota remains
    pub is_exhausted: bool,
    /// Absolute reset time (defaults to now + 24h when upstream omits it)
    pub reset_time: DateTime<Utc>,
    /// Milliseconds until reset, clamped to >= 0
    pub time_until_reset: i64,
    /// Human-formatted countdown to reset
    pub reset_in: String,
    /// Upstream recommendation flag, carried through untouched
    pub recommended: Option<bool>,
    /// Upstream tag title, carried through untouched
    pub tag_title: Option<String>,
}

/// Result of one account's quota fetch
///
/// Every account yields exactly one outcome; a failed account carries
/// the error message that the report's error line shows verbatim.
#[derive(Debug, Clone)]
pub struct AccountOutcome {
    /// Account email (or placeholder) the outcome belongs to
    pub email: String,
    /// Normalized quota entries on success, error message on failure
    pub result: std::result::Result<Vec<ModelQuota>, String>,
}

impl AccountOutcome {
    /// Successful outcome with normalized quota entries
    pub fn success(email: impl Into<String>, models: Vec<ModelQuota>) -> Self {
        Self {
            email: email.into(),
            result: Ok(models),
        }
    }

    /// Failed outcome carrying a human-readable error message
    pub fn failure(email: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            result: Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_store_camel_case_fields() {
        let json = r#"{
            "accounts": [
                {
                    "email": "alice@example.com",
                    "refreshToken": "rt-1",
                    "projectId": "proj-a",
                    "rateLimitResetTimes": { "gemini-cli:gemini-3-pro": 0 }
                },
                {
                    "refreshToken": "rt-2",
                    "managedProjectId": "managed-b",
                    "rateLimitResetTimes": {}
                }
            ],
            "activeIndex": 1
        }"#;

        let config: AccountsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[0].project_id.as_deref(), Some("proj-a"));
        assert_eq!(
            config.accounts[1].managed_project_id.as_deref(),
            Some("managed-b")
        );
        assert_eq!(config.active_index, 1);
    }

    #[test]
    fn test_placeholder_emails_preserve_order() {
        let json = r#"{
            "accounts": [
                { "refreshToken": "rt-1", "rateLimitResetTimes": {} },
                { "email": "bob@example.com", "refreshToken": "rt-2", "rateLimitResetTimes": {} },
                { "email": "", "refreshToken": "rt-3", "rateLimitResetTimes": {} }
            ],
            "activeIndex": 0
        }"#;

        let mut config: AccountsConfig = serde_json::from_str(json).unwrap();
        config.assign_placeholder_emails();
        assert_eq!(config.accounts[0].email(), "account-1");
        assert_eq!(config.accounts[1].email(), "bob@example.com");
        assert_eq!(config.accounts[2].email(), "account-3");
    }

    #[test]
    fn test_quota_response_tolerates_missing_fields() {
        let json = r#"{
            "models": {
                "gemini-3-pro": {
                    "displayName": "Gemini 3 Pro",
                    "quotaInfo": { "remainingFraction": 0.5 }
                },
                "bare-model": {}
            }
        }"#;

        let response: CloudCodeQuotaResponse = serde_json::from_str(json).unwrap();
        let models = response.models.unwrap();
        assert_eq!(
            models["gemini-3-pro"].display_name.as_deref(),
            Some("Gemini 3 Pro")
        );
        assert!(models["bare-model"].quota_info.is_none());
    }

    #[test]
    fn test_quota_response_without_models_field() {
        let response: CloudCodeQuotaResponse = serde_json::from_str("{}").unwrap();
        assert!(response.models.is_none());
    }
}
