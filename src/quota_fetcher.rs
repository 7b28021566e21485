//! Quota fetcher for the Antigravity cloudcode API
//!
//! Handles the per-account network flow: exchanging the stored refresh
//! token for an access token, resolving the quota project (configured
//! id, managed id, then loadCodeAssist discovery), fetching the raw
//! per-model quota payload, and normalizing it into [`ModelQuota`]
//! entries.
//!
//! Each call is a hard failure on a non-success status; there are no
//! retries. Failures are account-scoped and isolated by the caller.

use crate::error::{AgquotaError, Result};
use crate::format::{extract_project_id, format_duration};
use crate::types::{
    Account, CloudCodeQuotaResponse, LoadCodeAssistResponse, ModelQuota, TokenResponse,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, info};

/// Google OAuth token endpoint
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Antigravity cloudcode production endpoint
const CLOUDCODE_BASE_URL: &str = "https://cloudcode-pa.googleapis.com";

/// OAuth client the Antigravity IDE registers with Google
const ANTIGRAVITY_CLIENT_ID: &str =
    "1071006060591-tmhssin2h21lcre235vtolojh4g403ep.apps.googleusercontent.com";
const ANTIGRAVITY_CLIENT_SECRET: &str = "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";

/// User agent the cloudcode endpoints expect
const USER_AGENT: &str = "antigravity";

/// A label exclusion rule, matched case-insensitively
#[derive(Debug, Clone, Copy)]
enum LabelRule {
    Prefix(&'static str),
    Contains(&'static str),
}

/// Model families dropped from the report
///
/// Legacy and internal upstream entries tied to the current naming
/// scheme. Matching semantics are deliberately simple prefix/substring
/// checks against the lowercased display label.
const EXCLUDED_LABELS: &[LabelRule] = &[
    LabelRule::Prefix("chat_"),
    LabelRule::Prefix("rev19"),
    LabelRule::Contains("gemini 2.5"),
    LabelRule::Contains("gemini 3 pro image"),
];

fn is_excluded_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    EXCLUDED_LABELS.iter().any(|rule| match rule {
        LabelRule::Prefix(p) => lower.starts_with(p),
        LabelRule::Contains(s) => lower.contains(s),
    })
}

/// HTTP client for the token and cloudcode endpoints
///
/// One instance is shared across all accounts of an invocation. Base
/// URLs are overridable so tests can point the client at a local
/// server.
pub struct QuotaClient {
    client: reqwest::Client,
    token_url: String,
    cloudcode_base_url: String,
}

impl Default for QuotaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaClient {
    /// Create a client against the production endpoints
    pub fn new() -> Self {
        Self::with_base_urls(GOOGLE_TOKEN_URL, CLOUDCODE_BASE_URL)
    }

    /// Create a client against custom endpoints
    pub fn with_base_urls(token_url: impl Into<String>, cloudcode_base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: token_url.into(),
            cloudcode_base_url: cloudcode_base_url.into(),
        }
    }

    /// Exchange a refresh token for a short-lived access token
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", ANTIGRAVITY_CLIENT_ID),
                ("client_secret", ANTIGRAVITY_CLIENT_SECRET),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgquotaError::TokenRefreshFailed {
                status: response.status().as_u16(),
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Discover the cloudaicompanion project for an account
    pub async fn load_code_assist(&self, access_token: &str) -> Result<LoadCodeAssistResponse> {
        let url = format!("{}/v1internal:loadCodeAssist", self.cloudcode_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&json!({
                "metadata": {
                    "ideType": "ANTIGRAVITY",
                    "platform": "PLATFORM_UNSPECIFIED",
                    "pluginType": "GEMINI",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgquotaError::ProjectDiscoveryFailed {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    /// Fetch the raw per-model quota payload
    ///
    /// The `project` field is omitted entirely when no id is known; the
    /// endpoint rejects an empty value but accepts its absence.
    pub async fn fetch_available_models(
        &self,
        access_token: &str,
        project_id: Option<&str>,
    ) -> Result<CloudCodeQuotaResponse> {
        let payload = match project_id {
            Some(id) => json!({ "project": id }),
            None => json!({}),
        };

        let url = format!("{}/v1internal:fetchAvailableModels", self.cloudcode_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgquotaError::QuotaFetchFailed {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    /// Run the full quota flow for one account
    ///
    /// Token refresh, project resolution (configured id, then managed
    /// id, then discovery), quota fetch, normalization. Any step's
    /// failure fails the whole account.
    pub async fn fetch_account_quota(&self, account: &Account) -> Result<Vec<ModelQuota>> {
        let access_token = self.refresh_access_token(&account.refresh_token).await?;

        let mut project_id = account
            .project_id
            .clone()
            .or_else(|| account.managed_project_id.clone());

        if project_id.is_none() {
            debug!("no configured project for {}, discovering", account.email());
            let code_assist = self.load_code_assist(&access_token).await?;
            project_id = code_assist
                .cloudaicompanion_project
                .as_ref()
                .and_then(extract_project_id);
        }

        let response = self
            .fetch_available_models(&access_token, project_id.as_deref())
            .await?;

        let models = normalize_models(&response, Utc::now());
        info!(
            "fetched {} quota entries for {}",
            models.len(),
            account.email()
        );
        Ok(models)
    }
}

/// Normalize a raw quota payload into typed, filtered entries
///
/// Entries without quota information and denylisted model families are
/// dropped. The remaining fraction is clamped to [0, 1] (NaN counts as
/// 0) and the reset time defaults to `now + 24h` when the payload omits
/// it or supplies an unparseable value. The result is sorted by display
/// label.
pub fn normalize_models(response: &CloudCodeQuotaResponse, now: DateTime<Utc>) -> Vec<ModelQuota> {
    let Some(model_map) = &response.models else {
        return Vec::new();
    };

    let mut models = Vec::with_capacity(model_map.len());
    for (model_key, info) in model_map {
        let Some(quota_info) = &info.quota_info else {
            continue;
        };

        let label = info
            .display_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| model_key.clone());
        if is_excluded_label(&label) {
            debug!("excluding model {label}");
            continue;
        }

        let raw_fraction = quota_info.remaining_fraction.unwrap_or(0.0);
        let fraction = if raw_fraction.is_nan() {
            0.0
        } else {
            raw_fraction.clamp(0.0, 1.0)
        };

        let reset_time = quota_info
            .reset_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or_else(|| now + Duration::hours(24));
        let time_until_reset = (reset_time - now).num_milliseconds().max(0);

        models.push(ModelQuota {
            label,
            model_id: info
                .model
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| model_key.clone()),
            remaining_percentage: fraction * 100.0,
            is_exhausted: fraction <= 0.0,
            reset_time,
            time_until_reset,
            reset_in: format_duration(time_until_reset),
            recommended: info.recommended,
            tag_title: info.tag_title.clone(),
        });
    }

    models.sort_by(|a, b| {
        a.label
            .to_lowercase()
            .cmp(&b.label.to_lowercase())
            .then_with(|| a.label.cmp(&b.label))
    });
    models
}
