//! Cross-account orchestration and aggregation
//!
//! Drives the per-account quota flow strictly sequentially, isolating
//! each account's failure into its own [`AccountOutcome`], then merges
//! the successful outcomes into signature-grouped model sections for
//! the report.
//!
//! Sequencing is deliberate: the token endpoint rate-limits callers, so
//! a fixed pacing delay is inserted before every account after the
//! first. This is backpressure, not retry/backoff.

use crate::format::short_email;
use crate::quota_fetcher::QuotaClient;
use crate::types::{Account, AccountOutcome, ModelQuota};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

/// Delay inserted between consecutive account fetches
const ACCOUNT_PACING: Duration = Duration::from_millis(300);

/// Source of per-account quota data
///
/// Implemented by [`QuotaClient`] for the real endpoints and by stubs
/// in tests, so orchestration and report assembly are testable without
/// a network.
#[async_trait]
pub trait QuotaSource {
    /// Fetch and normalize one account's quota entries
    async fn fetch_account_quota(&self, account: &Account) -> Result<Vec<ModelQuota>>;
}

#[async_trait]
impl QuotaSource for QuotaClient {
    async fn fetch_account_quota(&self, account: &Account) -> Result<Vec<ModelQuota>> {
        QuotaClient::fetch_account_quota(self, account).await
    }
}

/// Fetch quota for every account, one outcome per account in input order
///
/// Accounts are processed one at a time. A failure for one account is
/// converted into a failed outcome and processing continues; one bad
/// credential never aborts the batch.
pub async fn fetch_all_accounts<S: QuotaSource>(
    source: &S,
    accounts: &[Account],
) -> Vec<AccountOutcome> {
    let mut outcomes = Vec::with_capacity(accounts.len());

    for (index, account) in accounts.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(ACCOUNT_PACING).await;
        }

        let outcome = match source.fetch_account_quota(account).await {
            Ok(models) => AccountOutcome::success(account.email(), models),
            Err(error) => {
                warn!("quota fetch failed for {}: {}", account.email(), error);
                AccountOutcome::failure(account.email(), error.to_string())
            }
        };
        outcomes.push(outcome);
    }

    info!(
        "fetched quota for {} accounts ({} failed)",
        outcomes.len(),
        outcomes.iter().filter(|o| o.result.is_err()).count()
    );
    outcomes
}

/// One account's contribution to a model's quota section
#[derive(Debug, Clone)]
pub struct AccountShare {
    pub email: String,
    pub percentage: f64,
    pub reset_in: String,
    pub is_exhausted: bool,
}

/// A report section covering one or more quota-aliased models
///
/// Models whose per-account (email, percentage, countdown) tuples are
/// identical across all contributing accounts are collapsed into one
/// group; `labels` carries every merged display label in label order.
#[derive(Debug, Clone)]
pub struct ModelGroup {
    pub labels: Vec<String>,
    pub accounts: Vec<AccountShare>,
}

/// Aggregated view over all account outcomes
#[derive(Debug, Clone, Default)]
pub struct Aggregated {
    /// `shortEmail: message` entries for failed accounts, input order
    pub errors: Vec<String>,
    /// Signature-grouped model sections, label order
    pub groups: Vec<ModelGroup>,
}

/// Merge per-account outcomes into error lines and model groups
pub fn aggregate_outcomes(outcomes: &[AccountOutcome]) -> Aggregated {
    let mut errors = Vec::new();
    // Insertion-ordered (model_id, label, shares); the report's order is
    // a correctness property, so no hash-map iteration anywhere here.
    let mut models: Vec<(String, String, Vec<AccountShare>)> = Vec::new();

    for outcome in outcomes {
        let entries = match &outcome.result {
            Ok(entries) => entries,
            Err(message) => {
                errors.push(format!("{}: {}", short_email(&outcome.email), message));
                continue;
            }
        };

        for model in entries {
            let share = AccountShare {
                email: outcome.email.clone(),
                percentage: model.remaining_percentage,
                reset_in: model.reset_in.clone(),
                is_exhausted: model.is_exhausted,
            };
            match models.iter_mut().find(|(id, _, _)| *id == model.model_id) {
                Some((_, _, shares)) => shares.push(share),
                None => models.push((model.model_id.clone(), model.label.clone(), vec![share])),
            }
        }
    }

    models.sort_by(|(_, a, _), (_, b, _)| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });

    // Collapse models whose quota signatures are byte-identical across
    // the same accounts; they are aliases of one underlying quota pool.
    let mut groups: Vec<(String, ModelGroup)> = Vec::new();
    for (_, label, shares) in models {
        let signature = quota_signature(&shares);
        match groups.iter_mut().find(|(sig, _)| *sig == signature) {
            Some((_, group)) => group.labels.push(label),
            None => groups.push((
                signature,
                ModelGroup {
                    labels: vec![label],
                    accounts: shares,
                },
            )),
        }
    }

    Aggregated {
        errors,
        groups: groups.into_iter().map(|(_, group)| group).collect(),
    }
}

/// Stable signature of a model's per-account quota state
fn quota_signature(shares: &[AccountShare]) -> String {
    let mut parts: Vec<String> = shares
        .iter()
        .map(|share| format!("{}:{:.1}:{}", share.email, share.percentage, share.reset_in))
        .collect();
    parts.sort();
    parts.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgquotaError;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn account(email: &str) -> Account {
        Account {
            email: Some(email.to_string()),
            refresh_token: format!("rt-{email}"),
            project_id: None,
            managed_project_id: None,
            rate_limit_reset_times: BTreeMap::new(),
        }
    }

    fn quota(label: &str, model_id: &str, percentage: f64, reset_in: &str) -> ModelQuota {
        ModelQuota {
            label: label.to_string(),
            model_id: model_id.to_string(),
            remaining_percentage: percentage,
            is_exhausted: percentage <= 0.0,
            reset_time: Utc::now(),
            time_until_reset: 0,
            reset_in: reset_in.to_string(),
            recommended: None,
            tag_title: None,
        }
    }

    /// Stub source: per-email canned results, recording call order
    struct StubSource {
        responses: BTreeMap<String, std::result::Result<Vec<ModelQuota>, u16>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn new(responses: Vec<(&str, std::result::Result<Vec<ModelQuota>, u16>)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QuotaSource for StubSource {
        async fn fetch_account_quota(&self, account: &Account) -> Result<Vec<ModelQuota>> {
            self.calls.lock().unwrap().push(account.email().to_string());
            match self.responses.get(account.email()) {
                Some(Ok(models)) => Ok(models.clone()),
                Some(Err(status)) => Err(AgquotaError::TokenRefreshFailed { status: *status }),
                None => Ok(Vec::new()),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_all_accounts_isolates_failures() {
        let source = StubSource::new(vec![
            ("bad@example.com", Err(401)),
            (
                "good@example.com",
                Ok(vec![quota("Gemini 3 Pro", "gemini-3-pro", 80.0, "3h 0m")]),
            ),
        ]);
        let accounts = vec![account("bad@example.com"), account("good@example.com")];

        let outcomes = fetch_all_accounts(&source, &accounts).await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[0].result.as_ref().unwrap_err(),
            "Token failed (401)"
        );
        assert_eq!(outcomes[1].result.as_ref().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_all_accounts_preserves_input_order() {
        let source = StubSource::new(vec![]);
        let accounts = vec![
            account("c@example.com"),
            account("a@example.com"),
            account("b@example.com"),
        ];

        let outcomes = fetch_all_accounts(&source, &accounts).await;
        let emails: Vec<_> = outcomes.iter().map(|o| o.email.as_str()).collect();
        assert_eq!(
            emails,
            vec!["c@example.com", "a@example.com", "b@example.com"]
        );
        assert_eq!(*source.calls.lock().unwrap(), emails);
    }

    #[test]
    fn test_aggregate_collects_error_lines() {
        let outcomes = vec![
            AccountOutcome::failure("alice@example.com", "Token failed (401)"),
            AccountOutcome::success("bob@example.com", vec![]),
        ];

        let aggregated = aggregate_outcomes(&outcomes);
        assert_eq!(aggregated.errors, vec!["alice: Token failed (401)"]);
        assert!(aggregated.groups.is_empty());
    }

    #[test]
    fn test_aggregate_merges_identical_signatures() {
        // Two model ids with identical per-account quota state collapse
        // into one group carrying both labels.
        let outcomes = vec![AccountOutcome::success(
            "alice@example.com",
            vec![
                quota("Claude Sonnet 4.5", "claude-sonnet", 75.0, "3h 0m"),
                quota("Claude Sonnet 4.5 (Thinking)", "claude-sonnet-thinking", 75.0, "3h 0m"),
                quota("Gemini 3 Pro", "gemini-3-pro", 50.0, "1h 0m"),
            ],
        )];

        let aggregated = aggregate_outcomes(&outcomes);
        assert_eq!(aggregated.groups.len(), 2);
        assert_eq!(
            aggregated.groups[0].labels,
            vec!["Claude Sonnet 4.5", "Claude Sonnet 4.5 (Thinking)"]
        );
        assert_eq!(aggregated.groups[1].labels, vec!["Gemini 3 Pro"]);
    }

    #[test]
    fn test_aggregate_does_not_merge_different_percentages() {
        let outcomes = vec![AccountOutcome::success(
            "alice@example.com",
            vec![
                quota("Model A", "model-a", 75.0, "3h 0m"),
                quota("Model B", "model-b", 74.9, "3h 0m"),
            ],
        )];

        let aggregated = aggregate_outcomes(&outcomes);
        assert_eq!(aggregated.groups.len(), 2);
    }

    #[test]
    fn test_aggregate_groups_cross_account_contributions() {
        let outcomes = vec![
            AccountOutcome::success(
                "alice@example.com",
                vec![quota("Gemini 3 Pro", "gemini-3-pro", 50.0, "1h 0m")],
            ),
            AccountOutcome::success(
                "bob@example.com",
                vec![quota("Gemini 3 Pro", "gemini-3-pro", 90.0, "2h 0m")],
            ),
        ];

        let aggregated = aggregate_outcomes(&outcomes);
        assert_eq!(aggregated.groups.len(), 1);
        let group = &aggregated.groups[0];
        assert_eq!(group.accounts.len(), 2);
        assert_eq!(group.accounts[0].email, "alice@example.com");
        assert_eq!(group.accounts[1].email, "bob@example.com");
    }

    #[test]
    fn test_aggregate_sorts_groups_by_label() {
        let outcomes = vec![AccountOutcome::success(
            "alice@example.com",
            vec![
                quota("Zulu", "z", 10.0, "1h 0m"),
                quota("alpha", "a", 20.0, "2h 0m"),
            ],
        )];

        let aggregated = aggregate_outcomes(&outcomes);
        assert_eq!(aggregated.groups[0].labels, vec!["alpha"]);
        assert_eq!(aggregated.groups[1].labels, vec!["Zulu"]);
    }
}
