//! Report rendering for agquota
//!
//! Produces the final Markdown-flavored text block: the cross-account
//! quota sections built by [`crate::aggregation`], followed by a Local
//! Cache section sourced purely from the credential store's rate-limit
//! ledger. Presentation order is a correctness property here, so every
//! collection is sorted explicitly before rendering.

use crate::aggregation::Aggregated;
use crate::format::{format_duration, progress_bar, short_email};
use crate::types::AccountsConfig;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Local-cache model families, in display order
///
/// Ledger keys matching neither family are omitted from the report.
const CACHE_FAMILIES: &[(&str, fn(&str) -> bool)] = &[
    ("Antigravity", |key| {
        key.starts_with("gemini-antigravity:") || key.contains("claude")
    }),
    ("Gemini CLI", |key| key.starts_with("gemini-cli:")),
];

/// Render the full quota report
pub fn render_report(aggregated: &Aggregated, config: &AccountsConfig, now: DateTime<Utc>) -> String {
    let mut output = String::from("# ☁️ Quota Status\n\n");

    if !aggregated.errors.is_empty() {
        let _ = writeln!(output, "⚠️ Errors: {}\n", aggregated.errors.join(", "));
    }

    for group in &aggregated.groups {
        let _ = writeln!(output, "### {}", group.labels.join(" / "));
        output.push_str("```text\n");
        output.push_str("QUOTA               RESET IN    ACCOUNT\n");

        // Most quota remaining first
        let mut shares = group.accounts.clone();
        shares.sort_by(|a, b| {
            b.percentage
                .partial_cmp(&a.percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for share in &shares {
            let _ = writeln!(
                output,
                "{:<20}{:<12}{}",
                progress_bar(share.percentage),
                share.reset_in,
                short_email(&share.email)
            );
        }
        output.push_str("```\n\n");
    }
    output.push('\n');

    output.push_str("---\n## 💾 Local Cache\n\n");
    output.push_str(&render_local_cache(config, now.timestamp_millis()));

    output
}

/// Render the Local Cache section from the rate-limit ledger
///
/// No network data is involved: every row comes from the store's cached
/// reset timestamps. For each model key, every account is listed, with
/// accounts missing the key treated as never having used it.
pub fn render_local_cache(config: &AccountsConfig, now_ms: i64) -> String {
    let mut output = String::new();

    let all_models: BTreeSet<&str> = config
        .accounts
        .iter()
        .flat_map(|account| account.rate_limit_reset_times.keys())
        .map(String::as_str)
        .collect();

    for (family, matches) in CACHE_FAMILIES {
        let models: Vec<&str> = all_models
            .iter()
            .copied()
            .filter(|key| matches(key))
            .collect();
        if models.is_empty() {
            continue;
        }

        let _ = writeln!(output, "### {family}\n");

        for model in models {
            let clean_name = model.rsplit(':').next().unwrap_or(model);
            let _ = writeln!(output, "#### {clean_name}");
            output.push_str("```text\n");
            output.push_str("STATUS   RESET TIME       LAST USED        ACCOUNT\n");

            let mut statuses: Vec<CachedStatus> = config
                .accounts
                .iter()
                .map(|account| {
                    let reset_time = account
                        .rate_limit_reset_times
                        .get(model)
                        .copied()
                        .unwrap_or(0);
                    CachedStatus::new(account.email(), reset_time, now_ms)
                })
                .collect();
            // Soonest-ready first
            statuses.sort_by_key(|status| status.remaining);

            for status in &statuses {
                let _ = writeln!(
                    output,
                    "{:<9}{:<17}{:<17}{}",
                    status.status, status.reset, status.last_used, status.email
                );
            }
            output.push_str("```\n\n");
        }
    }

    output
}

/// One account's cached rate-limit row for a model key
struct CachedStatus {
    email: String,
    remaining: i64,
    status: &'static str,
    reset: String,
    last_used: String,
}

impl CachedStatus {
    fn new(email: &str, reset_time: i64, now_ms: i64) -> Self {
        let remaining = reset_time - now_ms;
        let available = reset_time == 0 || remaining <= 0;

        let (reset, last_used) = if reset_time == 0 {
            ("-".to_string(), "Never used".to_string())
        } else if available {
            (
                "Ready".to_string(),
                format!("{} ago", format_duration(remaining)),
            )
        } else {
            (format_duration(remaining), "-".to_string())
        };

        Self {
            email: short_email(email).to_string(),
            remaining,
            status: if available { "READY" } else { "WAIT" },
            reset,
            last_used,
        }
    }
}
