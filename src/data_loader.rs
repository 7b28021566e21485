//! Credential store discovery and bootstrap artifacts
//!
//! The credential store (`antigravity-accounts.json`) is written by the
//! `opencode-antigravity-auth` component; this module only reads it.
//! Two candidate locations are probed in order: the platform config
//! directory and the platform data directory (the alternate auth
//! plugin writes there). A missing store is a reportable condition, not
//! a crash.

use crate::error::{AgquotaError, Result};
use crate::types::AccountsConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the credential store
const CONFIG_FILE_NAME: &str = "antigravity-accounts.json";

/// Command file exposing the quota tool to the opencode host
const COMMAND_FILE_NAME: &str = "antigravity-quota.md";

/// Content of the command file created by [`ensure_bootstrap_artifacts`]
const COMMAND_CONTENT: &str = r#"---
description: Check Antigravity quota status for all configured Google accounts
---

Use the `antigravity_quota` tool to check the current quota status.

This will show:
- API quota remaining for each model (Gemini 3 Pro, Flash, Claude via Antigravity)
- Per-account breakdown with visual progress bars
- Time until quota reset
- Local rate limit cache status

Just call the tool directly:
```
antigravity_quota()
```

IMPORTANT: Display the tool output EXACTLY as it is returned. Do not summarize, reformat, or modify the output in any way.
"#;

/// Platform base directory for opencode configuration
fn opencode_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("opencode"))
}

/// Candidate store locations, primary first, deduplicated
///
/// On Windows the config and data directories coincide, so the list
/// collapses to a single entry there.
pub fn candidate_config_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = opencode_config_dir() {
        candidates.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Some(dir) = dirs::data_dir() {
        let path = dir.join("opencode").join(CONFIG_FILE_NAME);
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }
    candidates
}

/// Load and normalize the credential store
///
/// With an explicit `path` only that location is consulted; otherwise
/// the first existing candidate wins. Accounts without an email get
/// their deterministic `account-<n>` placeholder here, so every later
/// stage can rely on a non-empty display name.
pub fn load_accounts_config(path: Option<&Path>) -> Result<AccountsConfig> {
    let config_path = match path {
        Some(explicit) => {
            if !explicit.exists() {
                return Err(AgquotaError::ConfigNotFound {
                    path: explicit.to_path_buf(),
                });
            }
            explicit.to_path_buf()
        }
        None => {
            let candidates = candidate_config_paths();
            candidates
                .iter()
                .find(|candidate| candidate.exists())
                .cloned()
                .ok_or_else(|| AgquotaError::ConfigNotFound {
                    path: candidates
                        .first()
                        .cloned()
                        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
                })?
        }
    };

    debug!("loading credential store from {}", config_path.display());
    let content = fs::read_to_string(&config_path)?;
    let mut config: AccountsConfig = serde_json::from_str(&content)?;
    config.assign_placeholder_emails();
    info!(
        "loaded {} accounts from {}",
        config.accounts.len(),
        config_path.display()
    );
    Ok(config)
}

/// Idempotently create the opencode command file
///
/// Replaces what used to be a module-load side effect in earlier
/// versions of this tool: the host calls it once before first use and
/// decides how to surface a failure. Returns the command file path.
pub fn ensure_bootstrap_artifacts() -> Result<PathBuf> {
    let Some(command_dir) = opencode_config_dir().map(|dir| dir.join("command")) else {
        return Err(AgquotaError::Io(std::io::Error::other(
            "no platform config directory",
        )));
    };

    fs::create_dir_all(&command_dir)?;
    let command_file = command_dir.join(COMMAND_FILE_NAME);
    if !command_file.exists() {
        fs::write(&command_file, COMMAND_CONTENT)?;
        info!("created command file at {}", command_file.display());
    }
    Ok(command_file)
}
