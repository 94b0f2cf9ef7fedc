use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::github::{parse_repo_slug, PrRef, PullRequestHost};

static PULL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^refs/pull/(\d+)/").expect("pull ref regex is valid"));

/// The CI-provided values the bot reads from its environment.
#[derive(Debug, Clone, Default)]
pub struct CiEnv {
    /// `GITHUB_REPOSITORY`, as `owner/repo`.
    pub repository: Option<String>,
    /// `GITHUB_EVENT_PATH`, the webhook payload of the triggering event.
    pub event_path: Option<PathBuf>,
    /// `GITHUB_REF`, e.g. `refs/pull/42/merge`.
    pub git_ref: Option<String>,
    /// `GITHUB_WORKSPACE`, the checkout directory PHPCS ran in.
    pub workspace: Option<PathBuf>,
}

impl CiEnv {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Read values through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        Self {
            repository: get("GITHUB_REPOSITORY"),
            event_path: get("GITHUB_EVENT_PATH").map(PathBuf::from),
            git_ref: get("GITHUB_REF"),
            workspace: get("GITHUB_WORKSPACE").map(PathBuf::from),
        }
    }
}

/// The pull request this run works on, with the commit inline comments
/// anchor to.
#[derive(Debug, Clone)]
pub struct PrContext {
    pub pr: PrRef,
    /// Head commit SHA; empty when the pull request could not be fetched.
    pub head_sha: String,
}

impl PrContext {
    /// Fetch the pull request handle.
    ///
    /// A failed fetch is logged and leaves `head_sha` empty; only calls that
    /// need a commit are affected, and those fail individually.
    pub async fn load(host: &dyn PullRequestHost, pr: PrRef) -> Self {
        match host.pull_request(&pr).await {
            Ok(handle) => {
                tracing::info!(%pr, title = %handle.title, head = %handle.head.sha, "loaded pull request");
                Self {
                    pr,
                    head_sha: handle.head.sha,
                }
            }
            Err(e) => {
                tracing::warn!(%pr, error = %e, "could not fetch pull request; inline comments will fail");
                Self {
                    pr,
                    head_sha: String::new(),
                }
            }
        }
    }

    /// First seven characters of the head SHA, or `HEAD` when unknown.
    pub fn short_sha(&self) -> &str {
        if self.head_sha.is_empty() {
            "HEAD"
        } else {
            &self.head_sha[..self.head_sha.len().min(7)]
        }
    }
}

/// Find the pull request number in a webhook payload.
///
/// Looks at `pull_request.number`, then the top-level `number`, then
/// `issue.number` for comments on pull requests. Zero is never a pull
/// request number.
///
/// # Examples
///
/// ```
/// use sniffbot_review::context::pr_number_from_event;
///
/// let payload = serde_json::json!({ "action": "opened", "pull_request": { "number": 7 } });
/// assert_eq!(pr_number_from_event(&payload), Some(7));
/// assert_eq!(pr_number_from_event(&serde_json::json!({ "ref": "main" })), None);
/// ```
pub fn pr_number_from_event(payload: &serde_json::Value) -> Option<u64> {
    let number = |v: &serde_json::Value| {
        v.get("number")
            .and_then(serde_json::Value::as_u64)
            .filter(|n| *n > 0)
    };

    if let Some(n) = payload.get("pull_request").and_then(number) {
        return Some(n);
    }
    if let Some(n) = number(payload) {
        return Some(n);
    }
    let issue = payload.get("issue")?;
    issue.get("pull_request")?;
    number(issue)
}

/// Extract the number from a `refs/pull/<n>/...` ref.
///
/// # Examples
///
/// ```
/// use sniffbot_review::context::pr_number_from_ref;
///
/// assert_eq!(pr_number_from_ref("refs/pull/128/merge"), Some(128));
/// assert_eq!(pr_number_from_ref("refs/heads/main"), None);
/// ```
pub fn pr_number_from_ref(git_ref: &str) -> Option<u64> {
    PULL_REF
        .captures(git_ref.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|n| *n > 0)
}

fn read_event(path: &Path) -> Option<serde_json::Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read event payload");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "event payload is not valid JSON");
            None
        }
    }
}

/// Resolve which pull request to work on.
///
/// Explicit overrides win over the environment. Returns `None` when the
/// repository or the number cannot be determined, which the caller treats
/// as "nothing to review".
pub fn resolve_pr(env: &CiEnv, repo_override: Option<&str>, pr_override: Option<u64>) -> Option<PrRef> {
    let Some(slug) = repo_override.or(env.repository.as_deref()) else {
        tracing::warn!("no repository given and GITHUB_REPOSITORY is not set");
        return None;
    };
    let (owner, repo) = match parse_repo_slug(slug) {
        Ok(parts) => parts,
        Err(e) => {
            tracing::warn!(error = %e, "cannot use repository slug");
            return None;
        }
    };

    let number = pr_override
        .or_else(|| {
            env.event_path
                .as_deref()
                .and_then(read_event)
                .and_then(|payload| pr_number_from_event(&payload))
        })
        .or_else(|| env.git_ref.as_deref().and_then(pr_number_from_ref));

    let Some(number) = number else {
        tracing::warn!("no pull request number found in the event payload or ref");
        return None;
    };

    Some(PrRef {
        owner,
        repo,
        number,
    })
}
