use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sniffbot_core::{ChangedFile, PostedComment, SniffError};

const PER_PAGE: usize = 100;
// The files endpoint stops at 3000 entries.
const MAX_PAGES: u32 = 30;

/// Coordinates of a pull request.
///
/// # Examples
///
/// ```
/// use sniffbot_review::github::PrRef;
///
/// let pr = PrRef {
///     owner: "octocat".into(),
///     repo: "hello-world".into(),
///     number: 42,
/// };
/// assert_eq!(pr.to_string(), "octocat/hello-world#42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl std::fmt::Display for PrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Split an `owner/repo` slug such as `GITHUB_REPOSITORY`.
///
/// # Errors
///
/// Returns [`SniffError::Config`] if either half is missing.
///
/// # Examples
///
/// ```
/// use sniffbot_review::github::parse_repo_slug;
///
/// let (owner, repo) = parse_repo_slug("rust-lang/rust").unwrap();
/// assert_eq!((owner.as_str(), repo.as_str()), ("rust-lang", "rust"));
/// assert!(parse_repo_slug("rust").is_err());
/// ```
pub fn parse_repo_slug(slug: &str) -> Result<(String, String), SniffError> {
    match slug.trim().split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(SniffError::Config(format!(
            "invalid repository '{slug}', expected owner/repo"
        ))),
    }
}

/// The pull request handle the bot works against.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub head: HeadRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadRef {
    pub sha: String,
}

#[derive(Deserialize)]
struct ReviewCommentResponse {
    path: String,
    line: Option<u32>,
    original_line: Option<u32>,
    #[serde(default)]
    body: String,
}

#[derive(Deserialize)]
struct ReviewResponse {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Deserialize)]
struct IssueCommentResponse {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Serialize)]
struct Page {
    per_page: usize,
    page: u32,
}

/// Read and write operations the bot needs from the hosting service.
///
/// Every write is a single attempt; callers decide what a failure means.
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Fetch the pull request itself.
    async fn pull_request(&self, pr: &PrRef) -> Result<PullRequest, SniffError>;

    /// List the changed files with their patches.
    async fn list_files(&self, pr: &PrRef) -> Result<Vec<ChangedFile>, SniffError>;

    /// List existing inline review comments.
    async fn list_review_comments(&self, pr: &PrRef) -> Result<Vec<PostedComment>, SniffError>;

    /// List existing conversation comments.
    async fn list_issue_comments(&self, pr: &PrRef) -> Result<Vec<PostedComment>, SniffError>;

    /// List submitted reviews as general comments.
    async fn list_reviews(&self, pr: &PrRef) -> Result<Vec<PostedComment>, SniffError>;

    /// Post a conversation-level comment.
    async fn create_issue_comment(&self, pr: &PrRef, body: &str) -> Result<(), SniffError>;

    /// Post an inline comment on the RIGHT side of `path:line`.
    async fn create_review_comment(
        &self,
        pr: &PrRef,
        commit_id: &str,
        path: &str,
        line: u32,
        body: &str,
    ) -> Result<(), SniffError>;

    /// Submit a review with the `COMMENT` event and no inline comments.
    async fn create_review(&self, pr: &PrRef, commit_id: &str, body: &str)
        -> Result<(), SniffError>;
}

/// GitHub REST client backed by `octocrab`.
///
/// # Examples
///
/// ```no_run
/// use sniffbot_review::github::GitHubClient;
///
/// let client = GitHubClient::new("ghp_xxxx", None).unwrap();
/// ```
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
}

impl GitHubClient {
    /// Create a client for `token`, optionally against a GitHub Enterprise
    /// API root.
    ///
    /// # Errors
    ///
    /// Returns [`SniffError::Config`] for an empty token or bad URL, or
    /// [`SniffError::GitHub`] if the client cannot be built.
    pub fn new(token: &str, api_url: Option<&str>) -> Result<Self, SniffError> {
        if token.trim().is_empty() {
            return Err(SniffError::Config(
                "GITHUB_TOKEN not set. Pass --github-token or set GITHUB_TOKEN env var".into(),
            ));
        }

        let mut builder = octocrab::Octocrab::builder().personal_token(token.to_string());
        if let Some(url) = api_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| SniffError::Config(format!("invalid GitHub API URL '{url}': {e}")))?;
        }
        let octocrab = builder
            .build()
            .map_err(|e| SniffError::GitHub(format!("failed to create GitHub client: {e}")))?;

        Ok(Self { octocrab })
    }

    async fn get_paginated<T: DeserializeOwned>(&self, route: &str) -> Result<Vec<T>, SniffError> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch: Vec<T> = self
                .octocrab
                .get(
                    route,
                    Some(&Page {
                        per_page: PER_PAGE,
                        page,
                    }),
                )
                .await
                .map_err(|e| SniffError::GitHub(format!("GET {route} failed: {e}")))?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    async fn post_json(&self, route: String, body: serde_json::Value) -> Result<(), SniffError> {
        let _response: serde_json::Value = self
            .octocrab
            .post(&route, Some(&body))
            .await
            .map_err(|e| SniffError::GitHub(format!("POST {route} failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl PullRequestHost for GitHubClient {
    async fn pull_request(&self, pr: &PrRef) -> Result<PullRequest, SniffError> {
        let route = format!("/repos/{}/{}/pulls/{}", pr.owner, pr.repo, pr.number);
        self.octocrab
            .get(&route, None::<&()>)
            .await
            .map_err(|e| SniffError::GitHub(format!("failed to fetch {pr}: {e}")))
    }

    async fn list_files(&self, pr: &PrRef) -> Result<Vec<ChangedFile>, SniffError> {
        let route = format!("/repos/{}/{}/pulls/{}/files", pr.owner, pr.repo, pr.number);
        self.get_paginated(&route).await
    }

    async fn list_review_comments(&self, pr: &PrRef) -> Result<Vec<PostedComment>, SniffError> {
        let route = format!("/repos/{}/{}/pulls/{}/comments", pr.owner, pr.repo, pr.number);
        let raw: Vec<ReviewCommentResponse> = self.get_paginated(&route).await?;
        Ok(raw
            .into_iter()
            .map(|c| PostedComment {
                path: Some(c.path),
                line: c.line.or(c.original_line),
                body: c.body,
            })
            .collect())
    }

    async fn list_issue_comments(&self, pr: &PrRef) -> Result<Vec<PostedComment>, SniffError> {
        let route = format!("/repos/{}/{}/issues/{}/comments", pr.owner, pr.repo, pr.number);
        let raw: Vec<IssueCommentResponse> = self.get_paginated(&route).await?;
        Ok(raw
            .into_iter()
            .map(|c| PostedComment::general(c.body.unwrap_or_default()))
            .collect())
    }

    async fn list_reviews(&self, pr: &PrRef) -> Result<Vec<PostedComment>, SniffError> {
        let route = format!("/repos/{}/{}/pulls/{}/reviews", pr.owner, pr.repo, pr.number);
        let raw: Vec<ReviewResponse> = self.get_paginated(&route).await?;
        Ok(raw
            .into_iter()
            .filter_map(|r| r.body.filter(|b| !b.trim().is_empty()))
            .map(PostedComment::general)
            .collect())
    }

    async fn create_issue_comment(&self, pr: &PrRef, body: &str) -> Result<(), SniffError> {
        let route = format!("/repos/{}/{}/issues/{}/comments", pr.owner, pr.repo, pr.number);
        self.post_json(route, serde_json::json!({ "body": body }))
            .await
    }

    async fn create_review_comment(
        &self,
        pr: &PrRef,
        commit_id: &str,
        path: &str,
        line: u32,
        body: &str,
    ) -> Result<(), SniffError> {
        let route = format!("/repos/{}/{}/pulls/{}/comments", pr.owner, pr.repo, pr.number);
        self.post_json(
            route,
            serde_json::json!({
                "body": body,
                "commit_id": commit_id,
                "path": path,
                "line": line,
                "side": "RIGHT",
            }),
        )
        .await
    }

    async fn create_review(
        &self,
        pr: &PrRef,
        commit_id: &str,
        body: &str,
    ) -> Result<(), SniffError> {
        let route = format!("/repos/{}/{}/pulls/{}/reviews", pr.owner, pr.repo, pr.number);
        self.post_json(
            route,
            serde_json::json!({
                "commit_id": commit_id,
                "body": body,
                "event": "COMMENT",
            }),
        )
        .await
    }
}

/// Wraps a host so that reads go through and writes are only logged.
pub struct DryRunHost<H> {
    inner: H,
}

impl<H: PullRequestHost> DryRunHost<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H: PullRequestHost> PullRequestHost for DryRunHost<H> {
    async fn pull_request(&self, pr: &PrRef) -> Result<PullRequest, SniffError> {
        self.inner.pull_request(pr).await
    }

    async fn list_files(&self, pr: &PrRef) -> Result<Vec<ChangedFile>, SniffError> {
        self.inner.list_files(pr).await
    }

    async fn list_review_comments(&self, pr: &PrRef) -> Result<Vec<PostedComment>, SniffError> {
        self.inner.list_review_comments(pr).await
    }

    async fn list_issue_comments(&self, pr: &PrRef) -> Result<Vec<PostedComment>, SniffError> {
        self.inner.list_issue_comments(pr).await
    }

    async fn list_reviews(&self, pr: &PrRef) -> Result<Vec<PostedComment>, SniffError> {
        self.inner.list_reviews(pr).await
    }

    async fn create_issue_comment(&self, pr: &PrRef, body: &str) -> Result<(), SniffError> {
        tracing::info!(%pr, "dry-run: issue comment\n{body}");
        Ok(())
    }

    async fn create_review_comment(
        &self,
        pr: &PrRef,
        _commit_id: &str,
        path: &str,
        line: u32,
        body: &str,
    ) -> Result<(), SniffError> {
        tracing::info!(%pr, path, line, "dry-run: review comment\n{body}");
        Ok(())
    }

    async fn create_review(
        &self,
        pr: &PrRef,
        _commit_id: &str,
        body: &str,
    ) -> Result<(), SniffError> {
        tracing::info!(%pr, "dry-run: review\n{body}");
        Ok(())
    }
}
