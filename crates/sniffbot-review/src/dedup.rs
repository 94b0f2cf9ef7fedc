use std::collections::HashSet;

use sniffbot_core::{CommentKey, PostedComment};

use crate::github::{PrRef, PullRequestHost};

/// Keys of comments already on the pull request or posted during this run.
///
/// # Examples
///
/// ```
/// use sniffbot_core::PostedComment;
/// use sniffbot_review::dedup::DedupIndex;
///
/// let mut index = DedupIndex::default();
/// let comment = PostedComment::inline("a.php", 3, "**PHPCS ERROR**: x\n\nSniff: `A.B`");
/// assert!(!index.contains(&comment.key()));
/// index.record(comment.key());
/// assert!(index.contains(&PostedComment::inline("a.php", 3, "**PHPCS ERROR**: x").key()));
/// ```
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashSet<CommentKey>,
}

impl DedupIndex {
    /// Build an index from comments that already exist.
    pub fn seeded(existing: impl IntoIterator<Item = PostedComment>) -> Self {
        Self {
            seen: existing.into_iter().map(|c| c.key()).collect(),
        }
    }

    /// Seed from the review comments, conversation comments, and reviews on
    /// `pr`.
    ///
    /// A failed listing is logged and contributes nothing; the run goes on
    /// with whatever could be read.
    pub async fn load(host: &dyn PullRequestHost, pr: &PrRef) -> Self {
        let mut index = Self::default();

        match host.list_review_comments(pr).await {
            Ok(comments) => index.extend(comments),
            Err(e) => tracing::warn!(%pr, error = %e, "could not list review comments; duplicates may be posted"),
        }
        match host.list_issue_comments(pr).await {
            Ok(comments) => index.extend(comments),
            Err(e) => tracing::warn!(%pr, error = %e, "could not list issue comments; duplicates may be posted"),
        }
        match host.list_reviews(pr).await {
            Ok(reviews) => index.extend(reviews),
            Err(e) => tracing::warn!(%pr, error = %e, "could not list reviews; duplicates may be posted"),
        }

        tracing::debug!(keys = index.len(), "dedup index seeded");
        index
    }

    fn extend(&mut self, comments: Vec<PostedComment>) {
        self.seen.extend(comments.iter().map(PostedComment::key));
    }

    pub fn contains(&self, key: &CommentKey) -> bool {
        self.seen.contains(key)
    }

    /// Remember a key; returns `false` if it was already known.
    pub fn record(&mut self, key: CommentKey) -> bool {
        self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_index_matches_on_first_line_only() {
        let index = DedupIndex::seeded(vec![PostedComment::inline(
            "inc/a.php",
            10,
            "**PHPCS ERROR**: Missing nonce\n\nSniff: `X`",
        )]);
        let same = PostedComment::inline("inc/a.php", 10, "**PHPCS ERROR**: Missing nonce");
        let other_line = PostedComment::inline("inc/a.php", 11, "**PHPCS ERROR**: Missing nonce");
        let other_path = PostedComment::inline("a.php", 10, "**PHPCS ERROR**: Missing nonce");
        assert!(index.contains(&same.key()));
        assert!(!index.contains(&other_line.key()));
        assert!(!index.contains(&other_path.key()));
    }

    #[test]
    fn record_reports_new_keys() {
        let mut index = DedupIndex::default();
        assert!(index.is_empty());
        let key = PostedComment::general("### PHPCS report").key();
        assert!(index.record(key.clone()));
        assert!(!index.record(key));
        assert_eq!(index.len(), 1);
    }
}
