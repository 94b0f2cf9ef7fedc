use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity of a PHPCS message, taken from its `type` field.
///
/// # Examples
///
/// ```
/// use sniffbot_core::LintSeverity;
///
/// let s: LintSeverity = serde_json::from_str("\"ERROR\"").unwrap();
/// assert_eq!(s, LintSeverity::Error);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LintSeverity {
    /// A coding-standard violation that fails the sniff.
    Error,
    /// A coding-standard recommendation.
    Warning,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintSeverity::Error => write!(f, "ERROR"),
            LintSeverity::Warning => write!(f, "WARNING"),
        }
    }
}

impl FromStr for LintSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LintSeverity::Error),
            "warning" => Ok(LintSeverity::Warning),
            other => Err(format!("unknown lint severity: {other}")),
        }
    }
}

/// A single finding from a PHPCS report, with its path already made
/// repository-relative.
///
/// # Examples
///
/// ```
/// use sniffbot_core::{LintMessage, LintSeverity};
///
/// let msg = LintMessage {
///     path: "inc/admin.php".into(),
///     line: 12,
///     column: 5,
///     severity: LintSeverity::Error,
///     message: "Missing nonce verification".into(),
///     source: "WordPress.Security.NonceVerification.Missing".into(),
///     fixable: false,
/// };
/// assert_eq!(msg.severity, LintSeverity::Error);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintMessage {
    /// Repository-relative file path.
    pub path: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (0 when the report omits it).
    pub column: u32,
    /// Error or warning.
    pub severity: LintSeverity,
    /// Human-readable message text.
    pub message: String,
    /// Sniff code that produced the message.
    pub source: String,
    /// Whether `phpcbf` can fix it automatically.
    pub fixable: bool,
}

/// Change status of a pull request file as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    #[serde(other)]
    Unknown,
}

/// One file of a pull request with its patch text.
///
/// # Examples
///
/// ```
/// use sniffbot_core::{ChangedFile, FileStatus};
///
/// let json = r#"{"filename":"plugin.php","status":"modified","additions":2,
///               "deletions":0,"changes":2,"patch":"@@ -1 +1,3 @@\n line\n+a\n+b"}"#;
/// let file: ChangedFile = serde_json::from_str(json).unwrap();
/// assert_eq!(file.status, FileStatus::Modified);
/// assert!(file.has_patch());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Repository-relative path in the new version.
    pub filename: String,
    /// Change status.
    pub status: FileStatus,
    /// Added line count.
    #[serde(default)]
    pub additions: u32,
    /// Deleted line count.
    #[serde(default)]
    pub deletions: u32,
    /// Total changed line count.
    #[serde(default)]
    pub changes: u32,
    /// Unified patch text; absent for binary or oversized files.
    #[serde(default)]
    pub patch: Option<String>,
}

impl ChangedFile {
    /// Returns `true` if the file carries a non-blank patch.
    pub fn has_patch(&self) -> bool {
        self.patch.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// A single hunk from a unified diff.
///
/// # Examples
///
/// ```
/// use sniffbot_core::DiffHunk;
///
/// let hunk = DiffHunk {
///     old_start: 10,
///     old_lines: 5,
///     new_start: 10,
///     new_lines: 8,
///     content: "+ new line\n- old line\n".into(),
/// };
/// assert_eq!(hunk.new_lines, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
    /// Raw diff content for this hunk.
    pub content: String,
}

/// A comment as it is (or was) placed on a pull request.
///
/// `path` and `line` are both `None` for conversation-level comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedComment {
    /// File the comment is anchored on.
    pub path: Option<String>,
    /// New-side line the comment is anchored on.
    pub line: Option<u32>,
    /// Markdown body.
    pub body: String,
}

impl PostedComment {
    /// A conversation-level comment.
    pub fn general(body: impl Into<String>) -> Self {
        Self {
            path: None,
            line: None,
            body: body.into(),
        }
    }

    /// A comment anchored on `path:line`.
    pub fn inline(path: impl Into<String>, line: u32, body: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            line: Some(line),
            body: body.into(),
        }
    }

    /// Identity used for duplicate suppression.
    pub fn key(&self) -> CommentKey {
        CommentKey::new(self.path.as_deref(), self.line, &self.body)
    }
}

/// Identity of a comment for duplicate suppression: path, line, and the
/// first non-empty line of the body.
///
/// # Examples
///
/// ```
/// use sniffbot_core::CommentKey;
///
/// let a = CommentKey::new(Some("a.php"), Some(3), "\n  **ERROR** bad  \nmore");
/// let b = CommentKey::new(Some("a.php"), Some(3), "**ERROR** bad\nother details");
/// assert_eq!(a, b);
/// assert_eq!(a.head, "**ERROR** bad");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommentKey {
    pub path: Option<String>,
    pub line: Option<u32>,
    pub head: String,
}

impl CommentKey {
    pub fn new(path: Option<&str>, line: Option<u32>, body: &str) -> Self {
        let head = body
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string();
        Self {
            path: path.map(str::to_string),
            line,
            head,
        }
    }
}
