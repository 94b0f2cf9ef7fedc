use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use serde::Deserialize;
use sniffbot_core::{LintMessage, LintSeverity, SniffError};

#[derive(Deserialize)]
struct RawReport {
    files: BTreeMap<String, RawFile>,
}

#[derive(Deserialize)]
struct RawFile {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    message: String,
    #[serde(default)]
    source: String,
    #[serde(rename = "type")]
    kind: String,
    line: u32,
    #[serde(default)]
    column: u32,
    #[serde(default)]
    fixable: bool,
}

/// The messages of a PHPCS JSON report (`phpcs --report=json`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhpcsReport {
    pub messages: Vec<LintMessage>,
}

impl PhpcsReport {
    /// Load a report from disk.
    ///
    /// Returns `Ok(None)` if the file does not exist, so a missing report
    /// simply means there is nothing to post.
    ///
    /// # Errors
    ///
    /// Returns [`SniffError::Io`] if the file cannot be read or
    /// [`SniffError::Report`] if it is not a PHPCS report.
    pub fn load(path: &Path, workspace: Option<&Path>) -> Result<Option<Self>, SniffError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content, workspace).map(Some)
    }

    /// Parse report JSON, making every path relative to `workspace`.
    ///
    /// # Errors
    ///
    /// Returns [`SniffError::Report`] if the JSON does not match the report
    /// schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use sniffbot_review::phpcs::PhpcsReport;
    /// use std::path::Path;
    ///
    /// let json = r#"{"files":{"/ci/src/a.php":{"messages":[
    ///     {"message":"Missing doc comment","source":"Squiz.Commenting","type":"ERROR","line":3,"column":1}
    /// ]}}}"#;
    /// let report = PhpcsReport::from_json(json, Some(Path::new("/ci"))).unwrap();
    /// assert_eq!(report.messages[0].path, "src/a.php");
    /// ```
    pub fn from_json(content: &str, workspace: Option<&Path>) -> Result<Self, SniffError> {
        let raw: RawReport = serde_json::from_str(content)
            .map_err(|e| SniffError::Report(format!("invalid PHPCS report: {e}")))?;

        let mut messages = Vec::new();
        for (raw_path, file) in raw.files {
            let path = normalize_path(&raw_path, workspace);
            for m in file.messages {
                let Ok(severity) = m.kind.parse::<LintSeverity>() else {
                    tracing::debug!(path = %path, kind = %m.kind, "skipping message of unknown type");
                    continue;
                };
                messages.push(LintMessage {
                    path: path.clone(),
                    line: m.line,
                    column: m.column,
                    severity,
                    message: m.message,
                    source: m.source,
                    fixable: m.fixable,
                });
            }
        }
        messages.sort_by(|a, b| (&a.path, a.line, a.column).cmp(&(&b.path, b.line, b.column)));
        Ok(Self { messages })
    }

    /// Drop warnings unless `include_warnings` is set.
    pub fn filtered(mut self, include_warnings: bool) -> Self {
        if !include_warnings {
            self.messages.retain(|m| m.severity == LintSeverity::Error);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Turn a path as written by PHPCS into one relative to the repository
/// root, matching the file names of the pull request files API.
///
/// # Examples
///
/// ```
/// use sniffbot_review::phpcs::normalize_path;
/// use std::path::Path;
///
/// let ws = Path::new("/home/runner/work/plugin/plugin");
/// assert_eq!(
///     normalize_path("/home/runner/work/plugin/plugin/inc/admin.php", Some(ws)),
///     "inc/admin.php"
/// );
/// assert_eq!(normalize_path("./inc/admin.php", None), "inc/admin.php");
/// ```
pub fn normalize_path(raw: &str, workspace: Option<&Path>) -> String {
    let unified = raw.replace('\\', "/");
    let mut path = unified.as_str();

    if let Some(ws) = workspace {
        let ws = ws.to_string_lossy().replace('\\', "/");
        let ws = ws.trim_end_matches('/');
        if !ws.is_empty() {
            if let Some(rest) = path.strip_prefix(ws) {
                if rest.starts_with('/') {
                    path = rest.trim_start_matches('/');
                }
            }
        }
    }

    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.to_string()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn counts<'a>(messages: impl IntoIterator<Item = &'a LintMessage>) -> (usize, usize) {
    messages
        .into_iter()
        .fold((0, 0), |(e, w), m| match m.severity {
            LintSeverity::Error => (e + 1, w),
            LintSeverity::Warning => (e, w + 1),
        })
}

fn group_by_path(messages: &[LintMessage]) -> BTreeMap<&str, Vec<&LintMessage>> {
    let mut groups: BTreeMap<&str, Vec<&LintMessage>> = BTreeMap::new();
    for m in messages {
        groups.entry(m.path.as_str()).or_default().push(m);
    }
    groups
}

/// One Markdown bullet per message.
///
/// # Examples
///
/// ```
/// use sniffbot_core::{LintMessage, LintSeverity};
/// use sniffbot_review::phpcs::format_message_line;
///
/// let msg = LintMessage {
///     path: "a.php".into(),
///     line: 12,
///     column: 1,
///     severity: LintSeverity::Warning,
///     message: "Line exceeds 120 characters".into(),
///     source: "Generic.Files.LineLength".into(),
///     fixable: false,
/// };
/// assert_eq!(
///     format_message_line(&msg),
///     "**WARNING** line 12: Line exceeds 120 characters (`Generic.Files.LineLength`)"
/// );
/// ```
pub fn format_message_line(msg: &LintMessage) -> String {
    if msg.source.is_empty() {
        format!("**{}** line {}: {}", msg.severity, msg.line, msg.message)
    } else {
        format!(
            "**{}** line {}: {} (`{}`)",
            msg.severity, msg.line, msg.message, msg.source
        )
    }
}

/// Body of an inline comment for a single message.
pub fn inline_body(msg: &LintMessage) -> String {
    let mut body = format!("**PHPCS {}**: {}", msg.severity, msg.message);
    if !msg.source.is_empty() {
        let _ = write!(body, "\n\nSniff: `{}`", msg.source);
    }
    if msg.fixable {
        body.push_str("\n\nThis can be fixed automatically with `phpcbf`.");
    }
    body
}

/// Body of the single aggregated comment for the whole report.
pub fn summary_body(messages: &[LintMessage]) -> String {
    let groups = group_by_path(messages);
    let (errors, warnings) = counts(messages);
    let heading = format!(
        "### PHPCS report: {}, {} in {}",
        plural(errors, "error"),
        plural(warnings, "warning"),
        plural(groups.len(), "file"),
    );
    grouped_body(&heading, &groups)
}

/// Body of the comment collecting messages that cannot be placed inline.
pub fn outside_diff_body(messages: &[LintMessage]) -> String {
    let groups = group_by_path(messages);
    let heading = format!(
        "### PHPCS findings outside the diff: {}",
        plural(messages.len(), "message")
    );
    grouped_body(&heading, &groups)
}

fn grouped_body(heading: &str, groups: &BTreeMap<&str, Vec<&LintMessage>>) -> String {
    let mut body = format!("{heading}\n");
    for (path, msgs) in groups {
        let _ = write!(body, "\n#### `{path}`\n\n");
        for m in msgs {
            let _ = writeln!(body, "- {}", format_message_line(m));
        }
    }
    body
}

/// One comment body per reported file, in path order.
pub fn per_file_bodies(messages: &[LintMessage]) -> Vec<(String, String)> {
    group_by_path(messages)
        .into_iter()
        .map(|(path, msgs)| {
            let (errors, warnings) = counts(msgs.iter().copied());
            let mut body = format!(
                "### PHPCS: {}, {} in `{path}`\n\n",
                plural(errors, "error"),
                plural(warnings, "warning"),
            );
            for m in msgs {
                let _ = writeln!(body, "- {}", format_message_line(m));
            }
            (path.to_string(), body)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "totals": {"errors": 2, "warnings": 1, "fixable": 1},
        "files": {
            "/ci/plugin/tester.php": {
                "errors": 2, "warnings": 1,
                "messages": [
                    {"message": "Missing nonce verification.", "source": "WordPress.Security.NonceVerification.Missing",
                     "severity": 5, "fixable": false, "type": "ERROR", "line": 40, "column": 9},
                    {"message": "Tabs must be used to indent lines.", "source": "Generic.WhiteSpace.DisallowSpaceIndent",
                     "severity": 5, "fixable": true, "type": "ERROR", "line": 3, "column": 1},
                    {"message": "Line exceeds 100 characters.", "source": "Generic.Files.LineLength",
                     "severity": 5, "fixable": false, "type": "WARNING", "line": 39, "column": 101}
                ]
            },
            "/ci/plugin/clean.php": {"errors": 0, "warnings": 0, "messages": []}
        }
    }"#;

    fn report() -> PhpcsReport {
        PhpcsReport::from_json(REPORT, Some(Path::new("/ci/plugin/"))).unwrap()
    }

    #[test]
    fn parses_and_sorts_messages() {
        let r = report();
        assert_eq!(r.messages.len(), 3);
        assert!(r.messages.iter().all(|m| m.path == "tester.php"));
        let lines: Vec<u32> = r.messages.iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![3, 39, 40]);
        assert!(r.messages[0].fixable);
    }

    #[test]
    fn empty_report_has_no_messages() {
        let r = PhpcsReport::from_json(r#"{"totals":{},"files":{}}"#, None).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn malformed_report_is_an_error() {
        assert!(matches!(
            PhpcsReport::from_json("<html>", None),
            Err(SniffError::Report(_))
        ));
        assert!(PhpcsReport::from_json(r#"{"results":[]}"#, None).is_err());
    }

    #[test]
    fn unknown_message_type_is_skipped() {
        let json = r#"{"files":{"a.php":{"messages":[
            {"message":"x","type":"NOTICE","line":1},
            {"message":"y","type":"ERROR","line":2}
        ]}}}"#;
        let r = PhpcsReport::from_json(json, None).unwrap();
        assert_eq!(r.messages.len(), 1);
        assert_eq!(r.messages[0].message, "y");
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = PhpcsReport::load(&dir.path().join("nope.json"), None).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn filtered_drops_warnings() {
        let r = report().filtered(false);
        assert_eq!(r.messages.len(), 2);
        assert!(r.messages.iter().all(|m| m.severity == LintSeverity::Error));
    }

    #[test]
    fn normalize_keeps_foreign_paths() {
        assert_eq!(
            normalize_path("/elsewhere/a.php", Some(Path::new("/ci"))),
            "/elsewhere/a.php"
        );
        assert_eq!(
            normalize_path("/ci-other/a.php", Some(Path::new("/ci"))),
            "/ci-other/a.php"
        );
        assert_eq!(normalize_path("C:\\ci\\src\\a.php", Some(Path::new("C:\\ci"))), "src/a.php");
    }

    #[test]
    fn summary_heading_counts_everything() {
        let body = summary_body(&report().messages);
        let first = body.lines().next().unwrap();
        assert_eq!(first, "### PHPCS report: 2 errors, 1 warning in 1 file");
        assert!(body.contains("#### `tester.php`"));
        assert!(body.contains("- **ERROR** line 40: Missing nonce verification."));
    }

    #[test]
    fn per_file_body_names_the_file() {
        let bodies = per_file_bodies(&report().messages);
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].0, "tester.php");
        assert!(bodies[0]
            .1
            .starts_with("### PHPCS: 2 errors, 1 warning in `tester.php`"));
    }

    #[test]
    fn inline_body_mentions_phpcbf_when_fixable() {
        let r = report();
        let body = inline_body(&r.messages[0]);
        assert!(body.starts_with("**PHPCS ERROR**: Tabs must be used"));
        assert!(body.contains("phpcbf"));
        assert!(!inline_body(&r.messages[2]).contains("phpcbf"));
    }

    #[test]
    fn outside_diff_body_counts_messages() {
        let body = outside_diff_body(&report().messages[..1]);
        assert!(body.starts_with("### PHPCS findings outside the diff: 1 message\n"));
    }
}
