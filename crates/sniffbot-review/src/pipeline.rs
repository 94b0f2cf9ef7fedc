use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;
use sniffbot_core::{ChangedFile, LintMode, PostedComment, ReviewMode, SniffConfig, SniffError};
use sniffbot_difflens::DiffLineMap;

use crate::context::PrContext;
use crate::dedup::DedupIndex;
use crate::github::PullRequestHost;
use crate::llm::CompletionProvider;
use crate::phpcs::{self, PhpcsReport};
use crate::prompt::{self, LineRemark};

/// Counters for one run, logged when it ends.
///
/// # Examples
///
/// ```
/// use sniffbot_review::pipeline::RunSummary;
///
/// let summary = RunSummary::default();
/// assert_eq!(summary.posted + summary.failed, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Comments, inline comments, and reviews created.
    pub posted: usize,
    /// Comments not posted because an identical one exists.
    pub skipped_duplicates: usize,
    /// Remote calls that failed and were logged.
    pub failed: usize,
    /// Completion requests sent to the model.
    pub model_calls: usize,
    /// Model line references that did not match a diff line.
    pub rejected_lines: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "posted {} | duplicates skipped {} | failed {} | model calls {} | rejected line refs {}",
            self.posted, self.skipped_duplicates, self.failed, self.model_calls, self.rejected_lines
        )
    }
}

/// Stage switches and paths for a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Post PHPCS findings.
    pub lint: bool,
    /// Send diffs to the model.
    pub ai: bool,
    /// Directory PHPCS report paths are relative to.
    pub workspace: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            lint: true,
            ai: true,
            workspace: None,
        }
    }
}

/// Sequential review run over one pull request.
///
/// Reads the PHPCS report, reviews each changed file with the model, and
/// posts everything through the host. Nothing after context resolution is
/// fatal: every remote failure is logged and the run moves on.
pub struct ReviewBot<'a> {
    host: &'a dyn PullRequestHost,
    llm: Option<&'a dyn CompletionProvider>,
    config: &'a SniffConfig,
    options: RunOptions,
}

impl<'a> ReviewBot<'a> {
    pub fn new(
        host: &'a dyn PullRequestHost,
        llm: Option<&'a dyn CompletionProvider>,
        config: &'a SniffConfig,
        options: RunOptions,
    ) -> Self {
        Self {
            host,
            llm,
            config,
            options,
        }
    }

    /// Run every enabled stage against `ctx` and return the counters.
    pub async fn run(&self, ctx: &PrContext) -> RunSummary {
        let files = match self.host.list_files(&ctx.pr).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(pr = %ctx.pr, error = %e, "could not list changed files");
                Vec::new()
            }
        };
        tracing::info!(pr = %ctx.pr, files = files.len(), "starting review run");

        let line_maps = build_line_maps(&files);
        let dedup = DedupIndex::load(self.host, &ctx.pr).await;
        let mut poster = Poster::new(self.host, ctx, dedup);

        if self.options.lint {
            self.lint_stage(&mut poster, &line_maps).await;
        } else {
            tracing::info!("PHPCS stage disabled");
        }

        match self.llm {
            Some(llm) if self.options.ai && self.config.review.enabled => {
                self.review_stage(&mut poster, llm, ctx, &files, &line_maps)
                    .await;
            }
            Some(_) => tracing::info!("AI review stage disabled"),
            None => tracing::warn!("no LLM client configured; skipping AI review"),
        }

        let summary = poster.summary;
        tracing::info!(
            posted = summary.posted,
            skipped_duplicates = summary.skipped_duplicates,
            failed = summary.failed,
            model_calls = summary.model_calls,
            rejected_lines = summary.rejected_lines,
            "run complete"
        );
        summary
    }

    async fn lint_stage(&self, poster: &mut Poster<'_>, line_maps: &HashMap<String, DiffLineMap>) {
        let cfg = &self.config.phpcs;
        let report = match PhpcsReport::load(&cfg.report_path, self.options.workspace.as_deref()) {
            Ok(Some(report)) => report.filtered(cfg.include_warnings),
            Ok(None) => {
                tracing::info!(path = %cfg.report_path.display(), "no PHPCS report; skipping static analysis");
                return;
            }
            Err(e) => {
                tracing::warn!(path = %cfg.report_path.display(), error = %e, "unusable PHPCS report; skipping static analysis");
                return;
            }
        };

        if report.is_empty() {
            tracing::info!("PHPCS report has no findings");
            return;
        }
        tracing::info!(messages = report.messages.len(), mode = %cfg.mode, "posting PHPCS findings");

        match cfg.mode {
            LintMode::Summary => {
                poster
                    .issue(PostedComment::general(phpcs::summary_body(&report.messages)))
                    .await;
            }
            LintMode::PerFile => {
                for (_, body) in phpcs::per_file_bodies(&report.messages) {
                    poster.issue(PostedComment::general(body)).await;
                }
            }
            LintMode::Inline => {
                let mut outside = Vec::new();
                for msg in report.messages {
                    let on_diff = line_maps
                        .get(&msg.path)
                        .is_some_and(|m| m.contains(i64::from(msg.line)));
                    if on_diff {
                        let comment =
                            PostedComment::inline(&msg.path, msg.line, phpcs::inline_body(&msg));
                        poster.inline(comment).await;
                    } else {
                        outside.push(msg);
                    }
                }
                if !outside.is_empty() {
                    tracing::debug!(count = outside.len(), "PHPCS findings outside the diff");
                    poster
                        .issue(PostedComment::general(phpcs::outside_diff_body(&outside)))
                        .await;
                }
            }
        }
    }

    async fn review_stage(
        &self,
        poster: &mut Poster<'_>,
        llm: &dyn CompletionProvider,
        ctx: &PrContext,
        files: &[ChangedFile],
        line_maps: &HashMap<String, DiffLineMap>,
    ) {
        let cfg = &self.config.review;
        let skip = compile_patterns(&cfg.skip_patterns);
        tracing::info!(model = llm.model(), mode = %cfg.mode, "starting AI review");

        for file in files {
            if skip.iter().any(|p| p.matches(&file.filename)) {
                tracing::debug!(path = %file.filename, "skipped by pattern");
                continue;
            }
            let patch = match file.patch.as_deref() {
                Some(patch) if file.has_patch() => patch,
                _ => {
                    tracing::debug!(path = %file.filename, status = ?file.status, "no diff to review");
                    continue;
                }
            };

            let user = prompt::build_review_prompt(
                &file.filename,
                patch,
                cfg.function_prefix.as_deref(),
            );
            poster.summary.model_calls += 1;
            let text = match llm.complete(&self.config.llm.system_prompt, &user).await {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => {
                    tracing::warn!(path = %file.filename, "model returned an empty review");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(path = %file.filename, error = %e, "model call failed");
                    continue;
                }
            };

            let heading = format!("#### AI review of `{}` @ {}", file.filename, ctx.short_sha());
            match cfg.mode {
                ReviewMode::Comment => {
                    poster
                        .issue(PostedComment::general(format!("{heading}\n\n{text}")))
                        .await;
                }
                ReviewMode::Review => {
                    // Reviews are listed back without a path, so key them the same way.
                    poster
                        .review(PostedComment::general(format!("{heading}\n\n{text}")))
                        .await;
                }
                ReviewMode::Inline => {
                    let empty = DiffLineMap::default();
                    let map = line_maps.get(&file.filename).unwrap_or(&empty);
                    self.post_inline_review(poster, &file.filename, &heading, &text, map)
                        .await;
                }
            }
        }
    }

    async fn post_inline_review(
        &self,
        poster: &mut Poster<'_>,
        path: &str,
        heading: &str,
        text: &str,
        map: &DiffLineMap,
    ) {
        let remarks = prompt::extract_line_remarks(text);
        if remarks.is_empty() {
            poster
                .issue(PostedComment::general(format!("{heading}\n\n{text}")))
                .await;
            return;
        }

        let (valid, rejected): (Vec<LineRemark>, Vec<LineRemark>) =
            remarks.into_iter().partition(|r| map.contains(r.line));

        for remark in valid {
            // `contains` only accepts positive lines that fit in u32.
            let Ok(line) = u32::try_from(remark.line) else {
                continue;
            };
            tracing::debug!(path, line, added = map.is_added(line), "inline AI remark");
            let body = format!("**AI review:** {}", remark.text);
            poster.inline(PostedComment::inline(path, line, body)).await;
        }

        if !rejected.is_empty() {
            poster.summary.rejected_lines += rejected.len();
            tracing::warn!(
                path,
                rejected = rejected.len(),
                max_line = ?map.max_line(),
                "model referenced lines outside the diff; posting them as a file comment"
            );
            let mut body = format!("{heading}\n\nNotes on lines outside the diff:\n\n");
            for r in &rejected {
                body.push_str(&format!("- Line {}: {}\n", r.cited, r.text));
            }
            poster.issue(PostedComment::general(body)).await;
        }
    }
}

fn build_line_maps(files: &[ChangedFile]) -> HashMap<String, DiffLineMap> {
    files
        .iter()
        .filter_map(|f| {
            let patch = f.patch.as_deref()?;
            match DiffLineMap::from_patch(patch) {
                Ok(map) => Some((f.filename.clone(), map)),
                Err(e) => {
                    tracing::warn!(path = %f.filename, error = %e, "could not parse patch; no inline comments for this file");
                    None
                }
            }
        })
        .collect()
}

fn compile_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!(pattern = %p, error = %e, "ignoring invalid skip pattern");
                None
            }
        })
        .collect()
}

/// The comment sink: deduplicates, sends once, and turns failures into
/// log lines and counters.
struct Poster<'a> {
    host: &'a dyn PullRequestHost,
    ctx: &'a PrContext,
    dedup: DedupIndex,
    summary: RunSummary,
}

impl<'a> Poster<'a> {
    fn new(host: &'a dyn PullRequestHost, ctx: &'a PrContext, dedup: DedupIndex) -> Self {
        Self {
            host,
            ctx,
            dedup,
            summary: RunSummary::default(),
        }
    }

    async fn issue(&mut self, comment: PostedComment) -> bool {
        let (host, ctx) = (self.host, self.ctx);
        let send = host.create_issue_comment(&ctx.pr, &comment.body);
        self.deliver(&comment, "issue comment", send).await
    }

    async fn inline(&mut self, comment: PostedComment) -> bool {
        let (Some(path), Some(line)) = (comment.path.clone(), comment.line) else {
            return self.issue(comment).await;
        };
        let (host, ctx) = (self.host, self.ctx);
        let send = host.create_review_comment(&ctx.pr, &ctx.head_sha, &path, line, &comment.body);
        self.deliver(&comment, "review comment", send).await
    }

    async fn review(&mut self, comment: PostedComment) -> bool {
        let (host, ctx) = (self.host, self.ctx);
        let send = host.create_review(&ctx.pr, &ctx.head_sha, &comment.body);
        self.deliver(&comment, "review", send).await
    }

    async fn deliver(
        &mut self,
        comment: &PostedComment,
        what: &str,
        send: impl Future<Output = Result<(), SniffError>>,
    ) -> bool {
        let key = comment.key();
        if self.dedup.contains(&key) {
            self.summary.skipped_duplicates += 1;
            tracing::debug!(path = ?key.path, line = ?key.line, "duplicate {what} skipped");
            return false;
        }

        match send.await {
            Ok(()) => {
                self.dedup.record(key);
                self.summary.posted += 1;
                true
            }
            Err(e) => {
                self.summary.failed += 1;
                tracing::warn!(
                    pr = %self.ctx.pr,
                    path = ?comment.path,
                    line = ?comment.line,
                    error = %e,
                    "failed to post {what}"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sniffbot_core::FileStatus;

    fn file(name: &str, patch: Option<&str>) -> ChangedFile {
        ChangedFile {
            filename: name.into(),
            status: FileStatus::Modified,
            additions: 1,
            deletions: 0,
            changes: 1,
            patch: patch.map(str::to_string),
        }
    }

    #[test]
    fn line_maps_skip_unparseable_and_missing_patches() {
        let files = vec![
            file("a.php", Some("@@ -1 +1,2 @@\n a\n+b")),
            file("b.png", None),
            file("c.php", Some("@@ nonsense @@\n+x")),
        ];
        let maps = build_line_maps(&files);
        assert_eq!(maps.len(), 1);
        assert!(maps["a.php"].contains(2));
    }

    #[test]
    fn invalid_patterns_are_dropped() {
        let patterns = compile_patterns(&["vendor/**".into(), "[".into()]);
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].matches("vendor/lib/a.php"));
    }

    #[test]
    fn summary_display_lists_counters() {
        let summary = RunSummary {
            posted: 3,
            failed: 1,
            ..RunSummary::default()
        };
        let text = summary.to_string();
        assert!(text.contains("posted 3"));
        assert!(text.contains("failed 1"));
    }
}
