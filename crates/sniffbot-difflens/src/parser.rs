use sniffbot_core::{DiffHunk, SniffError};

/// Parse the patch of a single file into its hunks.
///
/// Accepts both the header-less patch text of the GitHub pull request files
/// API and full `git diff` output for one file. File headers, index lines and
/// `\ No newline at end of file` markers are ignored.
///
/// # Errors
///
/// Returns [`SniffError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use sniffbot_difflens::parser::parse_patch;
///
/// let patch = "@@ -1,2 +1,3 @@\n <?php\n+echo 'hi';\n $x = 1;";
/// let hunks = parse_patch(patch).unwrap();
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].new_lines, 3);
/// ```
pub fn parse_patch(input: &str) -> Result<Vec<DiffHunk>, SniffError> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;
    // Lines still expected on each side of the current hunk.
    let mut old_left: u32 = 0;
    let mut new_left: u32 = 0;

    for line in input.lines() {
        if line.starts_with("@@ ") {
            if let Some(h) = current.take() {
                hunks.push(h);
            }
            let (old_start, old_lines, new_start, new_lines) = parse_hunk_header(line)?;
            old_left = old_lines;
            new_left = new_lines;
            current = Some(DiffHunk {
                old_start,
                old_lines,
                new_start,
                new_lines,
                content: String::new(),
            });
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            // Preamble: `diff --git`, `index`, `---`, `+++`, mode lines.
            continue;
        };

        if line.starts_with("\\ ") {
            continue;
        }

        if old_left == 0 && new_left == 0 {
            // Trailing text after a complete hunk, e.g. the next file's header.
            continue;
        }

        match line.as_bytes().first() {
            Some(b'+') => new_left = new_left.saturating_sub(1),
            Some(b'-') => old_left = old_left.saturating_sub(1),
            Some(b' ') => {
                old_left = old_left.saturating_sub(1);
                new_left = new_left.saturating_sub(1);
            }
            None => {
                // Context line whose single space was stripped in transit.
                old_left = old_left.saturating_sub(1);
                new_left = new_left.saturating_sub(1);
                hunk.content.push_str(" \n");
                continue;
            }
            _ => continue,
        }
        hunk.content.push_str(line);
        hunk.content.push('\n');
    }

    if let Some(h) = current.take() {
        hunks.push(h);
    }

    Ok(hunks)
}

fn parse_hunk_header(line: &str) -> Result<(u32, u32, u32, u32), SniffError> {
    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(|| SniffError::Parse(format!("invalid hunk header: {line}")))?;

    let parts: Vec<&str> = inner.split(' ').collect();
    if parts.len() != 2 {
        return Err(SniffError::Parse(format!("invalid hunk header: {line}")));
    }

    let old = parts[0]
        .strip_prefix('-')
        .ok_or_else(|| SniffError::Parse(format!("invalid old range in hunk: {line}")))?;
    let new = parts[1]
        .strip_prefix('+')
        .ok_or_else(|| SniffError::Parse(format!("invalid new range in hunk: {line}")))?;

    let (old_start, old_lines) = parse_range(old, line)?;
    let (new_start, new_lines) = parse_range(new, line)?;

    Ok((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32), SniffError> {
    if let Some((start, count)) = range.split_once(',') {
        let s = start
            .parse()
            .map_err(|_| SniffError::Parse(format!("invalid range number in: {context}")))?;
        let c = count
            .parse()
            .map_err(|_| SniffError::Parse(format!("invalid range count in: {context}")))?;
        Ok((s, c))
    } else {
        let s = range
            .parse()
            .map_err(|_| SniffError::Parse(format!("invalid range number in: {context}")))?;
        Ok((s, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_returns_empty_vec() {
        assert!(parse_patch("").unwrap().is_empty());
    }

    #[test]
    fn github_style_patch_without_headers() {
        let patch = "\
@@ -1,3 +1,4 @@
 <?php
+add_action( 'init', 'acme_boot' );
 function acme_boot() {
 }";
        let hunks = parse_patch(patch).unwrap();
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].old_start, 1);
        assert_eq!(hunks[0].old_lines, 3);
        assert_eq!(hunks[0].new_start, 1);
        assert_eq!(hunks[0].new_lines, 4);
        assert!(hunks[0].content.contains("+add_action"));
    }

    #[test]
    fn git_headers_are_skipped() {
        let patch = "\
diff --git a/a.php b/a.php
index abc1234..def5678 100644
--- a/a.php
+++ b/a.php
@@ -1 +1,2 @@
 <?php
+echo 1;
";
        let hunks = parse_patch(patch).unwrap();
        assert_eq!(hunks.len(), 1);
        assert!(!hunks[0].content.contains("+++"));
        assert!(!hunks[0].content.contains("---"));
    }

    #[test]
    fn multiple_hunks() {
        let patch = "\
@@ -1,2 +1,3 @@
 a
+b
 c
@@ -10,2 +11,3 @@ function acme_x() {
 d
+e
 f";
        let hunks = parse_patch(patch).unwrap();
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[1].old_start, 10);
        assert_eq!(hunks[1].new_start, 11);
    }

    #[test]
    fn no_newline_marker_is_dropped() {
        let patch = "\
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file";
        let hunks = parse_patch(patch).unwrap();
        assert!(!hunks[0].content.contains("No newline"));
        assert!(hunks[0].content.contains("-old"));
        assert!(hunks[0].content.contains("+new"));
    }

    #[test]
    fn stripped_context_line_is_kept() {
        let patch = "@@ -1,3 +1,3 @@\n a\n\n b";
        let hunks = parse_patch(patch).unwrap();
        assert_eq!(hunks[0].content, " a\n \n b\n");
    }

    #[test]
    fn single_line_ranges_default_to_one() {
        let (os, ol, ns, nl) = parse_hunk_header("@@ -7 +9 @@").unwrap();
        assert_eq!((os, ol, ns, nl), (7, 1, 9, 1));
    }

    #[test]
    fn malformed_header_is_an_error() {
        assert!(parse_patch("@@ -x,1 +1,1 @@\n a").is_err());
        assert!(parse_patch("@@ broken\n a").is_err());
    }
}
