use std::sync::LazyLock;

use regex::Regex;

/// Matches `Line 12:` style references, optionally bolded, bulleted, or
/// written as a range (`Lines 4-6:` anchors on the first line).
static LINE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*]\s+|\d+\.\s+)?(?:\*\*)?lines?\s+(-?\d+)(?:\s*-\s*\d+)?\s*(?:\*\*)?\s*:\s*(?:\*\*)?\s*(.*)$")
        .expect("line marker regex is valid")
});

/// A model remark anchored on a line of the reviewed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRemark {
    /// Line number as written by the model; may be zero, negative, or
    /// outside the diff. Saturates at the `i64` bounds.
    pub line: i64,
    /// The number exactly as the model wrote it.
    pub cited: String,
    /// The remark text following the marker.
    pub text: String,
}

/// Build the user prompt for reviewing one file's diff.
///
/// # Examples
///
/// ```
/// use sniffbot_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt("inc/form.php", "+echo $_POST['x'];", Some("acme_"));
/// assert!(prompt.contains("inc/form.php"));
/// assert!(prompt.contains("acme_"));
/// assert!(prompt.contains("+echo $_POST['x'];"));
/// ```
pub fn build_review_prompt(path: &str, diff: &str, function_prefix: Option<&str>) -> String {
    let mut prompt = String::from(
        "Review the following pull request diff and check:\n\
         1. Compliance with the WordPress PHP Coding Standards.\n\
         2. Security:\n\
         \x20  - sanitization and validation of all input ($_GET, $_POST, $_REQUEST, $_COOKIE)\n\
         \x20  - escaping of all output (esc_html, esc_attr, esc_url, wp_kses)\n\
         \x20  - nonce verification for form submissions and state-changing requests\n\
         \x20  - SQL injection (queries must go through $wpdb->prepare)\n\
         \x20  - cross-site scripting (XSS)\n",
    );
    match function_prefix {
        Some(prefix) if !prefix.is_empty() => prompt.push_str(&format!(
            "3. Project conventions: every new global function, hook callback, and option name must be prefixed with `{prefix}`.\n"
        )),
        _ => prompt.push_str(
            "3. Project conventions: new global functions should carry a unique project prefix.\n",
        ),
    }
    prompt.push_str(
        "\nReport each finding on its own line in the form `Line N: <problem and fix>`, \
         where N is the line number in the new version of the file. \
         Only reference lines that appear in the diff. \
         If there is nothing to report, say so in one sentence.\n",
    );
    prompt.push_str(&format!("\nFile: `{path}`\n\n```diff\n{diff}\n```\n"));
    prompt
}

/// Extract `Line N: ...` remarks from model output, in order.
///
/// Lines without a marker are ignored. The returned line numbers are not
/// validated here.
///
/// # Examples
///
/// ```
/// use sniffbot_review::prompt::extract_line_remarks;
///
/// let remarks = extract_line_remarks("Overview\nLine 4: escape this\n- **Line 9:** add a nonce");
/// assert_eq!(remarks.len(), 2);
/// assert_eq!(remarks[0].line, 4);
/// assert_eq!(remarks[1].text, "add a nonce");
/// ```
pub fn extract_line_remarks(text: &str) -> Vec<LineRemark> {
    text.lines()
        .filter_map(|line| {
            let caps = LINE_MARKER.captures(line)?;
            let cited = caps.get(1)?.as_str();
            let remark = caps
                .get(2)
                .map(|m| m.as_str().trim().trim_end_matches("**").trim())
                .unwrap_or_default();
            Some(LineRemark {
                line: parse_line_number(cited),
                cited: cited.to_string(),
                text: remark.to_string(),
            })
        })
        .filter(|r| !r.text.is_empty())
        .collect()
}

/// Parse a `-?\d+` capture; values beyond `i64` saturate so they are still
/// rejected as out of range instead of vanishing.
fn parse_line_number(digits: &str) -> i64 {
    digits.parse().unwrap_or(if digits.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_security_concerns() {
        let prompt = build_review_prompt("a.php", "+x", None);
        for needle in ["sanitization", "escaping", "nonce", "$wpdb->prepare", "XSS"] {
            assert!(prompt.contains(needle), "missing {needle}");
        }
        assert!(prompt.contains("```diff\n+x\n```"));
    }

    #[test]
    fn prompt_without_prefix_uses_generic_convention() {
        let prompt = build_review_prompt("a.php", "+x", Some(""));
        assert!(prompt.contains("unique project prefix"));
    }

    #[test]
    fn prompt_asks_for_line_markers() {
        let prompt = build_review_prompt("a.php", "+x", None);
        assert!(prompt.contains("Line N:"));
    }

    #[test]
    fn extracts_plain_markers_case_insensitively() {
        let remarks = extract_line_remarks("line 3: a\nLINE 10: b");
        assert_eq!(
            remarks,
            vec![
                LineRemark {
                    line: 3,
                    cited: "3".into(),
                    text: "a".into()
                },
                LineRemark {
                    line: 10,
                    cited: "10".into(),
                    text: "b".into()
                },
            ]
        );
    }

    #[test]
    fn extracts_bulleted_and_bold_markers() {
        let text = "* **Line 7**: missing esc_html\n1. Line 8: use $wpdb->prepare\n- **Line 9: nonce missing**";
        let remarks = extract_line_remarks(text);
        assert_eq!(remarks.len(), 3);
        assert_eq!(remarks[0].line, 7);
        assert_eq!(remarks[0].text, "missing esc_html");
        assert_eq!(remarks[1].line, 8);
        assert_eq!(remarks[2].text, "nonce missing");
    }

    #[test]
    fn range_anchors_on_first_line() {
        let remarks = extract_line_remarks("Lines 4-6: duplicated block");
        assert_eq!(remarks[0].line, 4);
    }

    #[test]
    fn keeps_zero_and_negative_numbers_for_later_validation() {
        let remarks = extract_line_remarks("Line 0: first\nLine -2: second");
        assert_eq!(remarks[0].line, 0);
        assert_eq!(remarks[1].line, -2);
    }

    #[test]
    fn ignores_mid_sentence_mentions_and_empty_remarks() {
        let remarks = extract_line_remarks("As noted on line 5: see above\nLine 6:   ");
        assert!(remarks.is_empty());
    }

    #[test]
    fn oversized_numbers_saturate_instead_of_dropping_the_remark() {
        let remarks = extract_line_remarks(
            "Line 2: fine\nLine 99999999999999999999: SQL injection here.\nLine -99999999999999999999: odd",
        );
        assert_eq!(remarks.len(), 3);
        assert_eq!(remarks[1].line, i64::MAX);
        assert_eq!(remarks[1].cited, "99999999999999999999");
        assert_eq!(remarks[1].text, "SQL injection here.");
        assert_eq!(remarks[2].line, i64::MIN);
    }
}
