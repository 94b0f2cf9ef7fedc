use std::collections::BTreeSet;

use sniffbot_core::{DiffHunk, SniffError};

use crate::parser::parse_patch;

/// The set of new-side lines a pull request diff shows for one file.
///
/// Only these lines can carry an inline review comment on the RIGHT side;
/// GitHub rejects anything else. Context lines and added lines count,
/// removed lines do not.
///
/// # Examples
///
/// ```
/// use sniffbot_difflens::DiffLineMap;
///
/// let map = DiffLineMap::from_patch("@@ -3,2 +3,3 @@\n a\n+b\n c").unwrap();
/// assert!(map.contains(4));
/// assert!(!map.contains(0));
/// assert!(!map.contains(99));
/// assert_eq!(map.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffLineMap {
    lines: BTreeSet<u32>,
    added: BTreeSet<u32>,
}

impl DiffLineMap {
    /// Build the map from raw patch text.
    ///
    /// # Errors
    ///
    /// Returns [`SniffError::Parse`] if the patch has a malformed hunk header.
    pub fn from_patch(patch: &str) -> Result<Self, SniffError> {
        let hunks = parse_patch(patch)?;
        Ok(Self::from_hunks(&hunks))
    }

    /// Build the map from already-parsed hunks.
    pub fn from_hunks(hunks: &[DiffHunk]) -> Self {
        let mut map = Self::default();
        for hunk in hunks {
            let mut new_line = hunk.new_start;
            for line in hunk.content.lines() {
                match line.as_bytes().first() {
                    Some(b'+') => {
                        map.lines.insert(new_line);
                        map.added.insert(new_line);
                        new_line += 1;
                    }
                    Some(b' ') => {
                        map.lines.insert(new_line);
                        new_line += 1;
                    }
                    _ => {}
                }
            }
        }
        map
    }

    /// Returns `true` if `line` is a visible new-side line of the diff.
    ///
    /// Takes a signed value because line references parsed from model
    /// output may be zero or negative.
    pub fn contains(&self, line: i64) -> bool {
        u32::try_from(line).is_ok_and(|l| l > 0 && self.lines.contains(&l))
    }

    /// Returns `true` if `line` was added by the diff.
    pub fn is_added(&self, line: u32) -> bool {
        self.added.contains(&line)
    }

    /// Highest visible new-side line, if any.
    pub fn max_line(&self) -> Option<u32> {
        self.lines.last().copied()
    }

    /// Number of visible new-side lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "\
@@ -1,3 +1,4 @@
 <?php
-echo $_GET['q'];
+echo esc_html( $_GET['q'] );
+acme_log();
 exit;
@@ -20,2 +21,2 @@
 function acme_a() {}
-function b() {}
+function acme_b() {}";

    #[test]
    fn counts_context_and_added_lines() {
        let map = DiffLineMap::from_patch(PATCH).unwrap();
        for line in [1, 2, 3, 4, 21, 22] {
            assert!(map.contains(line), "line {line} should be commentable");
        }
        assert_eq!(map.len(), 6);
        assert_eq!(map.max_line(), Some(22));
    }

    #[test]
    fn gaps_between_hunks_are_not_commentable() {
        let map = DiffLineMap::from_patch(PATCH).unwrap();
        assert!(!map.contains(5));
        assert!(!map.contains(20));
        assert!(!map.contains(23));
    }

    #[test]
    fn zero_and_negative_lines_are_rejected() {
        let map = DiffLineMap::from_patch(PATCH).unwrap();
        assert!(!map.contains(0));
        assert!(!map.contains(-3));
        assert!(!map.contains(i64::from(u32::MAX) + 1));
    }

    #[test]
    fn added_lines_are_tracked() {
        let map = DiffLineMap::from_patch(PATCH).unwrap();
        assert!(map.is_added(2));
        assert!(map.is_added(3));
        assert!(!map.is_added(1));
        assert!(map.is_added(22));
    }

    #[test]
    fn deletion_only_patch_has_no_lines() {
        let map = DiffLineMap::from_patch("@@ -1,2 +0,0 @@\n-a\n-b").unwrap();
        assert!(map.is_empty());
        assert_eq!(map.max_line(), None);
    }
}
