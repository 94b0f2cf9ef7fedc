//! Patch parsing and line mapping for pull request diffs.
//!
//! Turns the per-file patch text GitHub returns into hunks, and answers
//! whether a given new-side line can carry an inline review comment.

pub mod linemap;
pub mod parser;

pub use linemap::DiffLineMap;
