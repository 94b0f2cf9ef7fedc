//! Core types, configuration, and error handling for sniffbot.
//!
//! This crate provides the shared foundation used by the other sniffbot crates:
//! - [`SniffError`]: unified error type using `thiserror` and `miette`
//! - [`SniffConfig`]: configuration loaded from `.sniffbot.toml`
//! - Shared types: [`LintMessage`], [`LintSeverity`], [`ChangedFile`],
//!   [`DiffHunk`], [`PostedComment`], [`CommentKey`]

mod config;
mod error;
mod types;

pub use config::{GitHubConfig, LintMode, LlmConfig, PhpcsConfig, ReviewConfig, ReviewMode, SniffConfig};
pub use error::SniffError;
pub use types::{
    ChangedFile, CommentKey, DiffHunk, FileStatus, LintMessage, LintSeverity, PostedComment,
};

/// A convenience `Result` type for sniffbot operations.
pub type Result<T> = std::result::Result<T, SniffError>;
