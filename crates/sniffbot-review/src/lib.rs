//! Pull request review orchestration.
//!
//! Provides the run pipeline: CI context resolution, PHPCS report
//! formatting, LLM client, prompt construction, duplicate suppression,
//! and the GitHub comment sink.

pub mod context;
pub mod dedup;
pub mod github;
pub mod llm;
pub mod phpcs;
pub mod pipeline;
pub mod prompt;
