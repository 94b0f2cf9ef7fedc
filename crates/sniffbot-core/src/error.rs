use std::path::PathBuf;

/// Errors that can occur across sniffbot.
///
/// Library crates use this type directly; the binary renders it through
/// `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use sniffbot_core::SniffError;
///
/// let err = SniffError::Config("missing GITHUB_TOKEN".into());
/// assert!(err.to_string().contains("missing GITHUB_TOKEN"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SniffError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(sniffbot::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(sniffbot::config),
        help("check .sniffbot.toml and the CI environment variables")
    )]
    Config(String),

    /// GitHub API failure.
    #[error("GitHub error: {0}")]
    #[diagnostic(code(sniffbot::github))]
    GitHub(String),

    /// LLM API or response error.
    #[error("LLM error: {0}")]
    #[diagnostic(code(sniffbot::llm))]
    Llm(String),

    /// The PHPCS report could not be interpreted.
    #[error("report error: {0}")]
    #[diagnostic(code(sniffbot::report))]
    Report(String),

    /// Diff parsing failure.
    #[error("parse error: {0}")]
    #[diagnostic(code(sniffbot::parse))]
    Parse(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(sniffbot::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(sniffbot::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(sniffbot::file_not_found))]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SniffError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = SniffError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = SniffError::FileNotFound(PathBuf::from("/tmp/phpcs.json"));
        assert!(err.to_string().contains("/tmp/phpcs.json"));
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: SniffError = json_err.into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
