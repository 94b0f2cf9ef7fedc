use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SniffError;

/// Top-level configuration loaded from `.sniffbot.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use sniffbot_core::{LintMode, SniffConfig};
///
/// let config = SniffConfig::default();
/// assert_eq!(config.llm.max_tokens, 500);
/// assert_eq!(config.phpcs.mode, LintMode::Inline);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SniffConfig {
    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// PHPCS report settings.
    #[serde(default)]
    pub phpcs: PhpcsConfig,
    /// AI diff review settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl SniffConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SniffError::FileNotFound`] if `path` does not exist,
    /// [`SniffError::Io`] if it cannot be read, or [`SniffError::Toml`] if
    /// the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, SniffError> {
        if !path.exists() {
            return Err(SniffError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`SniffError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use sniffbot_core::{ReviewMode, SniffConfig};
    ///
    /// let toml = r#"
    /// [review]
    /// mode = "review"
    /// function_prefix = "acme_"
    /// "#;
    /// let config = SniffConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.mode, ReviewMode::Review);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, SniffError> {
        let mut config: Self = toml::from_str(content)?;
        config.llm.max_tokens = clamp_max_tokens(config.llm.max_tokens);
        Ok(config)
    }

    /// Override file values with environment variables.
    ///
    /// Blank variables are ignored, so they never erase a file value.
    /// `lookup` is normally `|k| std::env::var(k).ok()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sniffbot_core::SniffConfig;
    ///
    /// let mut config = SniffConfig::default();
    /// config.apply_env(|k| (k == "OPENAI_API_KEY").then(|| "sk-test".to_string()));
    /// assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    /// ```
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(url) = non_empty("GITHUB_API_URL") {
            self.github.api_url = Some(url);
        }
    }
}

/// GitHub API configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Base URL of the REST API, for GitHub Enterprise installs.
    pub api_url: Option<String>,
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use sniffbot_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o-mini");
/// assert!(config.api_key.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Output budget per completion, kept within 400..=600.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Role description sent as the system message.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.2
}

fn default_system_prompt() -> String {
    "You are a senior PHP and WordPress engineer performing a pull request review. \
     You are precise, security-minded, and you only report problems you can point to in the diff."
        .into()
}

fn clamp_max_tokens(value: u32) -> u32 {
    value.clamp(400, 600)
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// PHPCS report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhpcsConfig {
    /// Location of the JSON report produced by `phpcs --report=json`.
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    /// How findings are placed on the pull request.
    #[serde(default)]
    pub mode: LintMode,
    /// Post warning-level messages as well as errors.
    #[serde(default = "default_true")]
    pub include_warnings: bool,
}

fn default_report_path() -> PathBuf {
    PathBuf::from("phpcs-report.json")
}

fn default_true() -> bool {
    true
}

impl Default for PhpcsConfig {
    fn default() -> Self {
        Self {
            report_path: default_report_path(),
            mode: LintMode::default(),
            include_warnings: true,
        }
    }
}

/// AI diff review configuration.
///
/// # Examples
///
/// ```
/// use sniffbot_core::{ReviewConfig, ReviewMode};
///
/// let config = ReviewConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.mode, ReviewMode::Inline);
/// assert!(config.function_prefix.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Run the AI review stage at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How model output is placed on the pull request.
    #[serde(default)]
    pub mode: ReviewMode,
    /// Required prefix for new PHP function names, mentioned in the prompt.
    pub function_prefix: Option<String>,
    /// Glob patterns for files that are never sent to the model.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ReviewMode::default(),
            function_prefix: None,
            skip_patterns: Vec::new(),
        }
    }
}

/// Placement of PHPCS findings.
///
/// # Examples
///
/// ```
/// use sniffbot_core::LintMode;
///
/// let mode: LintMode = "per-file".parse().unwrap();
/// assert_eq!(mode, LintMode::PerFile);
/// assert_eq!(mode.to_string(), "per-file");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LintMode {
    /// One aggregated issue comment for the whole report.
    Summary,
    /// One issue comment per reported file.
    PerFile,
    /// One inline review comment per finding on a diff line.
    #[default]
    Inline,
}

impl fmt::Display for LintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintMode::Summary => write!(f, "summary"),
            LintMode::PerFile => write!(f, "per-file"),
            LintMode::Inline => write!(f, "inline"),
        }
    }
}

impl FromStr for LintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(LintMode::Summary),
            "per-file" | "per_file" | "file" => Ok(LintMode::PerFile),
            "inline" => Ok(LintMode::Inline),
            other => Err(format!("unknown lint mode: {other}")),
        }
    }
}

/// Placement of AI review output.
///
/// # Examples
///
/// ```
/// use sniffbot_core::ReviewMode;
///
/// assert_eq!("review".parse::<ReviewMode>().unwrap(), ReviewMode::Review);
/// assert!("thread".parse::<ReviewMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewMode {
    /// One issue comment per file.
    Comment,
    /// One pull request review per file.
    Review,
    /// Inline comments on the lines the model references.
    #[default]
    Inline,
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewMode::Comment => write!(f, "comment"),
            ReviewMode::Review => write!(f, "review"),
            ReviewMode::Inline => write!(f, "inline"),
        }
    }
}

impl FromStr for ReviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comment" => Ok(ReviewMode::Comment),
            "review" => Ok(ReviewMode::Review),
            "inline" => Ok(ReviewMode::Inline),
            other => Err(format!("unknown review mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = SniffConfig::default();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 500);
        assert!(config.llm.system_prompt.contains("WordPress"));
        assert_eq!(config.phpcs.report_path, PathBuf::from("phpcs-report.json"));
        assert_eq!(config.phpcs.mode, LintMode::Inline);
        assert!(config.phpcs.include_warnings);
        assert!(config.review.enabled);
        assert_eq!(config.review.mode, ReviewMode::Inline);
        assert!(config.review.skip_patterns.is_empty());
        assert!(config.github.api_url.is_none());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = SniffConfig::from_toml("").unwrap();
        assert_eq!(config.llm.max_tokens, 500);
        assert_eq!(config.phpcs.mode, LintMode::Inline);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[github]
api_url = "https://ghe.example.com/api/v3"

[llm]
model = "gpt-4o"
base_url = "http://localhost:11434"
max_tokens = 450
temperature = 0.0

[phpcs]
report_path = "build/phpcs.json"
mode = "per-file"
include_warnings = false

[review]
mode = "comment"
function_prefix = "acme_"
skip_patterns = ["vendor/**", "*.min.js"]
"#;
        let config = SniffConfig::from_toml(toml).unwrap();
        assert_eq!(
            config.github.api_url.as_deref(),
            Some("https://ghe.example.com/api/v3")
        );
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.max_tokens, 450);
        assert_eq!(config.phpcs.report_path, PathBuf::from("build/phpcs.json"));
        assert_eq!(config.phpcs.mode, LintMode::PerFile);
        assert!(!config.phpcs.include_warnings);
        assert_eq!(config.review.mode, ReviewMode::Comment);
        assert_eq!(config.review.function_prefix.as_deref(), Some("acme_"));
        assert_eq!(config.review.skip_patterns.len(), 2);
    }

    #[test]
    fn max_tokens_is_clamped() {
        let low = SniffConfig::from_toml("[llm]\nmax_tokens = 10\n").unwrap();
        assert_eq!(low.llm.max_tokens, 400);
        let high = SniffConfig::from_toml("[llm]\nmax_tokens = 4096\n").unwrap();
        assert_eq!(high.llm.max_tokens, 600);
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(SniffConfig::from_toml("{{invalid}}").is_err());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(SniffConfig::from_toml("[phpcs]\nmode = \"everywhere\"\n").is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = SniffConfig::from_toml(
            "[llm]\napi_key = \"from-file\"\nbase_url = \"http://file\"\n\n[github]\napi_url = \"https://ghe.example/api/v3\"\n",
        )
        .unwrap();
        config.apply_env(|k| match k {
            "OPENAI_API_KEY" => Some("from-env".into()),
            "OPENAI_BASE_URL" => Some("http://env".into()),
            "GITHUB_API_URL" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.llm.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.llm.base_url.as_deref(), Some("http://env"));
        assert_eq!(config.github.api_url.as_deref(), Some("https://ghe.example/api/v3"));
    }

    #[test]
    fn modes_parse_and_display() {
        assert_eq!("SUMMARY".parse::<LintMode>().unwrap(), LintMode::Summary);
        assert_eq!("per_file".parse::<LintMode>().unwrap(), LintMode::PerFile);
        assert!("x".parse::<LintMode>().is_err());
        assert_eq!(ReviewMode::Comment.to_string(), "comment");
        assert_eq!(LintMode::Inline.to_string(), "inline");
    }

    #[test]
    fn missing_config_file_is_reported_by_path() {
        let err = SniffConfig::from_file(Path::new("/nonexistent/.sniffbot.toml")).unwrap_err();
        assert!(matches!(err, SniffError::FileNotFound(p) if p.ends_with(".sniffbot.toml")));
    }
}
