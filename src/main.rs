use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use sniffbot_core::{LintMode, ReviewMode, SniffConfig};
use sniffbot_review::context::{resolve_pr, CiEnv, PrContext};
use sniffbot_review::github::{DryRunHost, GitHubClient, PullRequestHost};
use sniffbot_review::llm::{CompletionProvider, LlmClient};
use sniffbot_review::pipeline::{ReviewBot, RunOptions};

const CONFIG_FILE: &str = ".sniffbot.toml";

#[derive(Parser)]
#[command(
    name = "sniffbot",
    version,
    about = "Post PHPCS findings and AI diff reviews on GitHub pull requests",
    long_about = "Sniffbot runs inside a CI job triggered by a pull request. It reads the\n\
                  PHPCS JSON report produced earlier in the job, asks an LLM to review each\n\
                  changed file, and posts both as pull request comments.\n\n\
                  Examples:\n  \
                    sniffbot run                          Use the GitHub Actions environment\n  \
                    sniffbot run --repo acme/plugin --pr 42 --dry-run\n  \
                    sniffbot run --no-ai --lint-mode summary\n  \
                    sniffbot init                         Write a default .sniffbot.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .sniffbot.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Review the pull request of the current CI run
    #[command(long_about = "Review the pull request of the current CI run.\n\n\
        The pull request is taken from GITHUB_REPOSITORY and GITHUB_EVENT_PATH or\n\
        GITHUB_REF unless --repo and --pr are given. When no pull request can be\n\
        found the command logs a warning and exits successfully.\n\n\
        Failed comments are logged and counted; they never fail the job.")]
    Run {
        /// Repository as owner/repo (default: GITHUB_REPOSITORY)
        #[arg(long)]
        repo: Option<String>,

        /// Pull request number (default: from the event payload or ref)
        #[arg(long)]
        pr: Option<u64>,

        /// GitHub token with pull request write access
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// PHPCS JSON report (default: phpcs-report.json)
        #[arg(long)]
        report: Option<PathBuf>,

        /// How PHPCS findings are posted: summary, per-file, or inline
        #[arg(long)]
        lint_mode: Option<LintMode>,

        /// How AI reviews are posted: comment, review, or inline
        #[arg(long)]
        review_mode: Option<ReviewMode>,

        /// Skip the PHPCS stage
        #[arg(long)]
        no_lint: bool,

        /// Skip the AI review stage
        #[arg(long)]
        no_ai: bool,

        /// Log comments instead of posting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Create a default .sniffbot.toml configuration file
    #[command(long_about = "Create a default .sniffbot.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .sniffbot.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# Sniffbot Configuration

[github]
# api_url = "https://github.example.com/api/v3"

[llm]
# OpenAI-compatible endpoint; OPENAI_API_KEY and OPENAI_BASE_URL are read from the environment
# model = "gpt-4o-mini"
# base_url = "https://api.openai.com"
# max_tokens = 500
# temperature = 0.2

[phpcs]
# report_path = "phpcs-report.json"
# mode = "inline"          # summary | per-file | inline
# include_warnings = true

[review]
# enabled = true
# mode = "inline"          # comment | review | inline
# function_prefix = "myplugin_"
# skip_patterns = ["vendor/**", "*.min.js", "*.lock"]
"#;

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SniffConfig> {
    let mut config = match path {
        Some(path) => SniffConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                SniffConfig::from_file(default_path)?
            } else {
                SniffConfig::default()
            }
        }
    };
    config.apply_env(|k| std::env::var(k).ok());
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            repo,
            pr,
            github_token,
            report,
            lint_mode,
            review_mode,
            no_lint,
            no_ai,
            dry_run,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(path) = report {
                config.phpcs.report_path = path;
            }
            if let Some(mode) = lint_mode {
                config.phpcs.mode = mode;
            }
            if let Some(mode) = review_mode {
                config.review.mode = mode;
            }

            let env = CiEnv::from_env();
            let Some(pr_ref) = resolve_pr(&env, repo.as_deref(), pr) else {
                tracing::warn!("no pull request context; nothing to do");
                return Ok(());
            };

            let token = github_token.unwrap_or_default();
            let client = GitHubClient::new(&token, config.github.api_url.as_deref())?;
            let host: Box<dyn PullRequestHost> = if dry_run {
                tracing::info!("dry run: comments are logged, not posted");
                Box::new(DryRunHost::new(client))
            } else {
                Box::new(client)
            };

            let llm = match config.llm.api_key {
                Some(_) => Some(LlmClient::new(&config.llm)?),
                None => None,
            };

            let options = RunOptions {
                lint: !no_lint,
                ai: !no_ai,
                workspace: env
                    .workspace
                    .clone()
                    .or_else(|| std::env::current_dir().ok()),
            };

            let ctx = PrContext::load(host.as_ref(), pr_ref).await;
            let summary = ReviewBot::new(
                host.as_ref(),
                llm.as_ref().map(|c| c as &dyn CompletionProvider),
                &config,
                options,
            )
            .run(&ctx)
            .await;
            println!("{summary}");
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sniffbot", &mut std::io::stdout());
        }
    }

    Ok(())
}
