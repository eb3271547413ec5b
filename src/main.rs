use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sbs_discovery::cli::commands::discover::DiscoverOptions;
use sbs_discovery::{Config, ConfigLoader, DiscoveryError, exit_code};

#[derive(Parser)]
#[command(name = "sbs-discovery")]
#[command(
    version,
    about = "Discover self-built, deployable software across GitHub repositories"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the global and project files
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover self-built components in an organization or repository
    Discover {
        #[arg(long, help = "GitHub organization to scan")]
        org: Option<String>,
        #[arg(long, help = "Single repository as owner/name")]
        repo: Option<String>,
        #[arg(long = "dry-run", help = "Analyze without storing results")]
        dry_run: bool,
        #[arg(long, help = "Process at most N repositories")]
        limit: Option<usize>,
        #[arg(long, short, help = "Write results to a JSON file")]
        output: Option<PathBuf>,
        #[arg(long, help = "LLM model or deployment override")]
        llm: Option<String>,
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, help = "GitHub token")]
        github_token: Option<String>,
        #[arg(long, help = "Include archived repositories")]
        include_archived: bool,
        #[arg(long, help = "Repositories processed in parallel")]
        concurrency: Option<usize>,
        #[arg(long, help = "Organization context file (replaces the lookup)")]
        org_context: Option<PathBuf>,
        #[arg(long, help = "Repository context file (replaces the lookup)")]
        repo_context: Option<PathBuf>,
    },

    /// Manage the results database
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage organization and repository context files
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Create the database schema
    Init,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Print as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ContextAction {
    /// Write a context template
    Init {
        #[arg(long, help = "Organization context file <org>.md")]
        org: Option<String>,
        #[arg(long, help = "Repository context file in the current directory")]
        repo: bool,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31msbs-discovery encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            let code = e
                .downcast_ref::<DiscoveryError>()
                .map(DiscoveryError::exit_code)
                .unwrap_or(exit_code::PARTIAL_FAILURE);
            ExitCode::from(code)
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if cli.log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, DiscoveryError> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

fn run_cli() -> anyhow::Result<u8> {
    let cli = Cli::parse();
    init_logging(&cli);

    use sbs_discovery::cli::commands;

    match cli.command {
        Commands::Discover {
            org,
            repo,
            dry_run,
            limit,
            output,
            llm,
            github_token,
            include_archived,
            concurrency,
            org_context,
            repo_context,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let options = DiscoverOptions {
                org,
                repo,
                dry_run,
                limit,
                output,
                llm,
                github_token,
                include_archived,
                concurrency,
                org_context,
                repo_context,
            };
            let rt = Runtime::new()?;
            return Ok(rt.block_on(commands::discover::run(config, options))?);
        }
        Commands::Db { action } => match action {
            DbAction::Init => {
                let config = load_config(cli.config.as_ref())?;
                commands::db::init(&config)?;
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => commands::config::show(json)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => commands::config::init(global, force)?,
        },
        Commands::Context { action } => match action {
            ContextAction::Init { org, repo, force } => {
                let config = load_config(cli.config.as_ref())?;
                commands::context::init(&config, org.as_deref(), repo, force)?;
            }
        },
    }

    Ok(exit_code::SUCCESS)
}
