use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repograde::cli::commands::grade::{GradeOptions, GradeSource};
use repograde::{Config, ConfigLoader};

#[derive(Parser)]
#[command(name = "repograde")]
#[command(
    version,
    about = "Grade repositories against a rubric with an LLM"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, help = "Config file to use instead of the global/project chain")]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP grading service
    Serve {
        #[arg(long, short, help = "Address to listen on (default: server.bind)")]
        bind: Option<String>,
    },

    /// Grade one repository from the terminal
    #[command(group(ArgGroup::new("source").required(true).args(["repo", "archive"])))]
    Grade {
        #[arg(long, help = "Repository URL to clone")]
        repo: Option<String>,
        #[arg(long, help = "Local .zip archive of the repository")]
        archive: Option<PathBuf>,
        #[arg(long, help = "Rubric text file (.txt)")]
        rubric_file: PathBuf,
        #[arg(
            long,
            help = "File batches, e.g. '[[main.py,utils.py],[config.py]]' or JSON"
        )]
        batches: String,
        #[arg(long, help = "Total points available, appended to the rubric")]
        total_points: Option<f64>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
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
        eprintln!("\x1b[31mrepograde encountered an unexpected error:\x1b[0m");
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
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> repograde::Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    // Missing .env is fine; real environment variables still apply
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { bind } => {
            let config = load_config(cli.config.as_ref())?;
            let rt = Runtime::new()?;
            rt.block_on(repograde::cli::commands::serve::run(&config, bind))?;
        }
        Commands::Grade {
            repo,
            archive,
            rubric_file,
            batches,
            total_points,
            format,
        } => {
            let source = match (repo, archive) {
                (Some(url), _) => GradeSource::Repository(url),
                (None, Some(path)) => GradeSource::Archive(path),
                (None, None) => anyhow::bail!("one of --repo or --archive is required"),
            };

            let config = load_config(cli.config.as_ref())?;
            let rt = Runtime::new()?;
            let completed = rt.block_on(repograde::cli::commands::grade::run(
                &config,
                GradeOptions {
                    source,
                    rubric_file,
                    batches,
                    total_points,
                    format,
                },
            ))?;

            if !completed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                repograde::cli::commands::config::show(&format)?;
            }
            ConfigAction::Path => {
                repograde::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                repograde::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
