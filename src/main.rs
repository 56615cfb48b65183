use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use worktask::config;
use worktask::provider::ClickUp;
use worktask::store::Store;
use worktask::tui::{self, App};
use worktask::vcs::GitCli;

#[derive(Parser)]
#[command(
    name = "worktask",
    version = env!("WORKTASK_VERSION"),
    about = "Browse, create and delete git worktrees linked to ClickUp tasks"
)]
struct Cli {
    /// Path to the git repository
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Log level for ~/.worktask/worktask.log (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (store, mut app) = match setup(&cli) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("worktask: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match tui::run(&mut app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            if let Err(log_err) = store.log_error(&format!("{e:#}")) {
                eprintln!("worktask: failed to write error log: {log_err:#}");
            }
            eprintln!("worktask: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn setup(cli: &Cli) -> Result<(Store, App)> {
    config::ensure_dirs()?;
    init_logging(cli.log_level)?;

    let config = config::load()?;
    let store = Store::open()?;
    let provider = ClickUp::new(&config.api_url)?;
    let vcs = GitCli::new(&cli.repo);

    let app = App::new(config, store.clone(), Arc::new(vcs), Arc::new(provider))
        .with_context(|| format!("failed to list worktrees in {}", cli.repo.display()))?;
    Ok((store, app))
}

fn init_logging(level: tracing::Level) -> Result<()> {
    let path = config::log_path()?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();
    Ok(())
}
