//! AuthSync command-line client: an interactive shell over a live API.

mod app;
mod shell;

use std::path::PathBuf;

use authsync_config::{init_logging, Config, Paths};
use clap::{Parser, Subcommand};

/// AuthSync command-line interface.
#[derive(Parser)]
#[command(name = "authsync")]
#[command(about = "Keep one authoritative login status against a cookie-session API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the config value
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, hint, logs). Defaults to ~/.authsync
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// API base URL, overriding config and AUTHSYNC_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive shell (default)
    Shell,
    /// Run one reconciliation, print the result and exit
    Probe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
        config.validate()?;
    }

    paths.ensure_dirs()?;
    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging("authsync", &level, Some(paths.log_file("authsync")));

    let (core, navigator) = app::build(&config, &paths)?;

    match cli.command {
        Some(Commands::Shell) | None => shell::run(core, navigator).await?,
        Some(Commands::Probe) => app::probe(&core).await,
    }

    Ok(())
}
