use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gocq_install::cli::Args;
use gocq_install::config::Config;
use gocq_install::installer::{InstallOutcome, Installer};
use gocq_install::platform::HostInfo;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let host = HostInfo::current();
    let settings = config.settings(&args, &host)?;
    tracing::debug!("Resolved settings: {:?}", settings);

    let installer = Installer::new(settings, &host)?;
    match installer.run().await? {
        InstallOutcome::AlreadyInstalled(path) => {
            tracing::info!("Nothing to do, found {}", path.display());
        }
        InstallOutcome::Installed { tag, binary } => {
            tracing::info!("Installation of {} completed: {}", tag, binary.display());
        }
    }

    Ok(())
}
