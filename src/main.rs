//! SaleCycle tag tool - main entry point
//!
//! Validates configuration files and previews the script tag a page would
//! emit, without a web server.

use anyhow::Context;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use salecycle::cli::{Cli, Commands};
use salecycle::snapshot::{render_preview, PageSnapshot};
use salecycle::{CookieBehavior, TagConfig};

/// Initialize logging; stdout stays reserved for rendered tags
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Validate { config } => run_validate(&config),
        Commands::Render {
            config,
            page,
            session_id,
        } => run_render(&config, &page, session_id),
        Commands::InitConfig {
            path,
            client_id,
            currency,
            cookie_behavior,
        } => run_init_config(&path, client_id, currency, cookie_behavior),
    }
}

/// Load a configuration file and check it
fn load_valid_config(path: &Path) -> anyhow::Result<TagConfig> {
    let config = TagConfig::load_from_file(path)?;
    config
        .validate()
        .with_context(|| format!("Configuration in {:?} is invalid", path))?;
    Ok(config)
}

fn run_validate(path: &Path) -> anyhow::Result<()> {
    info!("Validating configuration file: {:?}", path);
    match load_valid_config(path) {
        Ok(config) => {
            if config.client_id.is_none() {
                eprintln!("! No client id set; rendering will fail until one is configured");
            }
            println!("✓ Configuration file is valid: {:?}", path);
            Ok(())
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("✗ Configuration validation failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run_render(config: &Path, page: &Path, session_id: Option<String>) -> anyhow::Result<()> {
    let config = load_valid_config(config)?;
    let snapshot = PageSnapshot::load_from_file(page)?;
    debug!("Loaded page description with {} items", snapshot.items.len());

    let tag = render_preview(config, &snapshot, session_id).context("Failed to render tag")?;
    print!("{tag}");
    Ok(())
}

fn run_init_config(
    path: &Path,
    client_id: String,
    currency: String,
    cookie_behavior: CookieBehavior,
) -> anyhow::Result<()> {
    let config = TagConfig::new(client_id)
        .with_currency(currency)
        .with_cookie_behavior(cookie_behavior);
    config.validate().context("Refusing to write invalid configuration")?;
    config.save_to_file(path)?;

    info!("Wrote configuration to {:?}", path);
    println!("✓ Configuration written to {:?}", path);
    Ok(())
}
