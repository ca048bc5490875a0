use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::CookieBehavior;

/// SaleCycle tag tool - validate configuration and preview rendered tags
#[derive(Parser)]
#[command(name = "salecycle")]
#[command(about = "Validate SaleCycle tag configuration and preview rendered tags")]
#[command(version)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Render the tag for a JSON page description and print it
    Render {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Path to page description (customer, cart, items)
        #[arg(short, long)]
        page: PathBuf,
        /// Session id to use instead of a session resolver
        #[arg(short, long)]
        session_id: Option<String>,
    },
    /// Write a configuration file with default variable names
    InitConfig {
        /// Where to write the configuration
        path: PathBuf,
        /// Client id supplied by SaleCycle
        #[arg(long)]
        client_id: String,
        /// ISO 4217 currency code
        #[arg(long, default_value = "GBP")]
        currency: String,
        /// Cookie behavior (cookies_require_session_id, self_managed_session, no_cookies)
        #[arg(long, default_value = "cookies_require_session_id")]
        cookie_behavior: CookieBehavior,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
