//! Nuve CLI - signed requests against a Nuve media-session service
//!
//! Every command signs its request with the MAuth scheme using the
//! configured service id and key.
//!
//! # Examples
//!
//! ```bash
//! # List rooms with credentials from the environment
//! NUVE_SERVICE_ID=svc1 NUVE_SERVICE_KEY=secret nuve rooms list
//!
//! # Create a room with options
//! nuve rooms create standup --options '{"p2p": true}'
//!
//! # Issue a token for a user
//! nuve token create 5f1c0ffee alice presenter
//!
//! # Print a signed header without sending anything
//! nuve sign --username alice --role presenter
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;

use config::{Config, ConnectionArgs};

/// Nuve CLI - MAuth-signed access to the Nuve REST API
#[derive(Parser)]
#[command(name = "nuve")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "NUVE_CONFIG")]
    #[arg(default_value = "~/.config/nuve/config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, inspect and delete rooms
    Rooms(commands::RoomsArgs),

    /// Issue room access tokens
    Token(commands::TokenArgs),

    /// Create, inspect and delete services
    Services(commands::ServicesArgs),

    /// Inspect and disconnect room users
    Users(commands::UsersArgs),

    /// Print a signed Authorization header
    Sign(commands::SignArgs),

    /// Show current configuration
    Config,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nuve=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nuve=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = shellexpand::tilde(&cli.config).to_string();
    info!(config_path = %config_path, "Starting nuve");

    let mut config = Config::load(&config_path)?;
    config.apply(&cli.connection);

    if let Commands::Config = cli.command {
        return config::show(&config);
    }

    let client = config.client()?;
    match cli.command {
        Commands::Rooms(args) => commands::rooms(&client, args),
        Commands::Token(args) => commands::token(&client, args),
        Commands::Services(args) => commands::services(&client, args),
        Commands::Users(args) => commands::users(&client, args),
        Commands::Sign(args) => commands::sign(&client, args),
        Commands::Config => config::show(&config),
    }
}
