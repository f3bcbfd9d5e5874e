//! arwo - Remedy work-order CLI.
//!
//! Thin wrapper around `arwo-core`: loads configuration, drives one
//! operation through the retry orchestrator, and reports the outcome.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// arwo - Remedy work-order client
#[derive(Parser, Debug)]
#[command(name = "arwo")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the client configuration file
    #[arg(short, long, default_value = "arwo.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Output format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a work order from a JSON fields file
    Create(commands::CreateArgs),

    /// Modify an existing work order by its public id
    Modify(commands::ModifyArgs),

    /// Attach a file to an existing work order
    Attach(commands::AttachArgs),

    /// Resolve assignment categories for a company
    Categories(commands::CategoriesArgs),

    /// Look up the internal id of a support group
    SupportGroup(commands::SupportGroupArgs),
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let json = cli.format == "json";
    let exit_code = match cli.command {
        Commands::Create(args) => commands::create::run(&cli.config, json, &args),
        Commands::Modify(args) => commands::modify::run(&cli.config, json, &args),
        Commands::Attach(args) => commands::attach::run(&cli.config, json, &args),
        Commands::Categories(args) => commands::categories::run(&cli.config, json, &args),
        Commands::SupportGroup(args) => commands::support_group::run(&cli.config, json, &args),
    };
    std::process::exit(i32::from(exit_code));
}
