use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{config as config_cmd, load};

/// Command-line interface for the hugeload bulk graph loader
#[derive(Parser)]
#[command(name = "hugeload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to loader configuration file (TOML)
    #[arg(long, env = "HUGELOAD_CONFIG")]
    pub config: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a JSON node file and report the imported graph
    Load(load::LoadArgs),
    /// Show the effective loader configuration
    Config(config_cmd::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "hugeload_core=debug,hugeload_cli=debug".into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "hugeload_core=info,hugeload_cli=info".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let output = commands::OutputContext {
        json: cli.json,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Load(args) => load::execute(cli.config.as_deref(), args, &output),
        Commands::Config(args) => config_cmd::execute(cli.config.as_deref(), args, &output),
    };
    if let Err(e) = result {
        output.print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
