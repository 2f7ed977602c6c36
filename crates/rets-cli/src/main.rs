//! `rets` binary entry point.
//!
//! Parses arguments, initializes logging, runs one subcommand inside a RETS
//! session and prints the result as JSON on stdout.

use anyhow::Result;
use clap::Parser;
use rets_cli::{Command, ConnectionArgs, commands};

#[derive(Parser)]
#[command(
    name = "rets",
    about = "Query RETS real estate servers",
    version,
    long_about = "Log in to a RETS server, read metadata, run DMQL2 searches and download listing objects. Connection settings may come from flags or RETS_* environment variables."
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Print compact instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let output = commands::run(&cli.connection, cli.command).await?;

    let rendered = if cli.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{rendered}");

    Ok(())
}
