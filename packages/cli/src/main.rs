mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    check, identity, locate, subscriptions, CheckArgs, Context, IdentityArgs, LocateArgs,
    OutputFormat, SubscriptionsArgs,
};
use config::Config;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// SCL tools - element identities, locators and subscriptions
#[derive(Parser, Debug)]
#[command(name = "scl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format (text, json)
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Replacement tag schema JSON
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Show details and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List element identities
    Identity(IdentityArgs),

    /// Find the element with a given tag and identity
    Locate(LocateArgs),

    /// Verify that every public element is located by its own identity
    Check(CheckArgs),

    /// Resolve ExtRefs to the control blocks and FCDAs they subscribe to
    Subscriptions(SubscriptionsArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd)?;
    debug!(?config, "loaded configuration");
    let ctx = Context::new(config, cli.schema, cli.format, cli.verbose)?;

    match cli.command {
        Command::Identity(args) => identity(args, &ctx),
        Command::Locate(args) => locate(args, &ctx),
        Command::Check(args) => check(args, &ctx),
        Command::Subscriptions(args) => subscriptions(args, &ctx),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
