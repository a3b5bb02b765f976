//! Stevedore CLI - Resolve layered deployment manifests and roll them out with helm

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod display;
mod error;
mod exit_codes;
mod loader;
mod logging;

use commands::ResolveArgs;
use commands::apply::ApplyArgs;
use commands::plan::OutputFormat;
use config::Config;
use error::Result;

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(author = "Stevedore Contributors")]
#[command(version)]
#[command(about = "Resolve layered deployment manifests and roll them out with helm", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to <config dir>/stevedore/config.yaml)
    #[arg(long, global = true, env = "STEVEDORE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve manifests for a context and print the releases that would be deployed
    Plan {
        #[command(flatten)]
        inputs: ResolveArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Resolve manifests and deploy them
    Apply {
        #[command(flatten)]
        inputs: ResolveArgs,

        #[command(flatten)]
        options: ApplyArgs,
    },

    /// List the configured contexts
    Contexts,

    /// Make a context the default for plan and apply
    UseContext {
        /// Context name
        name: String,
    },
}

#[tokio::main]
async fn main() {
    // Numbered error lists carry file paths, keep them on one line
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().wrap_lines(false).build())
    }));
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logging::init(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Plan { inputs, output } => commands::plan::run(&inputs, output, &config).await,
        Commands::Apply { inputs, options } => {
            commands::apply::run(&inputs, &options, &config).await
        }
        Commands::Contexts => commands::context::list(&config),
        Commands::UseContext { name } => {
            let path = match cli.config {
                Some(path) => path,
                None => Config::default_path()?,
            };
            commands::context::select(&config, &name, &path)
        }
    }
}
