//! Plan command - resolve manifests without deploying

use clap::ValueEnum;

use crate::commands::{ResolveArgs, resolve};
use crate::config::Config;
use crate::display;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Yaml,
}

/// Run the plan command
pub async fn run(args: &ResolveArgs, output: OutputFormat, config: &Config) -> Result<()> {
    let (context, resolution) = resolve(args, config).await?;

    match output {
        OutputFormat::Table => display::print_plan(&context, &resolution),
        OutputFormat::Yaml => {
            let yaml = display::plan_yaml(&context, &resolution)
                .map_err(|e| CliError::internal(e.to_string()))?;
            print!("{}", yaml);
        }
    }
    Ok(())
}
