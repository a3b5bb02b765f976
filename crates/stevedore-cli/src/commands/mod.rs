//! CLI commands

pub mod apply;
pub mod context;
pub mod plan;

use clap::Args;
use std::path::PathBuf;

use stevedore_core::{Context, Resolution, Resolver, Substitute};

use crate::config::Config;
use crate::error::{CliError, Result};
use crate::loader::{self, Sources};

/// Inputs shared by every command that resolves manifests
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Manifest files or directories
    #[arg(short = 'f', long = "file", required = true)]
    pub manifests: Vec<PathBuf>,

    /// Override files or directories
    #[arg(long)]
    pub overrides: Vec<PathBuf>,

    /// Env files or directories
    #[arg(long)]
    pub envs: Vec<PathBuf>,

    /// Ignore files or directories
    #[arg(long)]
    pub ignores: Vec<PathBuf>,

    /// Deploy target (defaults to currentContext from the config)
    #[arg(long, env = "STEVEDORE_CONTEXT")]
    pub context: Option<String>,

    /// Extra substitution variable (KEY=VALUE)
    #[arg(short = 'e', long = "env")]
    pub env: Vec<String>,
}

/// Load documents and resolve them for the selected context
pub async fn resolve(args: &ResolveArgs, config: &Config) -> Result<(Context, Resolution)> {
    let context = config.context(args.context.as_deref())?.clone();
    let env = Substitute::parse_assignments(&args.env).map_err(CliError::config)?;

    let documents = loader::load(Sources {
        manifests: &args.manifests,
        overrides: &args.overrides,
        envs: &args.envs,
        ignores: &args.ignores,
    })?;

    let resolver = Resolver::new(config.labels())
        .with_overrides(documents.overrides)
        .with_envs(documents.envs)
        .with_ignores(documents.ignores)
        .with_providers(config.providers())
        .with_env(env);

    tracing::debug!(context = %context.name, "resolving manifests");
    let resolution = resolver.resolve(&context, documents.manifests).await?;
    Ok((context, resolution))
}
