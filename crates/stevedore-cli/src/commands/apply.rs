//! Apply command - resolve manifests and deploy them

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use stevedore_core::{Context, Resolution};
use stevedore_deploy::{
    Cancellation, DeployClients, DeployError, DeployOptions, HelmUpstaller, Stevedore,
};
use stevedore_repo::{
    ChartBuilder, DependencyBuilder, HelmDependencyUpdater, HttpChartRepository, UnavailableBuilder,
};

use crate::commands::{ResolveArgs, resolve};
use crate::config::Config;
use crate::display;
use crate::error::{CliError, Result};

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// Deploy all releases concurrently instead of stopping at the first failure
    #[arg(long)]
    pub parallel: bool,

    /// Show what would change without touching the cluster
    #[arg(long)]
    pub dry_run: bool,

    /// Only report releases with changes or errors
    #[arg(long)]
    pub filter: bool,

    /// Per-release helm timeout in seconds (defaults to helmTimeout)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Roll back failed upgrades
    #[arg(long)]
    pub atomic: bool,
}

impl ApplyArgs {
    fn options(&self, config: &Config) -> DeployOptions {
        DeployOptions {
            parallel: self.parallel,
            dry_run: self.dry_run,
            filter: self.filter,
            timeout: self
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(config.helm_timeout),
            atomic: self.atomic || config.atomic,
        }
    }
}

/// Run the apply command
pub async fn run(args: &ResolveArgs, apply: &ApplyArgs, config: &Config) -> Result<()> {
    let (context, resolution) = resolve(args, config).await?;
    let options = apply.options(config);

    if resolution.is_empty() {
        println!("{} Nothing to deploy for context {}", style("→").blue(), style(&context.name).cyan());
        return Ok(());
    }

    let stevedore = Stevedore::new(clients(&context, &resolution, config), builder(config)?);

    println!(
        "{} {} {} release(s) to context {}",
        style("→").blue().bold(),
        if options.dry_run { "Dry-running" } else { "Deploying" },
        resolution.release_count(),
        style(&context.name).cyan()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("waiting for helm");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = stevedore
        .deploy(&resolution.files, &options, &Cancellation::new())
        .await;
    spinner.finish_and_clear();

    match outcome {
        Ok(responses) => {
            let responses = responses.sorted();
            display::print_responses(&responses, options.dry_run);
            display::print_summary(&responses, options.dry_run);
            Ok(())
        }
        Err(DeployError::Failed(responses)) => {
            let responses = responses.sorted();
            display::print_responses(&responses, options.dry_run);
            display::print_summary(&responses, options.dry_run);
            Err(CliError::Deploy {
                message: responses.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// One helm client per namespace releases are deployed to
fn clients(context: &Context, resolution: &Resolution, config: &Config) -> DeployClients {
    let namespaces: BTreeSet<&str> = resolution
        .files
        .iter()
        .flat_map(|file| file.specs.iter())
        .map(|spec| spec.release.effective_namespace())
        .collect();

    let mut clients = DeployClients::new();
    for namespace in namespaces {
        let mut helm = HelmUpstaller::new(config.helm_binary.clone());
        if !context.kube_context.is_empty() {
            helm = helm.with_kube_context(context.kube_context.clone());
        }
        clients.insert(namespace, Arc::new(helm));
    }
    clients
}

fn builder(config: &Config) -> Result<Arc<dyn ChartBuilder>> {
    match &config.chart_repository {
        Some(repository) => {
            let http = HttpChartRepository::new(repository.clone())
                .map_err(|e| CliError::config(e.to_string()))?;
            Ok(Arc::new(DependencyBuilder::new(
                Arc::new(http),
                Arc::new(HelmDependencyUpdater::new(config.helm_binary.clone())),
            )))
        }
        None => Ok(Arc::new(UnavailableBuilder)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_fall_back_to_config() {
        let config = Config {
            helm_timeout: Duration::from_secs(90),
            atomic: true,
            ..Default::default()
        };
        let args = ApplyArgs {
            parallel: false,
            dry_run: true,
            filter: false,
            timeout: None,
            atomic: false,
        };

        let options = args.options(&config);
        assert_eq!(options.timeout, Duration::from_secs(90));
        assert!(options.atomic);
        assert!(options.dry_run);

        let args = ApplyArgs {
            timeout: Some(10),
            ..args
        };
        assert_eq!(args.options(&config).timeout, Duration::from_secs(10));
    }
}
