//! Context commands

use console::style;
use std::path::Path;

use crate::config::Config;
use crate::error::Result;

/// List the configured contexts, marking the current one
pub fn list(config: &Config) -> Result<()> {
    if config.contexts.is_empty() {
        println!("No contexts configured");
        return Ok(());
    }

    println!(
        "  {:<20} {:<24} {}",
        style("NAME").bold(),
        style("KUBE CONTEXT").bold(),
        style("LABELS").bold()
    );
    for context in &config.contexts {
        let marker = if config.current_context.as_deref() == Some(context.name.as_str()) {
            style("*").green().bold()
        } else {
            style(" ")
        };
        let labels: Vec<String> = context
            .labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        println!(
            "{} {:<20} {:<24} {}",
            marker,
            style(&context.name).cyan(),
            context.kube_context,
            labels.join(",")
        );
    }
    Ok(())
}

/// Make `name` the current context and save the config to `path`
pub fn select(config: &Config, name: &str, path: &Path) -> Result<()> {
    config.context(Some(name))?;

    let updated = Config {
        current_context: Some(name.to_string()),
        ..config.clone()
    };
    updated.save_to(path)?;

    println!("{} Switched to context {}", style("✓").green(), style(name).cyan());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stevedore_core::Context;

    #[test]
    fn test_select_saves_current_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = Config {
            contexts: vec![Context::new("staging", "gke-staging"), Context::new("production", "gke-prod")],
            ..Default::default()
        };

        select(&config, "production", &path).unwrap();
        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.current_context.as_deref(), Some("production"));
        assert_eq!(saved.contexts.len(), 2);
    }

    #[test]
    fn test_select_unknown_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        assert!(select(&Config::default(), "qa", &path).is_err());
        assert!(!path.exists());
    }
}
