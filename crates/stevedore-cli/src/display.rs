//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Resolved plans with their ignored releases
//! - Deploy responses, with diffs for dry runs

use console::style;
use serde::Serialize;

use stevedore_core::{Context, IgnoredRelease, Release, Resolution};
use stevedore_deploy::{Response, Responses};

/// Print the plan as a table
pub fn print_plan(context: &Context, resolution: &Resolution) {
    println!(
        "{} Plan for context {} ({} release(s))",
        style("→").blue().bold(),
        style(&context.name).cyan(),
        resolution.release_count()
    );
    println!();

    if resolution.release_count() > 0 {
        println!(
            "{:<24} {:<24} {:<16} {:<36} {}",
            style("FILE").bold(),
            style("RELEASE").bold(),
            style("NAMESPACE").bold(),
            style("CHART").bold(),
            style("VERSION").bold()
        );
        for file in &resolution.files {
            for spec in file.specs.iter() {
                let release = &spec.release;
                println!(
                    "{:<24} {:<24} {:<16} {:<36} {}",
                    file.file,
                    style(&release.name).cyan(),
                    release.effective_namespace(),
                    chart_label(release),
                    release.chart_version.as_deref().unwrap_or("-")
                );
            }
        }
    }

    if !resolution.ignored.is_empty() {
        println!();
        println!("{}", style("Ignored releases:").yellow().bold());
        for ignored in resolution.ignored.iter() {
            println!(
                "  {} {} ({}): {}",
                style("-").dim(),
                ignored.name,
                ignored.file,
                style(&ignored.reason).dim()
            );
        }
    }
}

fn chart_label(release: &Release) -> String {
    if release.has_build_dependency() {
        format!("{} (built)", release.chart_name())
    } else {
        release.chart_name().to_string()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanDocument<'a> {
    context: &'a str,
    releases: Vec<PlannedRelease<'a>>,
    ignored: Vec<&'a IgnoredRelease>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlannedRelease<'a> {
    file: &'a str,
    #[serde(flatten)]
    release: &'a Release,
}

/// The plan as YAML, for machines
pub fn plan_yaml(context: &Context, resolution: &Resolution) -> Result<String, serde_yaml::Error> {
    let document = PlanDocument {
        context: &context.name,
        releases: resolution
            .files
            .iter()
            .flat_map(|file| {
                file.specs.iter().map(|spec| PlannedRelease {
                    file: &file.file,
                    release: &spec.release,
                })
            })
            .collect(),
        ignored: resolution.ignored.iter().collect(),
    };
    serde_yaml::to_string(&document)
}

/// Print one line per response, followed by the diff when asked for
pub fn print_responses(responses: &Responses, show_diff: bool) {
    for response in responses.iter() {
        print_response(response);
        if show_diff && response.has_diff && !response.diff.is_empty() {
            print_diff(&response.diff);
        }
    }
}

fn print_response(response: &Response) {
    let name = style(&response.release_name).cyan();
    match &response.error {
        Some(error) => println!(
            "  {} {} ({}): {}",
            style("✗").red(),
            name,
            response.namespace,
            style(error).red()
        ),
        None => {
            let version = response
                .release_version
                .map(|v| format!(" revision {}", v))
                .unwrap_or_default();
            let verb = if response.dry_run { "would deploy" } else { "deployed" };
            println!(
                "  {} {} ({}) {} {}{}: {}",
                style("✓").green(),
                name,
                response.namespace,
                verb,
                response.chart,
                version,
                style(if response.summary.is_empty() { "No changes" } else { response.summary.as_str() }).dim()
            );
        }
    }
}

fn print_diff(diff: &str) {
    for line in diff.lines() {
        let styled = if line.starts_with("+++") || line.starts_with("---") {
            style(line).bold()
        } else if line.starts_with('+') {
            style(line).green()
        } else if line.starts_with('-') {
            style(line).red()
        } else if line.starts_with("@@") {
            style(line).cyan()
        } else {
            style(line).dim()
        };
        println!("    {}", styled);
    }
}

/// Print the closing summary line
pub fn print_summary(responses: &Responses, dry_run: bool) {
    let failed = responses.failed().count();
    let total = responses.len();
    let mode = if dry_run { " (dry run)" } else { "" };

    if failed > 0 {
        println!(
            "{} {} of {} release(s) failed{}",
            style("✗").red().bold(),
            failed,
            total,
            mode
        );
    } else {
        println!(
            "{} {} release(s) processed{}",
            style("✓").green().bold(),
            total,
            mode
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stevedore_core::{ReleaseSpecification, ReleaseSpecifications, ResolvedFile};

    #[test]
    fn test_plan_yaml() {
        let context = Context::new("staging", "gke-staging");
        let mut resolution = Resolution::default();
        resolution.files.push(ResolvedFile {
            file: "apps.yaml".to_string(),
            specs: ReleaseSpecifications::new(vec![ReleaseSpecification::new(
                Release::new("orders", "commerce").with_chart("chartmuseum/orders", Some("1.2.0".into())),
            )]),
        });
        resolution.ignored.push("apps.yaml", "search", "explicit ignore");

        let yaml = plan_yaml(&context, &resolution).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed["context"].as_str(), Some("staging"));
        assert_eq!(parsed["releases"][0]["file"].as_str(), Some("apps.yaml"));
        assert_eq!(parsed["releases"][0]["name"].as_str(), Some("orders"));
        assert_eq!(parsed["releases"][0]["chartVersion"].as_str(), Some("1.2.0"));
        assert_eq!(parsed["ignored"][0]["reason"].as_str(), Some("explicit ignore"));
    }
}
