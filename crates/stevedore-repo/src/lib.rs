//! Stevedore Repo - Chart repository access
//!
//! - ChartMuseum-compatible HTTP client (`HttpChartRepository`)
//! - Chart packaging (`.tgz` archives)
//! - Dependency charts: checksum, version ladder and the `ChartBuilder`
//!   that builds, publishes or reuses them

pub mod archive;
pub mod backend;
pub mod chart;
pub mod config;
pub mod credentials;
pub mod dependency;
pub mod error;
pub mod http;
pub mod mock;

pub use backend::{ChartInfo, ChartRepository};
pub use config::Repository;
pub use credentials::Credentials;
pub use dependency::{
    BuildPlan, ChartBuilder, DependencyBuilder, DependencyUpdater, HelmDependencyUpdater,
    UnavailableBuilder, checksum, next_version, plan,
};
pub use error::{RepoError, Result};
pub use http::HttpChartRepository;
