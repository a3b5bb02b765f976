//! Stevedore Core - Manifest resolution for Kubernetes deployments
//!
//! This crate turns declarative manifests into a resolved release plan:
//! - `Conditions` / `Labels`: weighted matching dimensions
//! - `Predicate`: the concrete conditions of a deploy target
//! - `Overrides`, `Envs`, `Ignores`: rules collated by weight
//! - `PatternSet`: `${VAR}` substitution with aggregate errors
//! - `ReleaseSpecification`: the deployable unit and its resolution stages
//! - `Resolver`: the full pipeline for one context

pub mod conditions;
pub mod context;
pub mod document;
pub mod envs;
pub mod error;
pub mod ignores;
pub mod manifest;
pub mod overrides;
pub mod providers;
pub mod release;
pub mod resolver;
pub mod substitute;
pub mod validate;
pub mod values;

pub use conditions::{Conditions, Labels, WeightedLabel};
pub use context::{Conditional, Context, Predicate, collate_by};
pub use document::{DOCUMENT_VERSION, Kind};
pub use envs::{EnvSpecification, Envs};
pub use error::{CoreError, ProviderError, ReleaseError, ResolutionErrors, Result, ValidationErrors, numbered};
pub use ignores::{IgnoredRelease, IgnoredReleases, Ignores};
pub use manifest::{Manifest, ManifestFile, ManifestFiles};
pub use overrides::{OverrideSpecification, Overrides};
pub use providers::{CommandProvider, ConfigProvider, Fetched, Providers, StaticProvider};
pub use release::{
    ChartSpec, ConfigRequests, Dependency, PRIVILEGED_NAMESPACE, Release, ReleaseSpecification,
    ReleaseSpecifications,
};
pub use resolver::{Resolution, ResolvedFile, Resolver};
pub use substitute::{PatternSet, Substitute, SubstitutionError};
pub use validate::Validator;
pub use values::Values;
