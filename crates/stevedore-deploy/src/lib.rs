//! Stevedore Deploy - Release orchestration
//!
//! - [`Upstaller`]: install-or-upgrade capability, implemented over the helm
//!   binary by [`HelmUpstaller`]
//! - [`ManifestDiff`]: resource-level diff of deployed and new manifests
//! - [`Stevedore`]: builds dependency charts and deploys resolved releases,
//!   sequentially with fail-fast or in parallel

pub mod clients;
pub mod diff;
pub mod error;
pub mod helm;
pub mod mock;
pub mod orchestrator;
pub mod response;
pub mod upstall;

pub use clients::DeployClients;
pub use diff::{ChangeType, ManifestDiff, ResourceChange};
pub use error::{DeployError, Result};
pub use helm::HelmUpstaller;
pub use orchestrator::{Cancellation, DEFAULT_TIMEOUT, DeployOptions, Stevedore};
pub use response::{Response, Responses};
pub use upstall::{UpstallRequest, UpstallResult, Upstaller};
