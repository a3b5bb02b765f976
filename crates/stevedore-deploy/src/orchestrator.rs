//! Concurrent release orchestrator
//!
//! Every release gets its own worker task. Workers report their [`Response`]
//! on a shared channel drained by a collector task, and hand an [`Outcome`]
//! back to the dispatch loop over a oneshot:
//!
//! - parallel mode: the outcome is sent before deploying, so the loop starts
//!   the next worker right away
//! - sequential mode: the outcome is sent once the response is out, and the
//!   loop stops on a failure unless this is a dry run

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use stevedore_core::{Release, ResolvedFile};
use stevedore_repo::ChartBuilder;

use crate::clients::DeployClients;
use crate::error::{DeployError, Result};
use crate::response::{Response, Responses};
use crate::upstall::{UpstallRequest, Upstaller};

/// Default per-release ceiling for a helm call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Options for a deploy run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOptions {
    /// Deploy every release at once instead of one after the other
    pub parallel: bool,
    pub dry_run: bool,
    /// Drop responses with neither a diff nor an error
    pub filter: bool,
    /// Per-release timeout, never retried
    pub timeout: Duration,
    /// Roll back failed upgrades
    pub atomic: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            dry_run: false,
            filter: false,
            timeout: DEFAULT_TIMEOUT,
            atomic: false,
        }
    }
}

/// Cancellation signal, checked once before any release is touched
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a worker tells the dispatch loop
#[derive(Debug, Clone, Copy)]
struct Outcome {
    succeeded: bool,
}

/// Deploys resolved releases
#[derive(Clone)]
pub struct Stevedore {
    clients: Arc<DeployClients>,
    builder: Arc<dyn ChartBuilder>,
}

impl Stevedore {
    pub fn new(clients: DeployClients, builder: Arc<dyn ChartBuilder>) -> Self {
        Self {
            clients: Arc::new(clients),
            builder,
        }
    }

    /// Deploy every release of `files`, in file order
    ///
    /// Build failures and missing clients become failed responses without
    /// stopping the run. Returns [`DeployError::Failed`] when any response
    /// failed.
    pub async fn deploy(
        &self,
        files: &[ResolvedFile],
        options: &DeployOptions,
        cancellation: &Cancellation,
    ) -> Result<Responses> {
        if cancellation.is_cancelled() {
            return Err(DeployError::Cancelled);
        }

        let (responses_tx, mut responses_rx) = mpsc::channel::<Response>(1);
        let filter = options.filter;
        let collector = tokio::spawn(async move {
            let mut responses = Vec::new();
            while let Some(response) = responses_rx.recv().await {
                if filter && response.is_noop() {
                    continue;
                }
                responses.push(response);
            }
            responses
        });

        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        'files: for file in files {
            for spec in file.specs.iter() {
                let release = match self.builder.build(&spec.release).await {
                    Ok(release) => release,
                    Err(source) => {
                        let error = DeployError::Build {
                            release: spec.release.name.clone(),
                            source,
                        };
                        tracing::warn!(release = %spec.release.name, error = %error, "chart build failed");
                        let response = Response::failure(&file.file, &spec.release, options.dry_run, error);
                        send(&responses_tx, response).await?;
                        continue;
                    }
                };

                let namespace = release.effective_namespace();
                let Some(client) = self.clients.get(namespace) else {
                    let error = DeployError::MissingClient {
                        namespace: namespace.to_string(),
                    };
                    tracing::warn!(release = %release.name, error = %error, "skipping release");
                    let response = Response::failure(&file.file, &release, options.dry_run, error);
                    send(&responses_tx, response).await?;
                    continue;
                };

                tracing::info!(release = %release.name, namespace, "dispatching release");
                let (proceed_tx, proceed_rx) = oneshot::channel();
                workers.push(tokio::spawn(run_worker(
                    file.file.clone(),
                    release,
                    client,
                    *options,
                    responses_tx.clone(),
                    proceed_tx,
                )));

                let outcome = proceed_rx.await.unwrap_or(Outcome { succeeded: false });
                if !options.parallel && !options.dry_run && !outcome.succeeded {
                    tracing::warn!("release failed, skipping the remaining releases");
                    break 'files;
                }
            }
        }

        drop(responses_tx);
        for worker in workers {
            worker.await.map_err(|e| DeployError::Worker(e.to_string()))?;
        }
        let responses = Responses::new(
            collector
                .await
                .map_err(|e| DeployError::Worker(e.to_string()))?,
        );

        if responses.has_failures() {
            Err(DeployError::Failed(responses))
        } else {
            Ok(responses)
        }
    }
}

async fn send(responses: &mpsc::Sender<Response>, response: Response) -> Result<()> {
    responses
        .send(response)
        .await
        .map_err(|_| DeployError::Worker("response collector stopped".to_string()))
}

async fn run_worker(
    file: String,
    release: Release,
    client: Arc<dyn Upstaller>,
    options: DeployOptions,
    responses: mpsc::Sender<Response>,
    proceed: oneshot::Sender<Outcome>,
) {
    let proceed = if options.parallel {
        let _ = proceed.send(Outcome { succeeded: true });
        None
    } else {
        Some(proceed)
    };

    let response = upstall(&file, &release, client.as_ref(), &options).await;
    let succeeded = response.succeeded();
    if responses.send(response).await.is_err() {
        tracing::error!(release = %release.name, "response collector stopped");
    }

    if let Some(proceed) = proceed {
        let _ = proceed.send(Outcome { succeeded });
    }
}

async fn upstall(file: &str, release: &Release, client: &dyn Upstaller, options: &DeployOptions) -> Response {
    let request = match UpstallRequest::from_release(release, options.dry_run, options.timeout, options.atomic) {
        Ok(request) => request,
        Err(e) => return Response::failure(file, release, options.dry_run, e),
    };

    match client.upstall(&request).await {
        Ok(result) => {
            tracing::info!(
                release = %release.name,
                namespace = %request.namespace,
                version = result.release_version,
                dry_run = options.dry_run,
                "{}",
                result.summary
            );
            Response {
                chart_version: Some(result.chart_version),
                release_version: Some(result.release_version),
                has_diff: result.has_diff,
                diff: result.diff,
                summary: result.summary,
                ..Response::for_release(file, release, options.dry_run)
            }
        }
        Err(e) => {
            tracing::warn!(release = %release.name, error = %e, "upstall failed");
            Response::failure(file, release, options.dry_run, e)
        }
    }
}
