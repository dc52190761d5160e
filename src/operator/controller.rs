//! ShortURL controller wiring.
//!
//! Watches ShortURL resources and runs a convergence pass per event or
//! timer. The kube runtime never runs two passes for the same object
//! concurrently.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::Api;
use kube::runtime::controller::{self, Action, Controller};
use kube::runtime::watcher::Config;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, warn};

use crate::client::HttpShortenerClient;
use crate::config::OperatorConfig;
use crate::operator::crd::ShortURL;
use crate::operator::error::{OperatorError, Result};
use crate::operator::object_store::{KubeObjectStore, ResourceId};
use crate::operator::reconciler::{PassOutcome, Reconciler};

/// Context shared by every pass.
pub struct ControllerContext {
    pub reconciler: Reconciler,
    /// Delay before the next pass after a successful one
    pub requeue: Duration,
    /// Ceiling for the error backoff
    pub max_error_requeue: Duration,
    /// Consecutive failures per ShortURL, reset on success
    pub error_counts: DashMap<ResourceId, u32>,
}

impl ControllerContext {
    pub fn new(reconciler: Reconciler, requeue: Duration, max_error_requeue: Duration) -> Self {
        Self {
            reconciler,
            requeue,
            max_error_requeue,
            error_counts: DashMap::new(),
        }
    }

    /// Builds a context talking to the Kubernetes API and the shortening
    /// service configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::Shortener`] if the HTTP client cannot be built.
    pub fn from_config(client: Client, config: &OperatorConfig) -> Result<Self> {
        let shortener =
            HttpShortenerClient::new(config.shortener_url.clone(), config.shortener_timeout())?;

        let reconciler = Reconciler::new(
            Arc::new(KubeObjectStore::<Deployment>::new(client.clone())),
            Arc::new(KubeObjectStore::<Service>::new(client.clone())),
            Arc::new(KubeObjectStore::<ShortURL>::new(client)),
            Arc::new(shortener),
            config.backend(),
        );

        Ok(Self::new(
            reconciler,
            config.requeue_interval(),
            config.max_error_requeue(),
        ))
    }

    /// Drops the failure count of an object that no longer exists.
    pub fn forget(&self, id: &ResourceId) {
        if self.error_counts.remove(id).is_some() {
            debug!(id = %id, "Dropped error count of deleted ShortURL");
        }
    }
}

/// Start the ShortURL controller and run until a shutdown signal arrives.
pub async fn run_controller(client: Client, config: &OperatorConfig) -> Result<()> {
    let short_urls: Api<ShortURL> = match config.watch_namespace() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    let ctx = Arc::new(ControllerContext::from_config(client, config)?);

    info!(
        namespace = config.watch_namespace().unwrap_or("all"),
        shortener = %config.shortener_url,
        "Starting ShortURL controller"
    );

    Controller::new(short_urls, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx.clone())
        .for_each(|result| {
            let ctx = ctx.clone();
            async move {
                match result {
                    Ok((obj, action)) => {
                        debug!(
                            name = %obj.name,
                            namespace = ?obj.namespace,
                            ?action,
                            "Reconciliation completed"
                        );
                    }
                    // A requeued object was deleted; it will not be reconciled again.
                    Err(controller::Error::ObjectNotFound(obj)) => {
                        ctx.forget(&ResourceId::new(
                            obj.name,
                            obj.namespace.unwrap_or_default(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Reconciliation failed");
                    }
                }
            }
        })
        .await;

    info!("ShortURL controller stopped");

    Ok(())
}

/// Runs a pass for `short_url` and schedules the next one.
pub async fn reconcile(short_url: Arc<ShortURL>, ctx: Arc<ControllerContext>) -> Result<Action> {
    let id = ResourceId::of(short_url.as_ref())?;

    let outcome = ctx.reconciler.reconcile(&id).await?;

    if outcome == PassOutcome::Missing {
        debug!(id = %id, "ShortURL deleted before the pass could read it");
        ctx.forget(&id);
    } else {
        ctx.error_counts.remove(&id);
    }

    Ok(Action::requeue(ctx.requeue))
}

/// Error policy for the controller: exponential backoff per ShortURL.
pub fn error_policy(
    short_url: Arc<ShortURL>,
    error: &OperatorError,
    ctx: Arc<ControllerContext>,
) -> Action {
    metrics::counter!("operator_reconciliation_errors_total").increment(1);

    let key = ResourceId::of(short_url.as_ref()).unwrap_or_else(|_| {
        ResourceId::new(
            short_url.name_any(),
            short_url.namespace().unwrap_or_default(),
        )
    });

    let retries = {
        let mut entry = ctx.error_counts.entry(key.clone()).or_insert(0);
        *entry += 1;
        *entry
    };

    let delay = backoff_delay(retries, ctx.requeue, ctx.max_error_requeue);

    warn!(
        error = %error,
        retryable = error.is_retryable(),
        retry = retries,
        delay_secs = delay.as_secs(),
        "Reconciliation error for '{}', will retry",
        key
    );

    Action::requeue(delay)
}

/// `base`, doubled per consecutive failure after the first, capped at `max`.
///
/// 10s → 20s → 40s → 80s → 160s → 300s (with the default settings)
pub fn backoff_delay(retries: u32, base: Duration, max: Duration) -> Duration {
    let exponent = retries.saturating_sub(1).min(16);
    base.saturating_mul(2u32.saturating_pow(exponent)).min(max)
}
