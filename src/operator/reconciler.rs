//! Convergence pass for a single ShortURL.
//!
//! Each pass runs these steps in order and stops at the first error:
//!
//! 1. Ensure the backing Deployment exists (create if missing, never patch)
//! 2. Ensure the backing Service exists (same rules)
//! 3. Fetch the ShortURL; if it is gone the pass ends successfully
//! 4. If no short path is assigned, shorten the target URL and write
//!    `shortPath`, `clickCount = 0`, `isValid = unknown`
//! 5. Read click count and validity for the short path and write them if
//!    either changed
//!
//! Passes are at-least-once and non-transactional. A pass that fails after
//! creating infrastructure leaves it in place; the next pass finds it and
//! moves on. Scheduling the next pass is the caller's job
//! (see [`crate::operator::controller`]).

use std::fmt::Debug;
use std::sync::Arc;

use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use tracing::{debug, info, instrument};

use crate::client::ShortenerApi;
use crate::operator::crd::{ShortURL, ShortURLStatus, Validity};
use crate::operator::error::{OperatorError, Result};
use crate::operator::object_store::{ObjectStore, ResourceId};
use crate::operator::resources::BackendSpec;

/// Result of an ensure step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    /// The object was already there and was left as is.
    Existed,
    /// The object was missing and has been created.
    Created,
}

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The ShortURL no longer exists; nothing was written for it.
    Missing,
    /// The status now reflects the backing service.
    Converged {
        short_path: String,
        click_count: u64,
        is_valid: Validity,
    },
}

/// Everything a pass talks to.
pub struct Reconciler {
    deployments: Arc<dyn ObjectStore<Deployment>>,
    services: Arc<dyn ObjectStore<Service>>,
    short_urls: Arc<dyn ObjectStore<ShortURL>>,
    shortener: Arc<dyn ShortenerApi>,
    backend: BackendSpec,
}

impl Reconciler {
    pub fn new(
        deployments: Arc<dyn ObjectStore<Deployment>>,
        services: Arc<dyn ObjectStore<Service>>,
        short_urls: Arc<dyn ObjectStore<ShortURL>>,
        shortener: Arc<dyn ShortenerApi>,
        backend: BackendSpec,
    ) -> Self {
        Self {
            deployments,
            services,
            short_urls,
            shortener,
            backend,
        }
    }

    pub fn backend(&self) -> &BackendSpec {
        &self.backend
    }

    /// Runs one convergence pass for the ShortURL identified by `id`.
    ///
    /// # Errors
    ///
    /// Any failure of an infrastructure check, the status writes or the
    /// shortening service aborts the pass and is returned unchanged. A
    /// ShortURL that no longer exists is not an error.
    #[instrument(skip(self), fields(name = %id.name, namespace = %id.namespace))]
    pub async fn reconcile(&self, id: &ResourceId) -> Result<PassOutcome> {
        metrics::counter!("operator_reconciliations_total").increment(1);

        self.ensure_deployment().await?;
        self.ensure_service().await?;

        let Some(mut short_url) = self.short_urls.get(id).await? else {
            debug!("ShortURL no longer exists, skipping");
            return Ok(PassOutcome::Missing);
        };

        if short_url.short_path().is_none() {
            short_url = self.assign_short_path(short_url).await?;
        }

        self.refresh_status(short_url).await
    }

    /// Creates the backing Deployment unless one already exists.
    ///
    /// An existing Deployment is never modified, even if it differs from
    /// the desired one.
    pub async fn ensure_deployment(&self) -> Result<Ensured> {
        ensure(self.deployments.as_ref(), self.backend.deployment()).await
    }

    /// Creates the backing Service unless one already exists.
    pub async fn ensure_service(&self) -> Result<Ensured> {
        ensure(self.services.as_ref(), self.backend.service()).await
    }

    async fn assign_short_path(&self, mut short_url: ShortURL) -> Result<ShortURL> {
        let code = self
            .shortener
            .shorten(&short_url.spec.target_url, short_url.spec.expire_at)
            .await?;

        info!(short_path = %code, target = %short_url.spec.target_url, "Short path assigned");

        short_url.status = Some(ShortURLStatus {
            short_path: Some(code),
            click_count: 0,
            is_valid: Validity::Unknown,
            last_updated: Some(Utc::now().to_rfc3339()),
        });

        self.short_urls.update_status(&short_url).await
    }

    async fn refresh_status(&self, mut short_url: ShortURL) -> Result<PassOutcome> {
        let short_path = short_url
            .short_path()
            .map(str::to_string)
            .ok_or_else(|| {
                OperatorError::InvalidResource("status.shortPath is not set".to_string())
            })?;

        let click_count = self.shortener.click_count(&short_path).await?;
        let is_valid = self.shortener.check_validity(&short_path).await?;

        let changed = {
            let status = short_url.status.get_or_insert_with(ShortURLStatus::default);
            let changed = status.click_count != click_count || status.is_valid != is_valid;
            if changed {
                status.click_count = click_count;
                status.is_valid = is_valid;
                status.last_updated = Some(Utc::now().to_rfc3339());
            }
            changed
        };

        // An unchanged status is not written, so the pass does not trigger
        // a watch event for itself.
        if changed {
            self.short_urls.update_status(&short_url).await?;
            debug!(short_path = %short_path, click_count, %is_valid, "Status refreshed");
        } else {
            debug!(short_path = %short_path, "Status unchanged");
        }

        Ok(PassOutcome::Converged {
            short_path,
            click_count,
            is_valid,
        })
    }
}

/// Read-or-create for an object with a fixed identity.
async fn ensure<K>(store: &dyn ObjectStore<K>, desired: K) -> Result<Ensured>
where
    K: kube::Resource + Debug + Send + Sync,
    K::DynamicType: Default,
{
    let id = ResourceId::of(&desired)?;

    if store.get(&id).await?.is_some() {
        return Ok(Ensured::Existed);
    }

    match store.create(&desired).await {
        Ok(_) => {
            info!(kind = %K::kind(&Default::default()), id = %id, "Created backing object");
            Ok(Ensured::Created)
        }
        // Lost a race with another writer; the object exists now.
        Err(OperatorError::AlreadyExists { .. }) => Ok(Ensured::Existed),
        Err(e) => Err(e),
    }
}
