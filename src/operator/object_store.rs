//! Generic object client used by the reconciler.
//!
//! [`ObjectStore`] is the only way the reconciler touches cluster objects.
//! [`KubeObjectStore`] talks to the Kubernetes API; [`InMemoryObjectStore`]
//! keeps objects in a map for tests and dry runs.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::operator::error::{OperatorError, Result};

/// (name, namespace) identity of a namespaced object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    pub name: String,
    pub namespace: String,
}

impl ResourceId {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Identity of an object, read from its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::InvalidResource`] if the name or namespace is unset.
    pub fn of<K: Resource>(obj: &K) -> Result<Self> {
        let meta = obj.meta();
        match (&meta.name, &meta.namespace) {
            (Some(name), Some(namespace)) => Ok(Self::new(name.clone(), namespace.clone())),
            _ => Err(OperatorError::InvalidResource(
                "object is missing metadata.name or metadata.namespace".to_string(),
            )),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Read/create/update access to one kind of namespaced object.
///
/// `get` reports absence as `Ok(None)`; the write operations report it as
/// [`OperatorError::NotFound`].
#[async_trait]
pub trait ObjectStore<K: Send + Sync>: Send + Sync {
    /// Fetches the object with the given identity.
    async fn get(&self, id: &ResourceId) -> Result<Option<K>>;

    /// Creates `obj`. Fails with [`OperatorError::AlreadyExists`] if taken.
    async fn create(&self, obj: &K) -> Result<K>;

    /// Replaces the object's metadata and spec. Status is left untouched.
    async fn update(&self, obj: &K) -> Result<K>;

    /// Writes the object's status subresource. Spec is left untouched.
    async fn update_status(&self, obj: &K) -> Result<K>;
}

fn kind_of<K: Resource>() -> String
where
    K::DynamicType: Default,
{
    K::kind(&K::DynamicType::default()).to_string()
}

/// [`ObjectStore`] backed by the Kubernetes API.
pub struct KubeObjectStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeObjectStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> KubeObjectStore<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn map_error(e: kube::Error, id: &ResourceId) -> OperatorError {
        match &e {
            kube::Error::Api(response) if response.code == 404 => OperatorError::NotFound {
                kind: kind_of::<K>(),
                id: id.to_string(),
            },
            kube::Error::Api(response) if response.code == 409 && response.reason == "AlreadyExists" => {
                OperatorError::AlreadyExists {
                    kind: kind_of::<K>(),
                    id: id.to_string(),
                }
            }
            _ => OperatorError::Kube(e),
        }
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeObjectStore<K>
where
    K: Resource<Scope = NamespaceResourceScope>
        + Clone
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
    K::DynamicType: Default,
{
    async fn get(&self, id: &ResourceId) -> Result<Option<K>> {
        Ok(self.api(&id.namespace).get_opt(&id.name).await?)
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let id = ResourceId::of(obj)?;
        debug!(kind = %kind_of::<K>(), id = %id, "Creating object");

        self.api(&id.namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| Self::map_error(e, &id))
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let id = ResourceId::of(obj)?;
        debug!(kind = %kind_of::<K>(), id = %id, "Replacing object");

        self.api(&id.namespace)
            .replace(&id.name, &PostParams::default(), obj)
            .await
            .map_err(|e| Self::map_error(e, &id))
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let id = ResourceId::of(obj)?;
        let status = serde_json::to_value(obj)?
            .get("status")
            .cloned()
            .unwrap_or(Value::Null);

        debug!(kind = %kind_of::<K>(), id = %id, "Updating status");

        let patch = json!({ "status": status });
        self.api(&id.namespace)
            .patch_status(&id.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Self::map_error(e, &id))
    }
}

/// Write counters of an [`InMemoryObjectStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub creates: usize,
    pub updates: usize,
    pub status_updates: usize,
}

impl WriteCounts {
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.status_updates
    }
}

/// [`ObjectStore`] keeping objects in process memory.
///
/// Mirrors the API server's split between spec and status: `update` keeps
/// the stored status, `update_status` keeps the stored spec. Writes can be
/// made to fail with [`Self::fail_writes`].
pub struct InMemoryObjectStore<K> {
    objects: Mutex<BTreeMap<ResourceId, K>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
    status_updates: AtomicUsize,
    fail_writes: AtomicBool,
}

impl<K> InMemoryObjectStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned,
    K::DynamicType: Default,
{
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            status_updates: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ResourceId, K>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds an object without counting it as a write.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::InvalidResource`] if the object has no identity.
    pub fn insert(&self, obj: K) -> Result<()> {
        let id = ResourceId::of(&obj)?;
        self.lock().insert(id, obj);
        Ok(())
    }

    /// Removes an object, as if it was deleted by someone else.
    pub fn remove(&self, id: &ResourceId) -> Option<K> {
        self.lock().remove(id)
    }

    /// Synchronous read of a stored object.
    pub fn peek(&self, id: &ResourceId) -> Option<K> {
        self.lock().get(id).cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes performed through the [`ObjectStore`] interface so far.
    pub fn writes(&self) -> WriteCounts {
        WriteCounts {
            creates: self.creates.load(Ordering::SeqCst),
            updates: self.updates.load(Ordering::SeqCst),
            status_updates: self.status_updates.load(Ordering::SeqCst),
        }
    }

    /// Makes every subsequent write fail with [`OperatorError::Store`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self, id: &ResourceId) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OperatorError::Store(format!(
                "write to {} {id} rejected",
                kind_of::<K>()
            )));
        }
        Ok(())
    }

    fn not_found(id: &ResourceId) -> OperatorError {
        OperatorError::NotFound {
            kind: kind_of::<K>(),
            id: id.to_string(),
        }
    }

    /// Copies the `status` field of `from` into `into`.
    fn with_status_of(into: &K, from: &K) -> Result<K> {
        let mut value = serde_json::to_value(into)?;
        let status = serde_json::to_value(from)?
            .get("status")
            .cloned()
            .unwrap_or(Value::Null);

        match value.as_object_mut() {
            Some(object) => {
                object.insert("status".to_string(), status);
            }
            None => {
                return Err(OperatorError::Store(format!(
                    "{} does not serialize to an object",
                    kind_of::<K>()
                )));
            }
        }

        Ok(serde_json::from_value(value)?)
    }
}

impl<K> Default for InMemoryObjectStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned,
    K::DynamicType: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K> ObjectStore<K> for InMemoryObjectStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    K::DynamicType: Default,
{
    async fn get(&self, id: &ResourceId) -> Result<Option<K>> {
        Ok(self.peek(id))
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let id = ResourceId::of(obj)?;
        self.check_writable(&id)?;

        let mut objects = self.lock();
        if objects.contains_key(&id) {
            return Err(OperatorError::AlreadyExists {
                kind: kind_of::<K>(),
                id: id.to_string(),
            });
        }

        objects.insert(id, obj.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);

        Ok(obj.clone())
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let id = ResourceId::of(obj)?;
        self.check_writable(&id)?;

        let mut objects = self.lock();
        let stored = objects.get(&id).ok_or_else(|| Self::not_found(&id))?;
        let updated = Self::with_status_of(obj, stored)?;

        objects.insert(id, updated.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);

        Ok(updated)
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let id = ResourceId::of(obj)?;
        self.check_writable(&id)?;

        let mut objects = self.lock();
        let stored = objects.get(&id).ok_or_else(|| Self::not_found(&id))?;
        let updated = Self::with_status_of(stored, obj)?;

        objects.insert(id, updated.clone());
        self.status_updates.fetch_add(1, Ordering::SeqCst);

        Ok(updated)
    }
}
