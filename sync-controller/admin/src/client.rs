use crate::{generation, wire, Cluster, Error, Result};
use gateway_sync_cache::CacheExt;
use gateway_sync_core::{
    Consumer, GlobalRule, PluginConfig, PluginMetadata, Resource, Route, Service, Ssl,
    StreamRoute, Upstream,
};
use http::{Method, StatusCode};
use std::marker::PhantomData;
use tracing::{debug, instrument, warn};

/// A resource kind the admin API accepts writes for.
///
/// Plugin schemas are served by the gateway itself and are read through
/// [`SchemaClient`](crate::SchemaClient) instead, so no [`ResourceClient`] can be built for them:
///
/// ```compile_fail
/// fn schemas(cluster: &gateway_sync_admin::Cluster) {
///     let _ = cluster.client::<gateway_sync_core::Schema>();
/// }
/// ```
pub trait Writable: Resource {}

impl Writable for Route {}
impl Writable for Service {}
impl Writable for Upstream {}
impl Writable for Ssl {}
impl Writable for StreamRoute {}
impl Writable for GlobalRule {}
impl Writable for Consumer {}
impl Writable for PluginConfig {}
impl Writable for PluginMetadata {}

/// Reads and writes resources of kind `K` through a [`Cluster`]'s admin API, keeping its local
/// stores up to date.
pub struct ResourceClient<'c, K> {
    cluster: &'c Cluster,
    _kind: PhantomData<fn() -> K>,
}

// === impl ResourceClient ===

impl<'c, K: Writable> ResourceClient<'c, K> {
    pub(crate) fn new(cluster: &'c Cluster) -> Self {
        Self {
            cluster,
            _kind: PhantomData,
        }
    }

    /// Looks up a resource by name, preferring the cache to the admin API.
    ///
    /// The cache is searched by the ID derived from `name` and then by its name index, which also
    /// finds objects stored under IDs chosen elsewhere. Concurrent lookups of the same uncached
    /// name each reach the admin API.
    #[instrument(skip(self), fields(cluster = %self.cluster.name(), kind = %K::KIND))]
    pub async fn get(&self, name: &str) -> Result<K> {
        let id = K::id_for_name(name);
        match self.cached(&id, name) {
            Ok(obj) => return Ok(obj),
            Err(gateway_sync_cache::Error::NotFound { .. }) => {}
            Err(error) => {
                warn!(%error, %id, "Failed to find object in cache; falling back to the admin API")
            }
        }

        let rsp = self
            .cluster
            .call(Method::GET, &self.item_path(&id), None)
            .await
            .map_err(|error| self.not_found(error, &id))?;
        let obj = wire::decode_item::<K>(rsp.body(), self.cluster.name())?;
        self.cluster.cache.insert_resource(&obj)?;
        Ok(obj)
    }

    /// Lists every resource of this kind held by the admin API. The cache is bypassed.
    #[instrument(skip(self), fields(cluster = %self.cluster.name(), kind = %K::KIND))]
    pub async fn list(&self) -> Result<Vec<K>> {
        let rsp = self
            .cluster
            .call(Method::GET, K::KIND.collection(), None)
            .await?;
        wire::decode_list(rsp.body(), self.cluster.name())
    }

    /// Creates a resource, returning the object the admin API stored.
    ///
    /// When `should_compare` is set and the object is identical to the last one written with the
    /// same ID, the cached object is returned without contacting the admin API.
    #[instrument(skip_all, fields(cluster = %self.cluster.name(), kind = %K::KIND, id = %obj.id()))]
    pub async fn create(&self, obj: &K, should_compare: bool) -> Result<K> {
        self.cluster.has_synced().await?;
        if let Some(cached) = generation::unchanged(self.cluster, obj, should_compare) {
            debug!("Skipping unchanged object");
            return Ok(cached);
        }
        self.put(obj).await
    }

    /// Updates a resource, creating it if the admin API does not hold it.
    ///
    /// Both creates and updates `PUT` the whole object to its item URL, so the stored object is
    /// replaced rather than merged: fields left unset are cleared on the admin API.
    ///
    /// Unchanged objects are skipped as with [`Self::create`].
    #[instrument(skip_all, fields(cluster = %self.cluster.name(), kind = %K::KIND, id = %obj.id()))]
    pub async fn update(&self, obj: &K, should_compare: bool) -> Result<K> {
        self.cluster.has_synced().await?;
        if let Some(cached) = generation::unchanged(self.cluster, obj, should_compare) {
            debug!("Skipping unchanged object");
            return Ok(cached);
        }
        self.put(obj).await
    }

    /// Deletes a resource. Deleting a resource the admin API does not hold succeeds.
    #[instrument(skip_all, fields(cluster = %self.cluster.name(), kind = %K::KIND, id = %obj.id()))]
    pub async fn delete(&self, obj: &K) -> Result<()> {
        self.cluster.has_synced().await?;

        let id = obj.id();
        match self
            .cluster
            .call(Method::DELETE, &self.item_path(id), None)
            .await
        {
            Ok(_) => {}
            Err(Error::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
                debug!("Object already deleted")
            }
            Err(Error::Status {
                status, message, ..
            }) if status == StatusCode::BAD_REQUEST && wire::is_still_in_use(&message) => {
                return Err(Error::StillInUse {
                    kind: K::KIND,
                    id: id.to_string(),
                    message,
                })
            }
            Err(error) => return Err(error),
        }

        for store in [&self.cluster.cache, &self.cluster.generations] {
            match store.delete_resource(obj) {
                Ok(()) => {}
                Err(
                    error @ (gateway_sync_cache::Error::NotFound { .. }
                    | gateway_sync_cache::Error::StillInUse { .. }),
                ) => debug!(%error, "Ignoring local store error"),
                Err(error) => return Err(error.into()),
            }
        }
        Ok(())
    }

    async fn put(&self, obj: &K) -> Result<K> {
        let id = obj.id();
        if id.is_empty() {
            return Err(Error::MissingId { kind: K::KIND });
        }
        let body = serde_json::to_vec(obj).map_err(|source| Error::Encode {
            kind: K::KIND,
            source,
        })?;

        let rsp = self
            .cluster
            .call(Method::PUT, &self.item_path(id), Some(body))
            .await?;
        let stored = wire::decode_item::<K>(rsp.body(), self.cluster.name())?;

        self.cluster.cache.insert_resource(&stored)?;
        self.cluster.generations.insert_resource(obj)?;
        Ok(stored)
    }

    fn cached(&self, id: &str, name: &str) -> gateway_sync_cache::Result<K> {
        match self.cluster.cache.get_resource::<K>(id) {
            Err(gateway_sync_cache::Error::NotFound { .. }) => {
                self.cluster.cache.get_resource_by_name::<K>(name)
            }
            res => res,
        }
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{id}", K::KIND.collection())
    }

    fn not_found(&self, error: Error, id: &str) -> Error {
        match error {
            Error::Status { status, .. } if status == StatusCode::NOT_FOUND => Error::NotFound {
                kind: K::KIND,
                id: id.to_string(),
            },
            error => error,
        }
    }
}
