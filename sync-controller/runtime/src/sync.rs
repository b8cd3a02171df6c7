use gateway_sync_admin::{Cluster, Error, Writable};
use gateway_sync_core::{diff, Diff, Kind, Manifest, PluginConfig, Upstream};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// The operation that failed to apply a resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    Update,
    Delete,
}

/// A single resource that could not be applied.
#[derive(Debug, thiserror::Error)]
#[error("failed to {op} {kind} {id}: {error}")]
pub struct Failure {
    pub op: Op,
    pub kind: Kind,
    pub id: String,
    #[source]
    pub error: Error,
}

/// Every resource that could not be applied during a sync pass.
#[derive(Debug)]
pub struct SyncError {
    pub failures: Vec<Failure>,
}

/// Applies the changes between two manifests to a cluster, returning the deletes that were skipped
/// because their resources are still referenced (see [`sync`]).
pub async fn reconcile(
    cluster: &Cluster,
    old: Option<&Manifest>,
    new: Option<&Manifest>,
) -> Result<Manifest, SyncError> {
    let Diff {
        added,
        updated,
        deleted,
    } = diff(old, new);
    sync(cluster, &added, &updated, &deleted).await
}

/// Applies a set of changes to a cluster.
///
/// Deletes are applied first (SSLs, routes, stream routes, upstreams, plugin configs), then
/// creates, then updates (SSLs, upstreams, plugin configs, routes, stream routes), so that
/// references resolve whenever the admin API enforces them.
///
/// An upstream or plugin config that is still referenced when its turn to be deleted comes is
/// retried once after the updates, by which time its referrers may have been repointed. If it is
/// still referenced then, the delete is skipped and the resource is returned so that the caller can
/// request its deletion again in a later pass.
///
/// A failure to apply one resource does not prevent the others from being applied; all failures
/// are returned together.
#[instrument(skip_all, fields(cluster = %cluster.name()))]
pub async fn sync(
    cluster: &Cluster,
    added: &Manifest,
    updated: &Manifest,
    deleted: &Manifest,
) -> Result<Manifest, SyncError> {
    let mut batch = Batch {
        cluster,
        failures: Vec::new(),
    };

    batch.delete(&deleted.ssls).await;
    batch.delete(&deleted.routes).await;
    batch.delete(&deleted.stream_routes).await;
    let upstreams = batch.delete_unreferenced(&deleted.upstreams).await;
    let plugin_configs = batch.delete_unreferenced(&deleted.plugin_configs).await;

    batch.create(&added.ssls).await;
    batch.create(&added.upstreams).await;
    batch.create(&added.plugin_configs).await;
    batch.create(&added.routes).await;
    batch.create(&added.stream_routes).await;

    batch.update(&updated.ssls).await;
    batch.update(&updated.upstreams).await;
    batch.update(&updated.plugin_configs).await;
    batch.update(&updated.routes).await;
    batch.update(&updated.stream_routes).await;

    let skipped = Manifest {
        upstreams: batch.delete_deferred::<Upstream>(upstreams).await,
        plugin_configs: batch.delete_deferred::<PluginConfig>(plugin_configs).await,
        ..Manifest::default()
    };

    batch.finish(skipped)
}

struct Batch<'c> {
    cluster: &'c Cluster,
    failures: Vec<Failure>,
}

// === impl Batch ===

impl Batch<'_> {
    async fn create<K: Writable>(&mut self, objs: &[K]) {
        for obj in objs {
            let res = self.cluster.client::<K>().create(obj, true).await;
            self.record(Op::Create, obj, res.map(drop));
        }
    }

    async fn update<K: Writable>(&mut self, objs: &[K]) {
        for obj in objs {
            let res = self.cluster.client::<K>().update(obj, true).await;
            self.record(Op::Update, obj, res.map(drop));
        }
    }

    async fn delete<K: Writable>(&mut self, objs: &[K]) {
        for obj in objs {
            let res = self.cluster.client::<K>().delete(obj).await;
            self.record(Op::Delete, obj, res);
        }
    }

    /// Deletes the objects nothing refers to, returning those that are still referenced.
    async fn delete_unreferenced<'m, K: Writable>(&mut self, objs: &'m [K]) -> Vec<&'m K> {
        let mut deferred = Vec::new();
        for obj in objs {
            if let Err(error) = self.check_references(obj) {
                debug!(%error, "Deferring delete");
                deferred.push(obj);
                continue;
            }
            match self.cluster.client::<K>().delete(obj).await {
                Err(error) if error.is_still_in_use() => {
                    debug!(%error, "Deferring delete");
                    deferred.push(obj);
                }
                res => self.record(Op::Delete, obj, res),
            }
        }
        deferred
    }

    /// Retries deferred deletes, returning the objects that are still referenced.
    async fn delete_deferred<K: Writable>(&mut self, objs: Vec<&K>) -> Vec<K> {
        let mut skipped = Vec::new();
        for obj in objs {
            let res = match self.check_references(obj) {
                Ok(()) => self.cluster.client::<K>().delete(obj).await,
                Err(error) => Err(error),
            };
            match res {
                Err(error) if error.is_still_in_use() => {
                    info!(
                        %error,
                        kind = %K::KIND,
                        id = %obj.id(),
                        "Skipping delete of a resource still in use",
                    );
                    skipped.push(obj.clone());
                }
                res => self.record(Op::Delete, obj, res),
            }
        }
        skipped
    }

    fn check_references<K: Writable>(&self, obj: &K) -> Result<(), Error> {
        self.cluster
            .cache()
            .check_references(&obj.clone().into_object())
            .map_err(Into::into)
    }

    fn record<K: Writable>(&mut self, op: Op, obj: &K, res: Result<(), Error>) {
        if let Err(error) = res {
            warn!(%error, %op, kind = %K::KIND, id = %obj.id(), "Failed to apply resource");
            self.failures.push(Failure {
                op,
                kind: K::KIND,
                id: obj.id().to_string(),
                error,
            });
        }
    }

    fn finish(self, skipped: Manifest) -> Result<Manifest, SyncError> {
        if self.failures.is_empty() {
            return Ok(skipped);
        }
        Err(SyncError {
            failures: self.failures,
        })
    }
}

// === impl Op ===

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Create => "create",
            Op::Update => "update",
            Op::Delete => "delete",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl SyncError ===

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} resource(s) failed to sync", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SyncError {}
