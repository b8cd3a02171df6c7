use crate::Cluster;
use gateway_sync_cache::CacheExt;
use gateway_sync_core::Resource;
use tracing::debug;

/// Returns the cached object when a write of `obj` would not change the admin API's state.
///
/// A write is skipped only when comparison is enabled (for the cluster and by the caller), `obj`
/// equals the last object written with its ID, and the cache still holds that ID. Any lookup
/// failure forces the write.
pub(crate) fn unchanged<K: Resource>(cluster: &Cluster, obj: &K, should_compare: bool) -> Option<K> {
    if !should_compare || !cluster.sync_comparison() {
        return None;
    }

    let generated = match cluster.generations.get_resource::<K>(obj.id()) {
        Ok(generated) => generated,
        Err(error) => {
            debug!(%error, "No prior generation");
            return None;
        }
    };
    if generated != *obj {
        return None;
    }

    match cluster.cache.get_resource::<K>(obj.id()) {
        Ok(cached) => Some(cached),
        Err(error) => {
            debug!(%error, "Unchanged object is not cached");
            None
        }
    }
}
