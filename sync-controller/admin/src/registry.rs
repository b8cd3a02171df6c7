use crate::{Cluster, Error, Result};
use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// The clusters managed by this process, by name.
#[derive(Debug, Default)]
pub struct Clusters {
    by_name: RwLock<HashMap<String, Arc<Cluster>>>,
}

// === impl Clusters ===

impl Clusters {
    /// Registers a new cluster, failing if one with the same name exists.
    pub fn add(&self, cluster: Cluster) -> Result<Arc<Cluster>> {
        let mut by_name = self.by_name.write();
        if by_name.contains_key(cluster.name()) {
            return Err(Error::ClusterExists(cluster.name().to_string()));
        }
        let cluster = Arc::new(cluster);
        by_name.insert(cluster.name().to_string(), cluster.clone());
        Ok(cluster)
    }

    /// Registers a cluster, replacing any existing cluster with the same name.
    pub fn update(&self, cluster: Cluster) -> Arc<Cluster> {
        let cluster = Arc::new(cluster);
        if self
            .by_name
            .write()
            .insert(cluster.name().to_string(), cluster.clone())
            .is_some()
        {
            tracing::info!(cluster = %cluster.name(), "Replaced cluster");
        }
        cluster
    }

    pub fn get(&self, name: &str) -> Option<Arc<Cluster>> {
        self.by_name.read().get(name).cloned()
    }

    /// Lists clusters ordered by name.
    pub fn list(&self) -> Vec<Arc<Cluster>> {
        let mut clusters = self.by_name.read().values().cloned().collect::<Vec<_>>();
        clusters.sort_by(|a, b| a.name().cmp(b.name()));
        clusters
    }

    pub fn delete(&self, name: &str) -> Option<Arc<Cluster>> {
        self.by_name.write().remove(name)
    }

    /// Indicates whether every registered cluster has completed its initial sync.
    pub fn all_ready(&self) -> bool {
        self.by_name.read().values().all(|c| c.is_ready())
    }
}
