use crate::{PluginConfig, Resource, Route, Ssl, StreamRoute, Upstream};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use serde::{Deserialize, Serialize};

/// A coherent snapshot of the desired configuration of a cluster.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub routes: Vec<Route>,
    pub upstreams: Vec<Upstream>,
    pub stream_routes: Vec<StreamRoute>,
    pub ssls: Vec<Ssl>,
    pub plugin_configs: Vec<PluginConfig>,
}

/// The changes needed to turn one manifest into another.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diff {
    pub added: Manifest,
    pub updated: Manifest,
    pub deleted: Manifest,
}

/// Computes the resources added, updated and deleted between `old` and `new`.
///
/// Each kind is compared independently, keyed by ID. Results preserve the order in which resources
/// appear in their source manifest.
pub fn diff(old: Option<&Manifest>, new: Option<&Manifest>) -> Diff {
    let empty = Manifest::default();
    let old = old.unwrap_or(&empty);
    let new = new.unwrap_or(&empty);

    let mut diff = Diff::default();
    macro_rules! diff_field {
        ($field:ident) => {
            let (added, updated, deleted) = diff_kind(&old.$field, &new.$field);
            diff.added.$field = added;
            diff.updated.$field = updated;
            diff.deleted.$field = deleted;
        };
    }
    diff_field!(routes);
    diff_field!(upstreams);
    diff_field!(stream_routes);
    diff_field!(ssls);
    diff_field!(plugin_configs);
    diff
}

fn diff_kind<K: Resource>(old: &[K], new: &[K]) -> (Vec<K>, Vec<K>, Vec<K>) {
    let old_by_id = index(old);
    let new_by_id = index(new);

    let mut added = Vec::new();
    let mut updated = Vec::new();
    let mut seen = HashSet::with_capacity(new.len());
    for id in new.iter().map(Resource::id) {
        if !seen.insert(id) {
            continue;
        }
        // The last occurrence of a duplicated ID wins.
        let desired = new_by_id[id];
        match old_by_id.get(id) {
            None => added.push(desired.clone()),
            Some(current) if *current != desired => updated.push(desired.clone()),
            Some(_) => {}
        }
    }

    let mut seen = HashSet::with_capacity(old.len());
    let deleted = old
        .iter()
        .filter(|r| !new_by_id.contains_key(r.id()) && seen.insert(r.id()))
        .map(|r| old_by_id[r.id()].clone())
        .collect();

    (added, updated, deleted)
}

fn index<K: Resource>(resources: &[K]) -> HashMap<&str, &K> {
    resources.iter().map(|r| (r.id(), r)).collect()
}

// === impl Manifest ===

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The total number of resources in the manifest.
    pub fn len(&self) -> usize {
        self.routes.len()
            + self.upstreams.len()
            + self.stream_routes.len()
            + self.ssls.len()
            + self.plugin_configs.len()
    }

    /// Derives missing IDs from resource names.
    pub fn assign_ids(&mut self) {
        self.routes.iter_mut().for_each(Resource::ensure_id);
        self.upstreams.iter_mut().for_each(Resource::ensure_id);
        self.stream_routes.iter_mut().for_each(Resource::ensure_id);
        self.ssls.iter_mut().for_each(Resource::ensure_id);
        self.plugin_configs.iter_mut().for_each(Resource::ensure_id);
    }
}

// === impl Diff ===

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metadata;
    use pretty_assertions::assert_eq;

    fn route(id: &str, methods: &[&str]) -> Route {
        Route {
            metadata: Metadata {
                id: id.to_string(),
                name: id.to_string(),
                ..Metadata::default()
            },
            uri: Some("/*".to_string()),
            methods: methods.iter().map(ToString::to_string).collect(),
            ..Route::default()
        }
    }

    fn routes(routes: Vec<Route>) -> Manifest {
        Manifest {
            routes,
            ..Manifest::default()
        }
    }

    #[test]
    fn diff_from_nothing_adds_everything() {
        let new = routes(vec![route("1", &[]), route("2", &[])]);
        let diff = diff(None, Some(&new));
        assert_eq!(diff.added, new);
        assert!(diff.updated.is_empty());
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn diff_to_nothing_deletes_everything() {
        let old = routes(vec![route("1", &[]), route("2", &[])]);
        let diff = diff(Some(&old), None);
        assert!(diff.added.is_empty());
        assert!(diff.updated.is_empty());
        assert_eq!(diff.deleted, old);
    }

    #[test]
    fn diff_partitions_added_updated_and_deleted() {
        let old = routes(vec![route("2", &[]), route("3", &["POST", "PUT"])]);
        let new = routes(vec![route("1", &[]), route("3", &["POST"])]);
        let diff = diff(Some(&old), Some(&new));
        assert_eq!(diff.added, routes(vec![route("1", &[])]));
        assert_eq!(diff.updated, routes(vec![route("3", &["POST"])]));
        assert_eq!(diff.deleted, routes(vec![route("2", &[])]));
    }

    #[test]
    fn diff_of_identical_manifests_is_empty() {
        let manifest = Manifest {
            routes: vec![route("1", &["GET"])],
            upstreams: vec![Upstream {
                metadata: Metadata::named("u1"),
                ..Upstream::default()
            }],
            ..Manifest::default()
        };
        assert!(diff(Some(&manifest), Some(&manifest.clone())).is_empty());
        assert!(diff(None, None).is_empty());
    }

    #[test]
    fn kinds_are_diffed_independently() {
        let ups = Upstream {
            metadata: Metadata::named("shared"),
            ..Upstream::default()
        };
        let old = Manifest {
            upstreams: vec![ups.clone()],
            ..Manifest::default()
        };
        let new = Manifest {
            upstreams: vec![ups],
            plugin_configs: vec![PluginConfig {
                metadata: Metadata::named("shared"),
                ..PluginConfig::default()
            }],
            ..Manifest::default()
        };
        let diff = diff(Some(&old), Some(&new));
        assert_eq!(diff.added.plugin_configs.len(), 1);
        assert!(diff.added.upstreams.is_empty());
        assert!(diff.updated.is_empty());
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn duplicated_ids_are_reported_once() {
        let new = routes(vec![route("1", &["GET"]), route("1", &["POST"])]);
        let diff = diff(None, Some(&new));
        assert_eq!(diff.added, routes(vec![route("1", &["POST"])]));
    }

    #[test]
    fn manifests_load_from_yaml_and_derive_ids() {
        let mut manifest: Manifest = serde_yaml::from_str(
            r#"
upstreams:
  - name: default_httpbin_80
    type: roundrobin
    nodes:
      - host: 10.0.0.1
        port: 80
        weight: 100
routes:
  - name: default_httpbin
    uri: /ip
    upstream_id: explicit
"#,
        )
        .unwrap();
        manifest.assign_ids();
        assert_eq!(
            manifest.upstreams[0].metadata.id,
            crate::id::derive("default_httpbin_80")
        );
        assert_eq!(
            manifest.routes[0].metadata.id,
            crate::id::derive("default_httpbin")
        );
        assert_eq!(manifest.routes[0].upstream_id.as_deref(), Some("explicit"));
        assert_eq!(manifest.len(), 2);
    }
}
