use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity shared by most resource kinds.
///
/// Only `id`, `name` and `labels` travel over the wire; the remaining fields are derived locally
/// from the owning cluster when an object is decoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// The cluster-qualified display name.
    #[serde(skip)]
    pub full_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The name of the cluster that owns the object.
    #[serde(skip)]
    pub group: String,

    #[serde(skip)]
    pub resource_version: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Metadata {
    /// Names a resource, deriving its ID from the name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: crate::id::derive(&name),
            name,
            ..Self::default()
        }
    }

    /// Records the identity reported by a cluster's admin API.
    pub fn adopt(&mut self, id: &str, cluster: &str) {
        self.id = id.to_string();
        self.group = cluster.to_string();
        self.full_name = full_name(cluster, &self.name);
    }
}

/// Qualifies `name` with the cluster it belongs to, if any.
pub fn full_name(cluster: &str, name: &str) -> String {
    if cluster.is_empty() {
        return name.to_string();
    }
    format!("{cluster}_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_names_are_cluster_qualified() {
        assert_eq!(full_name("default", "httpbin"), "default_httpbin");
        assert_eq!(full_name("", "httpbin"), "httpbin");
    }

    #[test]
    fn adopt_sets_derived_fields() {
        let mut md = Metadata::named("httpbin");
        md.adopt("1234", "edge");
        assert_eq!(md.id, "1234");
        assert_eq!(md.group, "edge");
        assert_eq!(md.full_name, "edge_httpbin");
    }

    #[test]
    fn local_fields_are_not_serialized() {
        let mut md = Metadata::named("httpbin");
        md.adopt("1234", "edge");
        md.resource_version = "7".to_string();
        let json = serde_json::to_value(&md).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "1234", "name": "httpbin" }));
    }
}
