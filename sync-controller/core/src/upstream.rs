use crate::{compat, Metadata};
use serde::{Deserialize, Serialize};

/// A set of backend nodes and the policy used to balance across them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Upstream {
    #[serde(flatten)]
    pub metadata: Metadata,

    /// The load-balancing algorithm, e.g. `roundrobin` or `chash`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub lb_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_on: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Health check configuration, passed through unmodified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<serde_json::Value>,

    #[serde(deserialize_with = "compat::vec_or_empty_object")]
    pub nodes: Vec<UpstreamNode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<ClientTls>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpstreamNode {
    pub host: String,
    pub port: u16,
    pub weight: u32,
}

/// Connection timeouts, in seconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub send: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<f64>,
}

/// The client certificate presented to upstream nodes.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientTls {
    pub client_cert: String,
    pub client_key: String,
}

impl std::fmt::Debug for ClientTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientTls").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_nodes_object_decodes_as_empty() {
        let ups: Upstream = serde_json::from_value(serde_json::json!({
            "id": "1",
            "type": "roundrobin",
            "nodes": {},
        }))
        .unwrap();
        assert!(ups.nodes.is_empty());
        assert_eq!(ups.lb_type.as_deref(), Some("roundrobin"));
    }

    #[test]
    fn nodes_round_trip_through_the_wire_shape() {
        let ups = Upstream {
            metadata: Metadata::named("default_httpbin_80"),
            lb_type: Some("roundrobin".to_string()),
            nodes: vec![UpstreamNode {
                host: "10.0.0.1".to_string(),
                port: 80,
                weight: 100,
            }],
            ..Upstream::default()
        };
        let json = serde_json::to_value(&ups).unwrap();
        assert_eq!(json["type"], "roundrobin");
        assert_eq!(json["nodes"][0]["port"], 80);
        let decoded: Upstream = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, ups);
    }
}
