//! Admin API envelopes.
//!
//! Items are wrapped as `{"node": {"key": "/apisix/routes/1", "value": {...}}}` and collections as
//! `{"count": 1, "node": {"key": "/apisix/routes", "nodes": [...]}}`. An empty collection may be
//! reported with `"nodes": {}`, and `count` may be either a number or a numeric string.

use crate::{Error, Result};
use gateway_sync_core::{compat, Resource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ItemResponse {
    pub node: Node,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ListResponse {
    #[serde(default, deserialize_with = "count")]
    pub count: u64,
    pub node: ListNode,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ListNode {
    #[serde(default)]
    pub key: String,

    #[serde(default, deserialize_with = "compat::vec_or_empty_object")]
    pub nodes: Vec<Node>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Node {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_msg: String,
}

/// Decodes a single-item response body.
pub(crate) fn decode_item<K: Resource>(body: &[u8], cluster: &str) -> Result<K> {
    let ItemResponse { node } = serde_json::from_slice(body).map_err(|source| Error::Decode {
        kind: K::KIND,
        source,
    })?;
    decode_node(node, cluster)
}

/// Decodes a collection response body.
pub(crate) fn decode_list<K: Resource>(body: &[u8], cluster: &str) -> Result<Vec<K>> {
    let ListResponse { count, node } =
        serde_json::from_slice(body).map_err(|source| Error::Decode {
            kind: K::KIND,
            source,
        })?;
    tracing::trace!(kind = %K::KIND, count, items = node.nodes.len(), "decoded list");
    node.nodes
        .into_iter()
        .map(|node| decode_node(node, cluster))
        .collect()
}

fn decode_node<K: Resource>(Node { key, value }: Node, cluster: &str) -> Result<K> {
    let id = id_from_key(&key)
        .ok_or_else(|| Error::Malformed(format!("{} key {key:?} has no ID", K::KIND)))?;
    let mut obj: K = serde_json::from_value(value).map_err(|source| Error::Decode {
        kind: K::KIND,
        source,
    })?;
    obj.adopt(id, cluster);
    Ok(obj)
}

/// The ID of an object is the last segment of its key.
pub(crate) fn id_from_key(key: &str) -> Option<&str> {
    key.rsplit('/').next().filter(|id| !id.is_empty())
}

/// Extracts the `error_msg` reported by the admin API, falling back to the raw body.
pub(crate) fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(ErrorResponse { error_msg }) => error_msg,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

/// Indicates that the admin API rejected a delete because the object is still referenced.
pub(crate) fn is_still_in_use(message: &str) -> bool {
    message.contains("still using")
}

fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        String(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::String(s) if s.is_empty() => Ok(0),
        Count::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
