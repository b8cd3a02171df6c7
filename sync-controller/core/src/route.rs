use crate::{Metadata, Plugins, References, Timeout};
use serde::{Deserialize, Serialize};

/// Matches requests and forwards them to an upstream, optionally through a service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    #[serde(flatten)]
    pub metadata: Metadata,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,

    /// Request variable expressions, kept in the gateway's nested-array form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_websocket: Option<bool>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remote_addrs: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_config_id: Option<String>,

    #[serde(skip_serializing_if = "Plugins::is_empty")]
    pub plugins: Plugins,
}

impl Route {
    pub(crate) fn foreign_keys(&self) -> References<'_> {
        References {
            upstream_id: self.upstream_id.as_deref(),
            service_id: self.service_id.as_deref(),
            plugin_config_id: self.plugin_config_id.as_deref(),
        }
    }
}
