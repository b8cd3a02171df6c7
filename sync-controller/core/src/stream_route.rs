use crate::{Metadata, Plugins, References};
use serde::{Deserialize, Serialize};

/// Routes L4 (TCP/UDP) traffic to an upstream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamRoute {
    #[serde(flatten)]
    pub metadata: Metadata,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_addr: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,

    #[serde(skip_serializing_if = "Plugins::is_empty")]
    pub plugins: Plugins,
}

impl StreamRoute {
    pub(crate) fn foreign_keys(&self) -> References<'_> {
        References {
            upstream_id: self.upstream_id.as_deref(),
            ..References::default()
        }
    }
}
