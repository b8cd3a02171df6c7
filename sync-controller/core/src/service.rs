use crate::{Metadata, Plugins, References};
use serde::{Deserialize, Serialize};

/// Groups plugins and an upstream so that many routes can share them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    #[serde(flatten)]
    pub metadata: Metadata,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_websocket: Option<bool>,

    #[serde(skip_serializing_if = "Plugins::is_empty")]
    pub plugins: Plugins,
}

impl Service {
    pub(crate) fn foreign_keys(&self) -> References<'_> {
        References {
            upstream_id: self.upstream_id.as_deref(),
            ..References::default()
        }
    }
}
