use crate::{Metadata, Plugins};
use serde::{Deserialize, Serialize};

/// A reusable set of plugins that routes refer to by ID.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    #[serde(flatten)]
    pub metadata: Metadata,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    pub plugins: Plugins,
}
