use crate::{Metadata, Plugins};
use serde::{Deserialize, Serialize};

/// Plugins that run for every request, regardless of route.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalRule {
    #[serde(flatten)]
    pub metadata: Metadata,

    pub plugins: Plugins,
}
