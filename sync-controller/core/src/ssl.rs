use crate::Metadata;
use serde::{Deserialize, Serialize};

/// A TLS certificate served for a set of SNIs.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ssl {
    #[serde(flatten)]
    pub metadata: Metadata,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snis: Vec<String>,

    pub cert: String,

    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<MutualTlsClientConfig>,
}

/// Enables client certificate verification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutualTlsClientConfig {
    pub ca: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
}

// Keeps private keys out of logs.
impl std::fmt::Debug for Ssl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ssl")
            .field("metadata", &self.metadata)
            .field("snis", &self.snis)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
