//! Gateway Sync Admin
//!
//! Clients for a gateway's admin API. Each [`Cluster`] pairs one remote admin API with two local
//! stores:
//!
//! - the cache, a mirror of the objects the remote API last reported, consulted before issuing
//!   lookups and updated after every successful mutation; and
//! - the generation store, holding the last object this process asked the remote API to store for
//!   each ID, so that writes of unchanged objects can be skipped.
//!
//! Resource clients are generic over [`Writable`] kinds; the per-kind accessors on [`Cluster`]
//! merely fix the type parameter.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod client;
mod cluster;
mod generation;
mod registry;
mod schema;
mod transport;
mod wire;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;


pub use self::{
    client::{ResourceClient, Writable},
    cluster::{Cluster, ClusterOptions},
    registry::Clusters,
    schema::SchemaClient,
    transport::{HyperTransport, Transport},
};
use gateway_sync_core::Kind;
use http::{Method, StatusCode};
use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cluster {0} has not completed its initial sync")]
    NotReady(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: Kind, id: String },

    #[error("{kind} {id} is still in use: {message}")]
    StillInUse {
        kind: Kind,
        id: String,
        message: String,
    },

    #[error("{kind} has no ID")]
    MissingId { kind: Kind },

    #[error("cluster {0} already exists")]
    ClusterExists(String),

    #[error("{method} {uri} failed with {status}: {message}")]
    Status {
        method: Method,
        uri: String,
        status: StatusCode,
        message: String,
    },

    #[error("{method} {uri} timed out after {timeout:?}")]
    Timeout {
        method: Method,
        uri: String,
        timeout: Duration,
    },

    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: Kind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {kind}: {source}")]
    Decode {
        kind: Kind,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Http(#[from] hyper_util::client::legacy::Error),

    #[error(transparent)]
    Body(#[from] hyper::Error),

    #[error(transparent)]
    Request(#[from] http::Error),

    #[error(transparent)]
    Cache(#[from] gateway_sync_cache::Error),
}

// === impl Error ===

impl Error {
    /// Indicates that the object does not exist, either remotely or in a local store.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Cache(gateway_sync_cache::Error::NotFound { .. })
        )
    }

    /// Indicates that the object cannot be deleted while other objects refer to it.
    pub fn is_still_in_use(&self) -> bool {
        matches!(
            self,
            Self::StillInUse { .. } | Self::Cache(gateway_sync_cache::Error::StillInUse { .. })
        )
    }
}
