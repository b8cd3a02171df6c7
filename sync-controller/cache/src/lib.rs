//! Gateway Sync Cache
//!
//! A local mirror of the resources known to exist on a remote gateway. Lookups against the mirror
//! avoid admin API round-trips, and its foreign-key indexes enforce the referential rules the admin
//! API does not:
//!
//! ```text
//! [ Route ] --upstream_id------> [ Upstream ] <--upstream_id-- [ StreamRoute ]
//!     |------service_id--------> [ Service ]
//!     \------plugin_config_id--> [ PluginConfig ]
//! ```
//!
//! Every value crosses the store boundary as a copy: inserts take ownership of (or clone) the
//! caller's object and reads return clones, so callers can never observe or corrupt stored state
//! through a shared reference.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod memdb;
mod noop;

#[cfg(test)]
mod tests;

pub use self::{memdb::MemDb, noop::NoopDb};
use gateway_sync_core::{Kind, Object, Resource};
use std::sync::Arc;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{kind} {id} not found")]
    NotFound { kind: Kind, id: String },

    #[error("{kind} {id} is still referenced by {referrer} {referrer_id}")]
    StillInUse {
        kind: Kind,
        id: String,
        referrer: Kind,
        referrer_id: String,
    },

    #[error("{kind} has no ID")]
    MissingId { kind: Kind },

    #[error("expected a {expected}, found a {found}")]
    KindMismatch { expected: Kind, found: Kind },
}

/// A transactional store of gateway resources.
///
/// Mutations either commit fully or leave no trace, and reads observe a consistent snapshot.
pub trait Cache: Send + Sync + 'static {
    fn insert(&self, obj: Object) -> Result<()>;

    fn get(&self, kind: Kind, id: &str) -> Result<Object>;

    /// Resolves a resource through the unique name index.
    fn get_by_name(&self, kind: Kind, name: &str) -> Result<Object>;

    fn list(&self, kind: Kind) -> Result<Vec<Object>>;

    /// Removes a resource, failing with [`Error::StillInUse`] while another resource refers to it.
    fn delete(&self, obj: &Object) -> Result<()>;

    /// Fails with [`Error::StillInUse`] if deleting `obj` would orphan a reference.
    fn check_references(&self, obj: &Object) -> Result<()>;

    /// Empties every table.
    fn reset(&self) -> Result<()>;
}

/// Typed access to a [`Cache`].
pub trait CacheExt: Cache {
    fn insert_resource<K: Resource>(&self, obj: &K) -> Result<()> {
        self.insert(obj.clone().into_object())
    }

    fn get_resource<K: Resource>(&self, id: &str) -> Result<K> {
        downcast(self.get(K::KIND, id)?)
    }

    fn get_resource_by_name<K: Resource>(&self, name: &str) -> Result<K> {
        downcast(self.get_by_name(K::KIND, name)?)
    }

    fn list_resources<K: Resource>(&self) -> Result<Vec<K>> {
        self.list(K::KIND)?.into_iter().map(downcast).collect()
    }

    fn delete_resource<K: Resource>(&self, obj: &K) -> Result<()> {
        self.delete(&obj.clone().into_object())
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

#[derive(Debug, thiserror::Error)]
#[error("unknown cache backend {0:?}; expected `memdb` or `noop`")]
pub struct UnknownBackend(String);

/// Selects a [`Cache`] implementation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Caches resources in memory.
    #[default]
    MemDb,

    /// Caches nothing; every lookup misses.
    Noop,
}

// === impl Backend ===

impl Backend {
    pub fn build(self) -> Arc<dyn Cache> {
        match self {
            Self::MemDb => Arc::new(MemDb::default()),
            Self::Noop => Arc::new(NoopDb),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memdb" | "memory" => Ok(Self::MemDb),
            "noop" | "none" => Ok(Self::Noop),
            s => Err(UnknownBackend(s.to_string())),
        }
    }
}

fn downcast<K: Resource>(obj: Object) -> Result<K> {
    let found = obj.kind();
    K::from_object(obj).ok_or(Error::KindMismatch {
        expected: K::KIND,
        found,
    })
}
