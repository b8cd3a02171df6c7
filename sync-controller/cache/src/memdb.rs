use crate::{Cache, Error, Result};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use gateway_sync_core::{Kind, Object};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::Arc;

/// An in-memory, transactional [`Cache`].
///
/// The committed state is an immutable snapshot behind an `Arc`. Readers clone the `Arc` and work
/// against that snapshot, so they never wait on a writer. Writers are serialized: each builds the
/// next snapshot copy-on-write (only the tables it touches are copied) and publishes it by
/// swapping the pointer on commit. A transaction that is dropped without committing leaves no
/// trace.
#[derive(Debug, Default)]
pub struct MemDb {
    committed: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

/// A write transaction against a [`MemDb`].
struct Txn<'db> {
    db: &'db MemDb,
    next: Snapshot,
    _writer: MutexGuard<'db, ()>,
}

#[derive(Clone, Debug, Default)]
struct Snapshot {
    tables: HashMap<Kind, Arc<Table>>,
}

#[derive(Clone, Debug, Default)]
struct Table {
    rows: HashMap<String, Arc<Object>>,

    /// Unique, but optional, names. A later insert claims a name from an earlier one.
    names: HashMap<String, String>,

    /// Foreign-key indexes: referenced ID -> IDs of the rows that refer to it.
    refs: HashMap<(Field, String), HashSet<String>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Field {
    UpstreamId,
    ServiceId,
    PluginConfigId,
}

/// Lists the tables (and fields) through which resources of `kind` may be referenced.
fn referrers(kind: Kind) -> &'static [(Kind, Field)] {
    match kind {
        Kind::Upstream => &[
            (Kind::Route, Field::UpstreamId),
            (Kind::StreamRoute, Field::UpstreamId),
        ],
        Kind::Service => &[(Kind::Route, Field::ServiceId)],
        Kind::PluginConfig => &[(Kind::Route, Field::PluginConfigId)],
        _ => &[],
    }
}

// === impl MemDb ===

impl MemDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.committed.read().clone()
    }

    fn txn(&self) -> Txn<'_> {
        let writer = self.writer.lock();
        Txn {
            next: (*self.snapshot()).clone(),
            db: self,
            _writer: writer,
        }
    }
}

impl Cache for MemDb {
    fn insert(&self, obj: Object) -> Result<()> {
        let mut txn = self.txn();
        txn.insert(obj)?;
        txn.commit();
        Ok(())
    }

    fn get(&self, kind: Kind, id: &str) -> Result<Object> {
        self.snapshot()
            .table(kind)
            .and_then(|t| t.rows.get(id))
            .map(|obj| (**obj).clone())
            .ok_or_else(|| Error::NotFound {
                kind,
                id: id.to_string(),
            })
    }

    fn get_by_name(&self, kind: Kind, name: &str) -> Result<Object> {
        let snapshot = self.snapshot();
        snapshot
            .table(kind)
            .and_then(|t| t.rows.get(t.names.get(name)?))
            .map(|obj| (**obj).clone())
            .ok_or_else(|| Error::NotFound {
                kind,
                id: name.to_string(),
            })
    }

    fn list(&self, kind: Kind) -> Result<Vec<Object>> {
        let snapshot = self.snapshot();
        let objs = snapshot
            .table(kind)
            .map(|t| t.rows.values().map(|obj| (**obj).clone()).collect())
            .unwrap_or_default();
        Ok(objs)
    }

    fn delete(&self, obj: &Object) -> Result<()> {
        let mut txn = self.txn();
        txn.delete(obj.kind(), obj.id())?;
        txn.commit();
        Ok(())
    }

    fn check_references(&self, obj: &Object) -> Result<()> {
        self.snapshot().check_references(obj.kind(), obj.id())
    }

    fn reset(&self) -> Result<()> {
        let mut txn = self.txn();
        txn.next = Snapshot::default();
        txn.commit();
        Ok(())
    }
}

// === impl Txn ===

impl Txn<'_> {
    fn insert(&mut self, obj: Object) -> Result<()> {
        let kind = obj.kind();
        if obj.id().is_empty() {
            return Err(Error::MissingId { kind });
        }

        let table = self.next.table_mut(kind);
        let id = obj.id().to_string();
        if let Some(prior) = table.rows.remove(&id) {
            table.unindex(&prior);
        }
        table.index(&obj);
        table.rows.insert(id, Arc::new(obj));
        Ok(())
    }

    fn delete(&mut self, kind: Kind, id: &str) -> Result<()> {
        let exists = self
            .next
            .table(kind)
            .is_some_and(|t| t.rows.contains_key(id));
        if !exists {
            return Err(Error::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        self.next.check_references(kind, id)?;

        let table = self.next.table_mut(kind);
        if let Some(prior) = table.rows.remove(id) {
            table.unindex(&prior);
        }
        Ok(())
    }

    fn commit(self) {
        let Self { db, next, _writer } = self;
        *db.committed.write() = Arc::new(next);
        tracing::trace!("committed");
    }
}

// === impl Snapshot ===

impl Snapshot {
    fn table(&self, kind: Kind) -> Option<&Table> {
        self.tables.get(&kind).map(|t| &**t)
    }

    fn table_mut(&mut self, kind: Kind) -> &mut Table {
        // Copies the table only if an older snapshot still shares it.
        Arc::make_mut(self.tables.entry(kind).or_default())
    }

    fn check_references(&self, kind: Kind, id: &str) -> Result<()> {
        for (referrer, field) in referrers(kind) {
            let referrer_id = self
                .table(*referrer)
                .and_then(|t| t.refs.get(&(*field, id.to_string())))
                .and_then(|ids| ids.iter().next());
            if let Some(referrer_id) = referrer_id {
                return Err(Error::StillInUse {
                    kind,
                    id: id.to_string(),
                    referrer: *referrer,
                    referrer_id: referrer_id.clone(),
                });
            }
        }
        Ok(())
    }
}

// === impl Table ===

impl Table {
    fn index(&mut self, obj: &Object) {
        let id = obj.id();
        if let Some(name) = obj.name() {
            self.names.insert(name.to_string(), id.to_string());
        }
        for key in foreign_keys(obj) {
            self.refs.entry(key).or_default().insert(id.to_string());
        }
    }

    fn unindex(&mut self, obj: &Object) {
        let id = obj.id();
        if let Some(name) = obj.name() {
            // The name may have been claimed by a later insert.
            if self.names.get(name).is_some_and(|owner| owner == id) {
                self.names.remove(name);
            }
        }
        for key in foreign_keys(obj) {
            if let Some(ids) = self.refs.get_mut(&key) {
                ids.remove(id);
                if ids.is_empty() {
                    self.refs.remove(&key);
                }
            }
        }
    }
}

fn foreign_keys(obj: &Object) -> impl Iterator<Item = (Field, String)> + '_ {
    let refs = obj.references();
    [
        (Field::UpstreamId, refs.upstream_id),
        (Field::ServiceId, refs.service_id),
        (Field::PluginConfigId, refs.plugin_config_id),
    ]
    .into_iter()
    .filter_map(|(field, id)| Some((field, id?.to_string())))
    .filter(|(_, id)| !id.is_empty())
}
