use crate::{Cache, Error, Result};
use gateway_sync_core::{Kind, Object};

/// A [`Cache`] that stores nothing.
///
/// Writes succeed, lists are empty and lookups miss, so clients always fall through to the admin
/// API.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopDb;

impl Cache for NoopDb {
    fn insert(&self, _: Object) -> Result<()> {
        Ok(())
    }

    fn get(&self, kind: Kind, id: &str) -> Result<Object> {
        Err(Error::NotFound {
            kind,
            id: id.to_string(),
        })
    }

    fn get_by_name(&self, kind: Kind, name: &str) -> Result<Object> {
        self.get(kind, name)
    }

    fn list(&self, _: Kind) -> Result<Vec<Object>> {
        Ok(Vec::new())
    }

    fn delete(&self, _: &Object) -> Result<()> {
        Ok(())
    }

    fn check_references(&self, _: &Object) -> Result<()> {
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        Ok(())
    }
}
