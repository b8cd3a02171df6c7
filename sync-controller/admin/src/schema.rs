use crate::{Cluster, Error, Result};
use gateway_sync_cache::CacheExt;
use gateway_sync_core::{Kind, Schema};
use http::{Method, StatusCode};
use tracing::{instrument, warn};

/// Reads plugin schemas. Schemas are served by the gateway itself and cannot be written.
pub struct SchemaClient<'c> {
    cluster: &'c Cluster,
}

// === impl SchemaClient ===

impl<'c> SchemaClient<'c> {
    pub(crate) fn new(cluster: &'c Cluster) -> Self {
        Self { cluster }
    }

    #[instrument(skip(self), fields(cluster = %self.cluster.name()))]
    pub async fn get(&self, name: &str) -> Result<Schema> {
        match self.cluster.cache.get_resource::<Schema>(name) {
            Ok(schema) => return Ok(schema),
            Err(gateway_sync_cache::Error::NotFound { .. }) => {}
            Err(error) => {
                warn!(%error, "Failed to find schema in cache; falling back to the admin API")
            }
        }

        let path = format!("{}/{name}", Kind::Schema.collection());
        let rsp = match self.cluster.call(Method::GET, &path, None).await {
            Ok(rsp) => rsp,
            Err(Error::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
                return Err(Error::NotFound {
                    kind: Kind::Schema,
                    id: name.to_string(),
                })
            }
            Err(error) => return Err(error),
        };

        let schema = Schema {
            name: name.to_string(),
            content: String::from_utf8_lossy(rsp.body()).into_owned(),
        };
        self.cluster.cache.insert_resource(&schema)?;
        Ok(schema)
    }
}
