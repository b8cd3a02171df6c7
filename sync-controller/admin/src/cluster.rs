use crate::{
    wire, Error, HyperTransport, ResourceClient, Result, SchemaClient, Transport, Writable,
};
use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use gateway_sync_cache::{Backend, Cache};
use gateway_sync_core::{
    Consumer, GlobalRule, PluginConfig, PluginMetadata, Route, Service, Ssl, StreamRoute,
    Upstream,
};
use http::{header, Method, Request, Response};
use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

const ADMIN_KEY_HEADER: &str = "X-API-KEY";

/// Configures a [`Cluster`].
#[derive(Clone, Debug)]
pub struct ClusterOptions {
    pub name: String,

    /// The root of the admin API, e.g. `http://127.0.0.1:9180/apisix/admin`.
    pub base_url: String,

    pub admin_key: Option<String>,

    pub cache: Backend,

    /// Skips remote writes of objects identical to the last ones written.
    pub sync_comparison: bool,

    /// Bounds how long mutations wait for the initial sync.
    pub sync_timeout: Duration,

    pub request_timeout: Duration,

    pub warmup_backoff: ExponentialBuilder,
}

/// A remote gateway's admin API and the local stores that mirror it.
pub struct Cluster {
    name: String,
    base_url: String,
    admin_key: Option<String>,
    transport: Arc<dyn Transport>,
    pub(crate) cache: Arc<dyn Cache>,
    pub(crate) generations: Arc<dyn Cache>,
    sync_comparison: bool,
    sync_timeout: Duration,
    warmup_backoff: ExponentialBuilder,
    ready: watch::Sender<bool>,
}

// === impl ClusterOptions ===

impl ClusterOptions {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            admin_key: None,
            cache: Backend::default(),
            sync_comparison: true,
            sync_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
            warmup_backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(100))
                .with_max_delay(Duration::from_secs(5))
                .with_max_times(5),
        }
    }
}

// === impl Cluster ===

impl Cluster {
    /// Builds a cluster that talks to its admin API over HTTP.
    pub fn new(opts: ClusterOptions) -> Self {
        let transport = Arc::new(HyperTransport::new(opts.request_timeout));
        Self::with_transport(opts, transport)
    }

    pub fn with_transport(opts: ClusterOptions, transport: Arc<dyn Transport>) -> Self {
        let ClusterOptions {
            name,
            base_url,
            admin_key,
            cache,
            sync_comparison,
            sync_timeout,
            request_timeout: _,
            warmup_backoff,
        } = opts;
        let (ready, _) = watch::channel(false);
        Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_key,
            transport,
            cache: cache.build(),
            generations: cache.build(),
            sync_comparison,
            sync_timeout,
            warmup_backoff,
            ready,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn sync_comparison(&self) -> bool {
        self.sync_comparison
    }

    /// The mirror of objects reported by the admin API.
    pub fn cache(&self) -> &dyn Cache {
        &*self.cache
    }

    /// The last objects written to the admin API, keyed by ID.
    pub fn generations(&self) -> &dyn Cache {
        &*self.generations
    }

    pub fn client<K: Writable>(&self) -> ResourceClient<'_, K> {
        ResourceClient::new(self)
    }

    pub fn route(&self) -> ResourceClient<'_, Route> {
        self.client()
    }

    pub fn service(&self) -> ResourceClient<'_, Service> {
        self.client()
    }

    pub fn upstream(&self) -> ResourceClient<'_, Upstream> {
        self.client()
    }

    pub fn ssl(&self) -> ResourceClient<'_, Ssl> {
        self.client()
    }

    pub fn stream_route(&self) -> ResourceClient<'_, StreamRoute> {
        self.client()
    }

    pub fn global_rule(&self) -> ResourceClient<'_, GlobalRule> {
        self.client()
    }

    pub fn consumer(&self) -> ResourceClient<'_, Consumer> {
        self.client()
    }

    pub fn plugin_config(&self) -> ResourceClient<'_, PluginConfig> {
        self.client()
    }

    pub fn plugin_metadata(&self) -> ResourceClient<'_, PluginMetadata> {
        self.client()
    }

    pub fn schema(&self) -> SchemaClient<'_> {
        SchemaClient::new(self)
    }

    /// Indicates whether the initial sync has completed.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Waits for the initial sync to complete, failing with [`Error::NotReady`] if it does not
    /// complete within the sync timeout.
    pub async fn has_synced(&self) -> Result<()> {
        let mut ready = self.ready.subscribe();
        let synced = tokio::time::timeout(self.sync_timeout, ready.wait_for(|r| *r))
            .await
            .is_ok_and(|res| res.is_ok());
        if !synced {
            return Err(Error::NotReady(self.name.clone()));
        }
        Ok(())
    }

    /// Replaces the contents of both local stores with the objects the admin API currently holds,
    /// retrying with exponential backoff. Marks the cluster ready on success.
    #[instrument(skip(self), fields(cluster = %self.name))]
    pub async fn sync_cache(&self) -> Result<()> {
        (|| self.warm_up())
            .retry(self.warmup_backoff.clone())
            .notify(|error, after| warn!(%error, ?after, "Failed to sync cache; retrying"))
            .await?;
        self.ready.send_replace(true);
        info!("Cache synced");
        Ok(())
    }

    async fn warm_up(&self) -> Result<()> {
        self.cache.reset()?;
        self.generations.reset()?;

        self.warm::<Route>().await?;
        self.warm::<Service>().await?;
        self.warm::<Upstream>().await?;
        self.warm::<Ssl>().await?;
        self.warm::<StreamRoute>().await?;
        self.warm::<GlobalRule>().await?;
        self.warm::<Consumer>().await?;
        self.warm::<PluginConfig>().await?;
        Ok(())
    }

    async fn warm<K: Writable>(&self) -> Result<()> {
        let objs = self.client::<K>().list().await?;
        tracing::debug!(kind = %K::KIND, count = objs.len(), "Warming cache");
        for obj in objs {
            self.cache.insert(obj.into_object())?;
        }
        Ok(())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Issues an admin API request, mapping non-success statuses to [`Error::Status`].
    pub(crate) async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response<Bytes>> {
        let uri = self.url(path);
        let mut req = Request::builder().method(method.clone()).uri(&uri);
        if let Some(key) = self.admin_key.as_deref() {
            req = req.header(ADMIN_KEY_HEADER, key);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Bytes::from(body))?,
            None => req.body(Bytes::new())?,
        };

        tracing::trace!(%method, %uri, "Sending request");
        let rsp = self.transport.send(req).await?;
        if rsp.status().is_success() {
            return Ok(rsp);
        }
        Err(Error::Status {
            method,
            uri,
            status: rsp.status(),
            message: wire::error_message(rsp.body()),
        })
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("sync_comparison", &self.sync_comparison)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}
