use crate::{manifest, metrics::SyncMetrics, sync};
use gateway_sync_admin::Cluster;
use gateway_sync_core::Manifest;
use std::{path::PathBuf, sync::Arc};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// Periodically reconciles a cluster against a manifest file.
pub struct Driver {
    cluster: Arc<Cluster>,
    manifest: Option<PathBuf>,
    period: Duration,
    metrics: SyncMetrics,

    /// The manifest most recently applied without failures.
    applied: Option<Manifest>,
}

// === impl Driver ===

impl Driver {
    pub fn new(
        cluster: Arc<Cluster>,
        manifest: Option<PathBuf>,
        period: Duration,
        metrics: SyncMetrics,
    ) -> Self {
        Self {
            cluster,
            manifest,
            period,
            metrics,
            applied: None,
        }
    }

    /// Warms the cluster's cache and then runs a sync pass every period until shutdown.
    pub async fn run(mut self, drain: drain::Watch) {
        tokio::pin! {
            let shutdown = drain.signaled();
        }

        tokio::select! {
            res = self.cluster.sync_cache() => {
                if let Err(error) = res {
                    warn!(%error, "Initial cache sync failed");
                }
            }
            _ = &mut shutdown => return,
        }

        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => self.pass().await,
                _ = &mut shutdown => {
                    debug!("Shutting down");
                    return;
                }
            }
        }
    }

    #[instrument(skip(self), fields(cluster = %self.cluster.name()))]
    pub(crate) async fn pass(&mut self) {
        if !self.cluster.is_ready() {
            if let Err(error) = self.cluster.sync_cache().await {
                warn!(%error, "Cache sync failed; skipping pass");
                return;
            }
        }

        let Some(path) = self.manifest.as_deref() else {
            return;
        };
        let desired = match manifest::load(path).await {
            Ok(desired) => desired,
            Err(error) => {
                let error = format!("{error:#}");
                warn!(%error, "Failed to load manifest");
                return;
            }
        };

        let start = Instant::now();
        let res = sync::reconcile(&self.cluster, self.applied.as_ref(), Some(&desired)).await;
        self.metrics
            .observe(self.cluster.name(), start.elapsed(), res.as_ref().err());
        match res {
            Ok(skipped) => {
                if self.applied.as_ref() != Some(&desired) {
                    info!(resources = desired.len(), "Manifest applied");
                }
                if !skipped.is_empty() {
                    debug!(resources = skipped.len(), "Deletes postponed");
                }
                // Resources whose deletes were skipped stay applied so the next diff deletes them
                // again.
                let Manifest {
                    upstreams,
                    plugin_configs,
                    ..
                } = skipped;
                let mut applied = desired;
                applied.upstreams.extend(upstreams);
                applied.plugin_configs.extend(plugin_configs);
                self.applied = Some(applied);
            }
            // Keep the last applied manifest so the next pass retries what failed.
            Err(error) => warn!(%error, "Sync pass failed"),
        }
    }
}
