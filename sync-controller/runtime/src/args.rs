use crate::{admin::Admin, driver::Driver, metrics::SyncMetrics};
use anyhow::{bail, Context, Result};
use clap::Parser;
use gateway_sync_admin::{Cluster, ClusterOptions, Clusters};
use gateway_sync_cache::Backend;
use prometheus_client::registry::Registry;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::{
    signal::unix::{signal, SignalKind},
    time::Duration,
};
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(
    name = "gateway-sync",
    about = "Reconciles gateway admin APIs against a desired-state manifest"
)]
pub struct Args {
    #[clap(long, default_value = "gateway_sync=info,warn", env = "GATEWAY_SYNC_LOG")]
    log_level: String,

    #[clap(long, default_value = "plain")]
    log_format: LogFormat,

    /// A gateway admin API to manage, as `NAME=URL`. May be repeated.
    #[clap(long = "cluster", default_value = "default=http://127.0.0.1:9180/apisix/admin")]
    clusters: Vec<ClusterArg>,

    #[clap(long, env = "GATEWAY_SYNC_ADMIN_KEY", hide_env_values = true)]
    admin_key: Option<String>,

    #[clap(long, default_value = "memdb")]
    cache_backend: Backend,

    /// Skips writes of objects identical to the last ones written.
    #[clap(long, default_value = "true", action = clap::ArgAction::Set)]
    sync_comparison: bool,

    /// How long writes wait for a cluster's initial cache sync.
    #[clap(long, default_value = "30000")]
    sync_timeout_ms: u64,

    #[clap(long, default_value = "5000")]
    request_timeout_ms: u64,

    /// A YAML or JSON file describing the desired state of every cluster.
    #[clap(long)]
    manifest: Option<PathBuf>,

    #[clap(long, default_value = "10")]
    resync_period_secs: u64,

    #[clap(long, default_value = "0.0.0.0:9990")]
    admin_addr: SocketAddr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ClusterArg {
    name: String,
    url: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            clusters: cluster_args,
            admin_key,
            cache_backend,
            sync_comparison,
            sync_timeout_ms,
            request_timeout_ms,
            manifest,
            resync_period_secs,
            admin_addr,
        } = self;

        log_format.init(&log_level)?;

        let mut prom = <Registry>::default();
        let metrics = SyncMetrics::register(prom.sub_registry_with_prefix("gateway_sync"));

        let clusters = Arc::new(Clusters::default());
        for ClusterArg { name, url } in cluster_args {
            let opts = ClusterOptions {
                admin_key: admin_key.clone(),
                cache: cache_backend,
                sync_comparison,
                sync_timeout: Duration::from_millis(sync_timeout_ms),
                request_timeout: Duration::from_millis(request_timeout_ms),
                ..ClusterOptions::new(name, url)
            };
            clusters.add(Cluster::new(opts))?;
        }

        let (drain_tx, drain_rx) = drain::channel();

        let admin = Admin::new(clusters.clone(), prom);
        let admin_drain = drain_rx.clone();
        tokio::spawn(async move {
            if let Err(error) = admin.serve(admin_addr, admin_drain).await {
                tracing::error!(%error, "Admin server failed");
            }
        });

        let period = Duration::from_secs(resync_period_secs.max(1));
        for cluster in clusters.list() {
            let span = info_span!("cluster", name = %cluster.name());
            let driver = Driver::new(cluster, manifest.clone(), period, metrics.clone());
            tokio::spawn(driver.run(drain_rx.clone()).instrument(span));
        }
        drop(drain_rx);

        signaled().await?;
        info!("Shutting down");
        drain_tx.drain().await;
        Ok(())
    }
}

async fn signaled() -> Result<()> {
    let mut term = signal(SignalKind::terminate()).context("failed to register SIGTERM")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("failed to listen for SIGINT")?,
        _ = term.recv() => {}
    }
    Ok(())
}

// === impl ClusterArg ===

impl std::str::FromStr for ClusterArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, url) = match s.split_once('=') {
            Some((name, url)) => (name.trim(), url.trim()),
            None => ("default", s.trim()),
        };
        if name.is_empty() {
            bail!("cluster name must not be empty");
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("invalid admin API URL for cluster {name}: {url}");
        }
        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
        })
    }
}

// === impl LogFormat ===

impl LogFormat {
    fn init(self, filter: &str) -> Result<()> {
        let filter = EnvFilter::try_new(filter).context("invalid log filter")?;
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        let res = match self {
            Self::Plain => builder.try_init(),
            Self::Json => builder.json().try_init(),
        };
        res.map_err(|error| anyhow::anyhow!("failed to initialize logging: {error}"))
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            s => bail!("invalid log format: {s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cluster_args() {
        assert_eq!(
            "edge=http://10.0.0.1:9180/apisix/admin"
                .parse::<ClusterArg>()
                .unwrap(),
            ClusterArg {
                name: "edge".to_string(),
                url: "http://10.0.0.1:9180/apisix/admin".to_string(),
            }
        );
        assert_eq!(
            "http://127.0.0.1:9180/apisix/admin"
                .parse::<ClusterArg>()
                .unwrap()
                .name,
            "default"
        );
        assert!("=http://127.0.0.1".parse::<ClusterArg>().is_err());
        assert!("edge=127.0.0.1:9180".parse::<ClusterArg>().is_err());
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["gateway-sync"]).unwrap();
        assert_eq!(args.clusters.len(), 1);
        assert_eq!(args.clusters[0].name, "default");
        assert!(args.sync_comparison);
        assert_eq!(args.cache_backend, Backend::MemDb);
        assert_eq!(args.log_format, LogFormat::Plain);
        assert_eq!(args.manifest, None);
    }

    #[test]
    fn flags() {
        let args = Args::try_parse_from([
            "gateway-sync",
            "--cluster=a=http://a/apisix/admin",
            "--cluster=b=http://b/apisix/admin",
            "--sync-comparison=false",
            "--cache-backend=noop",
            "--log-format=json",
            "--manifest=/etc/gateway/manifest.yaml",
        ])
        .unwrap();
        let names = args.clusters.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["a", "b"]);
        assert!(!args.sync_comparison);
        assert_eq!(args.cache_backend, Backend::Noop);
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(
            args.manifest.as_deref(),
            Some(std::path::Path::new("/etc/gateway/manifest.yaml"))
        );

        assert!(Args::try_parse_from(["gateway-sync", "--log-format=xml"]).is_err());
        assert!(Args::try_parse_from(["gateway-sync", "--cache-backend=redis"]).is_err());
    }
}
