use bytes::Bytes;
use futures::future;
use gateway_sync_admin::Clusters;
use http::{header, Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use prometheus_client::registry::Registry;
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{debug, info, instrument};

const OPENMETRICS: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Serves liveness, readiness and metrics.
#[derive(Clone)]
pub struct Admin {
    clusters: Arc<Clusters>,
    registry: Arc<Registry>,
}

// === impl Admin ===

impl Admin {
    pub fn new(clusters: Arc<Clusters>, registry: Registry) -> Self {
        Self {
            clusters,
            registry: Arc::new(registry),
        }
    }

    #[instrument(skip(self, drain))]
    pub async fn serve(self, addr: SocketAddr, drain: drain::Watch) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "HTTP admin server listening");

        tokio::pin! {
            let shutdown = drain.signaled();
        }
        loop {
            let (stream, _) = tokio::select! {
                res = listener.accept() => res?,
                _ = &mut shutdown => return Ok(()),
            };

            let admin = self.clone();
            tokio::spawn(async move {
                let svc = service_fn(move |req| future::ok::<_, Infallible>(admin.handle(&req)));
                if let Err(error) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .await
                {
                    debug!(%error, "Admin connection failed");
                }
            });
        }
    }

    pub(crate) fn handle<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        if !matches!(*req.method(), Method::GET | Method::HEAD) {
            return respond(StatusCode::METHOD_NOT_ALLOWED, "text/plain", "");
        }
        match req.uri().path() {
            "/live" => respond(StatusCode::OK, "text/plain", "live\n"),
            "/ready" => self.handle_ready(),
            "/metrics" => self.handle_metrics(),
            _ => respond(StatusCode::NOT_FOUND, "text/plain", ""),
        }
    }

    fn handle_ready(&self) -> Response<Full<Bytes>> {
        if self.clusters.all_ready() {
            respond(StatusCode::OK, "text/plain", "ready\n")
        } else {
            respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "not ready\n")
        }
    }

    fn handle_metrics(&self) -> Response<Full<Bytes>> {
        let mut buf = String::new();
        match prometheus_client::encoding::text::encode(&mut buf, &self.registry) {
            Ok(()) => respond(StatusCode::OK, OPENMETRICS, buf),
            Err(error) => {
                debug!(%error, "Failed to encode metrics");
                respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "")
            }
        }
    }
}

fn respond(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut rsp = Response::new(Full::new(body.into()));
    *rsp.status_mut() = status;
    rsp.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(content_type),
    );
    rsp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncMetrics;
    use gateway_sync_admin::fake::FakeAdmin;
    use http_body_util::BodyExt;

    async fn body(rsp: Response<Full<Bytes>>) -> String {
        let bytes = rsp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(path: &str) -> Request<()> {
        Request::get(path).body(()).unwrap()
    }

    #[tokio::test]
    async fn ready_once_every_cluster_is_synced() {
        let admin = FakeAdmin::new();
        let clusters = Arc::new(Clusters::default());
        let cluster = clusters.add(admin.cluster("default")).unwrap();
        let server = Admin::new(clusters, Registry::default());

        assert_eq!(server.handle(&get("/live")).status(), StatusCode::OK);
        let rsp = server.handle(&get("/ready"));
        assert_eq!(rsp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(rsp).await, "not ready\n");

        cluster.sync_cache().await.unwrap();
        let rsp = server.handle(&get("/ready"));
        assert_eq!(rsp.status(), StatusCode::OK);
        assert_eq!(body(rsp).await, "ready\n");

        assert_eq!(server.handle(&get("/nope")).status(), StatusCode::NOT_FOUND);
        let post = Request::post("/ready").body(()).unwrap();
        assert_eq!(server.handle(&post).status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn metrics_are_encoded() {
        let mut registry = Registry::default();
        let metrics = SyncMetrics::register(registry.sub_registry_with_prefix("gateway_sync"));
        metrics.observe("default", std::time::Duration::from_millis(20), None);

        let server = Admin::new(Arc::new(Clusters::default()), registry);
        let rsp = server.handle(&get("/metrics"));
        assert_eq!(rsp.status(), StatusCode::OK);
        assert_eq!(rsp.headers()[header::CONTENT_TYPE], OPENMETRICS);
        let text = body(rsp).await;
        assert!(
            text.contains(r#"gateway_sync_passes_total{cluster="default",result="success"} 1"#),
            "{text}"
        );
        assert!(text.contains("gateway_sync_duration_seconds_count"), "{text}");
    }
}
