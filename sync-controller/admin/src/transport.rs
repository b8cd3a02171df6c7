use crate::{Error, Result};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;

/// Sends admin API requests and buffers their responses.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, req: Request<Bytes>) -> Result<Response<Bytes>>;
}

/// A plaintext HTTP/1 [`Transport`] that bounds each request (including reading the response body)
/// by a timeout.
#[derive(Clone, Debug)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

// === impl HyperTransport ===

impl HyperTransport {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self { client, timeout }
    }
}

#[async_trait::async_trait]
impl Transport for HyperTransport {
    async fn send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let method = req.method().clone();
        let uri = req.uri().to_string();

        let call = async {
            let rsp = self.client.request(req.map(Full::new)).await?;
            let (parts, body) = rsp.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, Error>(Response::from_parts(parts, body))
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| Error::Timeout {
                method,
                uri,
                timeout: self.timeout,
            })?
    }
}
