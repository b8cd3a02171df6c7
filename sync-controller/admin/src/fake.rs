//! An in-memory admin API for tests.
//!
//! [`FakeAdmin`] implements [`Transport`] by serving requests from an in-memory table, mimicking
//! the admin API's quirks: empty collections are reported as `"nodes": {}`, writes answer `201` for
//! new objects and `200` for replaced ones, and deleting an upstream, service or plugin config that
//! a route still refers to is rejected. Every request is recorded, and failures may be injected per
//! method and kind.

use crate::{Cluster, ClusterOptions, Result, Transport};
use ahash::AHashMap as HashMap;
use backon::ExponentialBuilder;
use bytes::Bytes;
use gateway_sync_core::{Kind, Resource};
use http::{Method, Request, Response, StatusCode};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{collections::BTreeMap, sync::Arc, time::Duration};

pub const BASE_URL: &str = "http://admin.test/apisix/admin";

const BASE_PATH: &str = "/apisix/admin";

#[derive(Debug, Default)]
pub struct FakeAdmin {
    admin_key: Option<String>,
    state: Mutex<State>,
}

/// A request served by a [`FakeAdmin`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded {
    pub method: Method,
    pub kind: Kind,
    pub id: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<Kind, BTreeMap<String, Value>>,
    requests: Vec<Recorded>,
    failures: HashMap<(Method, Kind), Failure>,
}

#[derive(Debug)]
struct Failure {
    status: StatusCode,
    remaining: Option<usize>,
}

// === impl FakeAdmin ===

impl FakeAdmin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Requires every request to carry `key` in its `X-API-KEY` header.
    pub fn with_admin_key(key: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            admin_key: Some(key.into()),
            ..Self::default()
        })
    }

    /// Options for a cluster served by this admin API, with a short warm-up backoff.
    pub fn options(name: &str) -> ClusterOptions {
        ClusterOptions {
            sync_timeout: Duration::from_secs(1),
            warmup_backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(10))
                .with_max_delay(Duration::from_millis(100))
                .with_max_times(3),
            ..ClusterOptions::new(name, BASE_URL)
        }
    }

    pub fn cluster(self: &Arc<Self>, name: &str) -> Cluster {
        self.cluster_with(Self::options(name))
    }

    pub fn cluster_with(self: &Arc<Self>, opts: ClusterOptions) -> Cluster {
        Cluster::with_transport(opts, self.clone())
    }

    /// Stores an object directly, as if another client had written it.
    pub fn seed<K: Resource>(&self, obj: &K) {
        let value = serde_json::to_value(obj).unwrap_or_default();
        self.state
            .lock()
            .objects
            .entry(K::KIND)
            .or_default()
            .insert(obj.id().to_string(), value);
    }

    /// Stores a plugin schema as the raw body served for it.
    pub fn seed_schema(&self, name: &str, schema: Value) {
        self.state
            .lock()
            .objects
            .entry(Kind::Schema)
            .or_default()
            .insert(name.to_string(), schema);
    }

    /// Removes an object directly, bypassing reference checks.
    pub fn remove(&self, kind: Kind, id: &str) -> bool {
        self.state
            .lock()
            .objects
            .get_mut(&kind)
            .is_some_and(|objs| objs.remove(id).is_some())
    }

    pub fn get<K: Resource>(&self, id: &str) -> Option<K> {
        let value = self.state.lock().objects.get(&K::KIND)?.get(id)?.clone();
        let mut obj: K = serde_json::from_value(value).ok()?;
        obj.adopt(id, "");
        Some(obj)
    }

    pub fn contains(&self, kind: Kind, id: &str) -> bool {
        self.state
            .lock()
            .objects
            .get(&kind)
            .is_some_and(|objs| objs.contains_key(id))
    }

    pub fn ids(&self, kind: Kind) -> Vec<String> {
        self.state
            .lock()
            .objects
            .get(&kind)
            .map(|objs| objs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().requests.clone()
    }

    /// The recorded requests other than reads.
    pub fn writes(&self) -> Vec<Recorded> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method != Method::GET)
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    /// Fails every subsequent `method` request for `kind` with `status`.
    pub fn fail(&self, method: Method, kind: Kind, status: StatusCode) {
        self.state.lock().failures.insert(
            (method, kind),
            Failure {
                status,
                remaining: None,
            },
        );
    }

    /// Fails the next `times` `method` requests for `kind` with `status`.
    pub fn fail_times(&self, method: Method, kind: Kind, status: StatusCode, times: usize) {
        self.state.lock().failures.insert(
            (method, kind),
            Failure {
                status,
                remaining: Some(times),
            },
        );
    }

    /// Clears injected failures.
    pub fn heal(&self) {
        self.state.lock().failures.clear();
    }

    fn handle(&self, req: &Request<Bytes>) -> Response<Bytes> {
        if let Some(key) = self.admin_key.as_deref() {
            let given = req.headers().get("X-API-KEY").and_then(|v| v.to_str().ok());
            if given != Some(key) {
                return error(StatusCode::UNAUTHORIZED, "invalid api key");
            }
        }

        let Some((kind, id)) = route(req.uri().path()) else {
            return error(StatusCode::NOT_FOUND, "unknown path");
        };

        let mut state = self.state.lock();
        state.requests.push(Recorded {
            method: req.method().clone(),
            kind,
            id: id.map(Into::into),
        });
        if let Some(status) = state.injected(req.method(), kind) {
            return error(status, "injected failure");
        }

        match (req.method().clone(), id) {
            (Method::GET, None) => state.list(kind),
            (Method::GET, Some(id)) => state.get(kind, id),
            (Method::PUT, Some(id)) if kind != Kind::Schema => state.put(kind, id, req.body()),
            (Method::DELETE, Some(id)) if kind != Kind::Schema => state.delete(kind, id),
            _ => error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeAdmin {
    async fn send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        Ok(self.handle(&req))
    }
}

// === impl State ===

impl State {
    fn injected(&mut self, method: &Method, kind: Kind) -> Option<StatusCode> {
        let key = (method.clone(), kind);
        let failure = self.failures.get_mut(&key)?;
        let status = failure.status;
        match &mut failure.remaining {
            None => {}
            Some(0) => {
                self.failures.remove(&key);
                return None;
            }
            Some(n) => *n -= 1,
        }
        Some(status)
    }

    fn list(&self, kind: Kind) -> Response<Bytes> {
        let nodes = self
            .objects
            .get(&kind)
            .map(|objs| {
                objs.iter()
                    .map(|(id, value)| json!({ "key": key(kind, id), "value": value }))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let collection = format!("/apisix/{}", kind.collection());
        let body = if nodes.is_empty() {
            json!({ "count": 0, "node": { "key": collection, "nodes": {} } })
        } else {
            json!({ "count": nodes.len().to_string(), "node": { "key": collection, "nodes": nodes } })
        };
        respond(StatusCode::OK, &body)
    }

    fn get(&self, kind: Kind, id: &str) -> Response<Bytes> {
        let Some(value) = self.objects.get(&kind).and_then(|objs| objs.get(id)) else {
            return error(StatusCode::NOT_FOUND, "key not found");
        };
        if kind == Kind::Schema {
            return respond(StatusCode::OK, value);
        }
        respond(StatusCode::OK, &item(kind, id, value))
    }

    fn put(&mut self, kind: Kind, id: &str, body: &[u8]) -> Response<Bytes> {
        let value = match serde_json::from_slice::<Value>(body) {
            Ok(value) => value,
            Err(e) => return error(StatusCode::BAD_REQUEST, &format!("invalid body: {e}")),
        };
        let existed = self
            .objects
            .entry(kind)
            .or_default()
            .insert(id.to_string(), value.clone())
            .is_some();
        let status = if existed {
            StatusCode::OK
        } else {
            StatusCode::CREATED
        };
        respond(status, &item(kind, id, &value))
    }

    fn delete(&mut self, kind: Kind, id: &str) -> Response<Bytes> {
        if !self.objects.get(&kind).is_some_and(|objs| objs.contains_key(id)) {
            return error(StatusCode::NOT_FOUND, "key not found");
        }
        if let Some((referrer, referrer_id)) = self.referrer(kind, id) {
            let msg = format!(
                "can not delete this {kind}, {referrer} [{referrer_id}] is still using it now"
            );
            return error(StatusCode::BAD_REQUEST, &msg);
        }
        if let Some(objs) = self.objects.get_mut(&kind) {
            objs.remove(id);
        }
        respond(
            StatusCode::OK,
            &json!({ "deleted": "1", "key": key(kind, id) }),
        )
    }

    fn referrer(&self, kind: Kind, id: &str) -> Option<(Kind, String)> {
        let referrers: &[(Kind, &str)] = match kind {
            Kind::Upstream => &[
                (Kind::Route, "upstream_id"),
                (Kind::StreamRoute, "upstream_id"),
                (Kind::Service, "upstream_id"),
            ],
            Kind::Service => &[(Kind::Route, "service_id")],
            Kind::PluginConfig => &[(Kind::Route, "plugin_config_id")],
            _ => &[],
        };
        referrers.iter().find_map(|(referrer, field)| {
            let objs = self.objects.get(referrer)?;
            objs.iter()
                .find(|(_, value)| value.get(*field).and_then(Value::as_str) == Some(id))
                .map(|(referrer_id, _)| (*referrer, referrer_id.clone()))
        })
    }
}

/// Resolves a request path to the kind and (optional) ID it addresses.
fn route(path: &str) -> Option<(Kind, Option<&str>)> {
    let rest = path.strip_prefix(BASE_PATH)?.trim_start_matches('/');
    Kind::ALL.into_iter().find_map(|kind| {
        let tail = rest.strip_prefix(kind.collection())?;
        if tail.is_empty() {
            return Some((kind, None));
        }
        let id = tail.strip_prefix('/')?;
        (!id.is_empty()).then_some((kind, Some(id)))
    })
}

fn key(kind: Kind, id: &str) -> String {
    format!("/apisix/{}/{id}", kind.collection())
}

fn item(kind: Kind, id: &str, value: &Value) -> Value {
    json!({ "node": { "key": key(kind, id), "value": value } })
}

fn error(status: StatusCode, msg: &str) -> Response<Bytes> {
    respond(status, &json!({ "error_msg": msg }))
}

fn respond(status: StatusCode, body: &Value) -> Response<Bytes> {
    let mut rsp = Response::new(Bytes::from(body.to_string()));
    *rsp.status_mut() = status;
    rsp
}
