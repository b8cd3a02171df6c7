use super::*;
use gateway_sync_core::{
    Consumer, GlobalRule, Metadata, PluginConfig, PluginMetadata, Route, Schema, Service, Ssl,
    StreamRoute, Upstream, UpstreamNode,
};
use pretty_assertions::assert_eq;

fn md(id: &str, name: &str) -> Metadata {
    Metadata {
        id: id.to_string(),
        name: name.to_string(),
        ..Metadata::default()
    }
}

fn mk_route(id: &str, name: &str, upstream_id: Option<&str>) -> Route {
    Route {
        metadata: md(id, name),
        uri: Some("/*".to_string()),
        upstream_id: upstream_id.map(Into::into),
        ..Route::default()
    }
}

fn mk_upstream(id: &str) -> Upstream {
    Upstream {
        metadata: md(id, &format!("upstream-{id}")),
        lb_type: Some("roundrobin".to_string()),
        nodes: vec![UpstreamNode {
            host: "10.0.0.1".to_string(),
            port: 80,
            weight: 100,
        }],
        ..Upstream::default()
    }
}

fn mk_stream_route(id: &str, upstream_id: &str) -> StreamRoute {
    StreamRoute {
        metadata: md(id, ""),
        server_port: Some(9100),
        upstream_id: Some(upstream_id.to_string()),
        ..StreamRoute::default()
    }
}

/// One object of every kind.
fn every_kind() -> Vec<Object> {
    let plugins = [("cors".to_string(), serde_json::json!({}))]
        .into_iter()
        .collect();
    vec![
        mk_route("r1", "route-1", None).into_object(),
        Service {
            metadata: md("s1", "service-1"),
            hosts: vec!["example.com".to_string()],
            ..Service::default()
        }
        .into_object(),
        mk_upstream("u1").into_object(),
        Ssl {
            metadata: md("ssl1", ""),
            snis: vec!["example.com".to_string()],
            cert: "cert".to_string(),
            key: "key".to_string(),
            client: None,
        }
        .into_object(),
        mk_stream_route("sr1", "u1").into_object(),
        GlobalRule {
            metadata: md("g1", ""),
            plugins: Default::default(),
        }
        .into_object(),
        Consumer {
            username: "jack".to_string(),
            plugins,
            ..Consumer::default()
        }
        .into_object(),
        PluginConfig {
            metadata: md("pc1", "plugin-config-1"),
            ..PluginConfig::default()
        }
        .into_object(),
        Schema {
            name: "limit-count".to_string(),
            content: r#"{"type":"object"}"#.to_string(),
        }
        .into_object(),
        PluginMetadata {
            name: "http-logger".to_string(),
            config: Default::default(),
        }
        .into_object(),
    ]
}

#[test]
fn every_kind_round_trips() {
    let db = MemDb::new();
    for obj in every_kind() {
        db.insert(obj.clone()).unwrap();
        assert_eq!(db.get(obj.kind(), obj.id()).unwrap(), obj);
        assert_eq!(db.list(obj.kind()).unwrap(), vec![obj]);
    }
}

#[test]
fn stored_objects_are_isolated_from_callers() {
    let db = MemDb::new();
    let mut route = mk_route("r1", "route-1", None);
    db.insert_resource(&route).unwrap();

    // Mutating the caller's copy does not reach the store.
    route.methods.push("GET".to_string());
    let mut read = db.get_resource::<Route>("r1").unwrap();
    assert!(read.methods.is_empty());

    // Neither does mutating a read result.
    read.uri = Some("/changed".to_string());
    let again = db.get_resource::<Route>("r1").unwrap();
    assert_eq!(again.uri.as_deref(), Some("/*"));

    let mut listed = db.list_resources::<Route>().unwrap();
    listed[0].uri = None;
    assert_eq!(
        db.get_resource::<Route>("r1").unwrap().uri.as_deref(),
        Some("/*")
    );
}

#[test]
fn misses_are_not_found() {
    let db = MemDb::new();
    assert_eq!(
        db.get(Kind::Route, "nope"),
        Err(Error::NotFound {
            kind: Kind::Route,
            id: "nope".to_string()
        })
    );
    assert!(matches!(
        db.get_by_name(Kind::Upstream, "nope"),
        Err(Error::NotFound { .. })
    ));
    assert_eq!(db.list(Kind::Ssl), Ok(vec![]));
    assert!(matches!(
        db.delete(&mk_route("nope", "", None).into_object()),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn same_id_keeps_only_the_latest() {
    let db = MemDb::new();
    db.insert_resource(&mk_route("r1", "route-1", Some("u1")))
        .unwrap();
    db.insert_resource(&mk_route("r1", "route-1b", Some("u2")))
        .unwrap();

    let routes = db.list_resources::<Route>().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].metadata.name, "route-1b");

    // The old name and foreign key no longer resolve to the route.
    assert!(db.get_by_name(Kind::Route, "route-1").is_err());
    db.insert_resource(&mk_upstream("u1")).unwrap();
    db.delete_resource(&mk_upstream("u1")).unwrap();
}

#[test]
fn shared_names_resolve_to_the_latest_insert() {
    let db = MemDb::new();
    db.insert_resource(&mk_route("r1", "shared", None)).unwrap();
    db.insert_resource(&mk_route("r2", "shared", None)).unwrap();

    // Both routes remain addressable by ID.
    assert!(db.get(Kind::Route, "r1").is_ok());
    assert!(db.get(Kind::Route, "r2").is_ok());
    assert_eq!(db.get_by_name(Kind::Route, "shared").unwrap().id(), "r2");

    // Deleting the earlier route must not release the name held by the later one.
    db.delete_resource(&mk_route("r1", "shared", None)).unwrap();
    assert_eq!(db.get_by_name(Kind::Route, "shared").unwrap().id(), "r2");
}

#[test]
fn nameless_objects_are_allowed() {
    let db = MemDb::new();
    db.insert_resource(&mk_route("r1", "", None)).unwrap();
    db.insert_resource(&mk_route("r2", "", None)).unwrap();
    assert_eq!(db.list(Kind::Route).unwrap().len(), 2);
}

#[test]
fn referenced_upstreams_cannot_be_deleted() {
    let db = MemDb::new();
    let upstream = mk_upstream("u1");
    let route = mk_route("r1", "route-1", Some("u1"));
    db.insert_resource(&upstream).unwrap();
    db.insert_resource(&route).unwrap();

    assert_eq!(
        db.delete_resource(&upstream),
        Err(Error::StillInUse {
            kind: Kind::Upstream,
            id: "u1".to_string(),
            referrer: Kind::Route,
            referrer_id: "r1".to_string(),
        })
    );
    // The failed delete left the upstream in place.
    assert!(db.get(Kind::Upstream, "u1").is_ok());

    db.delete_resource(&route).unwrap();
    db.delete_resource(&upstream).unwrap();
    assert!(db.get(Kind::Upstream, "u1").is_err());
}

#[test]
fn stream_routes_hold_upstreams() {
    let db = MemDb::new();
    let upstream = mk_upstream("u1");
    db.insert_resource(&upstream).unwrap();
    db.insert_resource(&mk_stream_route("sr1", "u1")).unwrap();

    let err = db.check_references(&upstream.clone().into_object());
    assert!(
        matches!(err, Err(Error::StillInUse { referrer: Kind::StreamRoute, .. })),
        "{err:?}"
    );
    assert!(db.delete_resource(&upstream).is_err());

    // Repointing the stream route releases the upstream.
    db.insert_resource(&mk_stream_route("sr1", "u2")).unwrap();
    db.delete_resource(&upstream).unwrap();
}

#[test]
fn referenced_plugin_configs_and_services_cannot_be_deleted() {
    let db = MemDb::new();
    let pc = PluginConfig {
        metadata: md("pc1", "pc"),
        ..PluginConfig::default()
    };
    let svc = Service {
        metadata: md("s1", "svc"),
        ..Service::default()
    };
    let route = Route {
        plugin_config_id: Some("pc1".to_string()),
        service_id: Some("s1".to_string()),
        ..mk_route("r1", "route-1", None)
    };
    db.insert_resource(&pc).unwrap();
    db.insert_resource(&svc).unwrap();
    db.insert_resource(&route).unwrap();

    assert!(matches!(
        db.delete_resource(&pc),
        Err(Error::StillInUse { .. })
    ));
    assert!(matches!(
        db.delete_resource(&svc),
        Err(Error::StillInUse { .. })
    ));

    db.delete_resource(&route).unwrap();
    db.delete_resource(&pc).unwrap();
    db.delete_resource(&svc).unwrap();
}

#[test]
fn failed_inserts_leave_no_trace() {
    let db = MemDb::new();
    let err = db.insert_resource(&mk_route("", "nameless", Some("u1")));
    assert_eq!(err, Err(Error::MissingId { kind: Kind::Route }));
    assert!(db.list(Kind::Route).unwrap().is_empty());
    assert!(db.get_by_name(Kind::Route, "nameless").is_err());

    db.insert_resource(&mk_upstream("u1")).unwrap();
    db.delete_resource(&mk_upstream("u1")).unwrap();
}

#[test]
fn reads_are_unaffected_by_later_writes() {
    let db = MemDb::new();
    db.insert_resource(&mk_route("r1", "route-1", None)).unwrap();
    let before = db.list(Kind::Route).unwrap();
    db.insert_resource(&mk_route("r2", "route-2", None)).unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(db.list(Kind::Route).unwrap().len(), 2);
}

#[test]
fn concurrent_readers_see_whole_commits() {
    let db = Arc::new(MemDb::new());
    db.insert_resource(&mk_upstream("u1")).unwrap();

    let writer = {
        let db = db.clone();
        std::thread::spawn(move || {
            for i in 0..200 {
                let id = format!("r{i}");
                db.insert_resource(&mk_route(&id, &id, Some("u1"))).unwrap();
            }
        })
    };

    let readers = (0..4)
        .map(|_| {
            let db = db.clone();
            std::thread::spawn(move || {
                let mut last = 0;
                for _ in 0..200 {
                    let routes = db.list_resources::<Route>().unwrap();
                    assert!(routes.len() >= last, "snapshots never go backwards");
                    assert!(routes.iter().all(|r| r.upstream_id.as_deref() == Some("u1")));
                    last = routes.len();
                }
            })
        })
        .collect::<Vec<_>>();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(db.list(Kind::Route).unwrap().len(), 200);
}

#[test]
fn reset_empties_every_table() {
    let db = MemDb::new();
    for obj in every_kind() {
        db.insert(obj).unwrap();
    }
    db.reset().unwrap();
    for kind in Kind::ALL {
        assert!(db.list(kind).unwrap().is_empty(), "{kind}");
    }
    // Nothing references the upstream any longer.
    db.insert_resource(&mk_upstream("u1")).unwrap();
    db.delete_resource(&mk_upstream("u1")).unwrap();
}

#[test]
fn noop_accepts_everything_and_stores_nothing() {
    let db = Backend::Noop.build();
    for obj in every_kind() {
        db.insert(obj.clone()).unwrap();
        assert!(matches!(
            db.get(obj.kind(), obj.id()),
            Err(Error::NotFound { .. })
        ));
        assert!(db.list(obj.kind()).unwrap().is_empty());
        db.check_references(&obj).unwrap();
        db.delete(&obj).unwrap();
    }
    db.reset().unwrap();
}

#[test]
fn typed_reads_check_the_kind() {
    let db = MemDb::new();
    db.insert_resource(&mk_upstream("u1")).unwrap();
    assert!(db.get_resource::<Upstream>("u1").is_ok());
    assert_eq!(
        db.get_resource::<Route>("u1"),
        Err(Error::NotFound {
            kind: Kind::Route,
            id: "u1".to_string()
        })
    );
}

#[test]
fn backends_parse_from_config() {
    assert_eq!("memdb".parse::<Backend>().unwrap(), Backend::MemDb);
    assert_eq!("noop".parse::<Backend>().unwrap(), Backend::Noop);
    assert!("redis".parse::<Backend>().is_err());
}
