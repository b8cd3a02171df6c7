use crate::{
    Consumer, GlobalRule, Metadata, PluginConfig, PluginMetadata, Route, Schema, Service, Ssl,
    StreamRoute, Upstream,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// The closed set of resource kinds managed on a remote gateway.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Route,
    Service,
    Upstream,
    Ssl,
    StreamRoute,
    GlobalRule,
    Consumer,
    PluginConfig,
    Schema,
    PluginMetadata,
}

/// Foreign keys held by a resource.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct References<'a> {
    pub upstream_id: Option<&'a str>,
    pub service_id: Option<&'a str>,
    pub plugin_config_id: Option<&'a str>,
}

/// A resource of any kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    Route(Route),
    Service(Service),
    Upstream(Upstream),
    Ssl(Ssl),
    StreamRoute(StreamRoute),
    GlobalRule(GlobalRule),
    Consumer(Consumer),
    PluginConfig(PluginConfig),
    Schema(Schema),
    PluginMetadata(PluginMetadata),
}

/// Behavior shared by every resource kind.
pub trait Resource:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: Kind;

    fn metadata(&self) -> Option<&Metadata>;

    fn metadata_mut(&mut self) -> Option<&mut Metadata>;

    fn into_object(self) -> Object;

    fn from_object(obj: Object) -> Option<Self>;

    /// The primary key of the resource within its kind.
    fn id(&self) -> &str {
        self.metadata().map(|md| md.id.as_str()).unwrap_or_default()
    }

    /// The unique (but optional) name of the resource.
    fn name(&self) -> Option<&str> {
        self.metadata()
            .map(|md| md.name.as_str())
            .filter(|name| !name.is_empty())
    }

    fn references(&self) -> References<'_> {
        References::default()
    }

    /// The ID under which a resource with the given name is stored.
    fn id_for_name(name: &str) -> String {
        crate::id::derive(name)
    }

    /// Records the identity a cluster's admin API reported for this object.
    fn adopt(&mut self, id: &str, cluster: &str) {
        if let Some(md) = self.metadata_mut() {
            md.adopt(id, cluster);
        }
    }

    /// Fills in a missing ID from the resource's name.
    fn ensure_id(&mut self) {
        if let Some(md) = self.metadata_mut() {
            if md.id.is_empty() && !md.name.is_empty() {
                md.id = Self::id_for_name(&md.name);
            }
        }
    }
}

// === impl Kind ===

impl Kind {
    pub const ALL: [Kind; 10] = [
        Kind::Route,
        Kind::Service,
        Kind::Upstream,
        Kind::Ssl,
        Kind::StreamRoute,
        Kind::GlobalRule,
        Kind::Consumer,
        Kind::PluginConfig,
        Kind::Schema,
        Kind::PluginMetadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Route => "route",
            Kind::Service => "service",
            Kind::Upstream => "upstream",
            Kind::Ssl => "ssl",
            Kind::StreamRoute => "stream_route",
            Kind::GlobalRule => "global_rule",
            Kind::Consumer => "consumer",
            Kind::PluginConfig => "plugin_config",
            Kind::Schema => "schema",
            Kind::PluginMetadata => "plugin_metadata",
        }
    }

    /// The admin API collection that holds resources of this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            Kind::Route => "routes",
            Kind::Service => "services",
            Kind::Upstream => "upstreams",
            Kind::Ssl => "ssl",
            Kind::StreamRoute => "stream_routes",
            Kind::GlobalRule => "global_rules",
            Kind::Consumer => "consumers",
            Kind::PluginConfig => "plugin_configs",
            Kind::Schema => "schema/plugins",
            Kind::PluginMetadata => "plugin_metadata",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl Object ===

macro_rules! with_resource {
    ($obj:expr, $res:ident => $body:expr) => {
        match $obj {
            Object::Route($res) => $body,
            Object::Service($res) => $body,
            Object::Upstream($res) => $body,
            Object::Ssl($res) => $body,
            Object::StreamRoute($res) => $body,
            Object::GlobalRule($res) => $body,
            Object::Consumer($res) => $body,
            Object::PluginConfig($res) => $body,
            Object::Schema($res) => $body,
            Object::PluginMetadata($res) => $body,
        }
    };
}

impl Object {
    pub fn kind(&self) -> Kind {
        match self {
            Object::Route(_) => Kind::Route,
            Object::Service(_) => Kind::Service,
            Object::Upstream(_) => Kind::Upstream,
            Object::Ssl(_) => Kind::Ssl,
            Object::StreamRoute(_) => Kind::StreamRoute,
            Object::GlobalRule(_) => Kind::GlobalRule,
            Object::Consumer(_) => Kind::Consumer,
            Object::PluginConfig(_) => Kind::PluginConfig,
            Object::Schema(_) => Kind::Schema,
            Object::PluginMetadata(_) => Kind::PluginMetadata,
        }
    }

    pub fn id(&self) -> &str {
        with_resource!(self, r => r.id())
    }

    pub fn name(&self) -> Option<&str> {
        with_resource!(self, r => r.name())
    }

    pub fn references(&self) -> References<'_> {
        with_resource!(self, r => r.references())
    }
}

macro_rules! impl_resource {
    ($ty:ident $(, references = $refs:ident)?) => {
        impl Resource for $ty {
            const KIND: Kind = Kind::$ty;

            fn metadata(&self) -> Option<&Metadata> {
                Some(&self.metadata)
            }

            fn metadata_mut(&mut self) -> Option<&mut Metadata> {
                Some(&mut self.metadata)
            }

            fn into_object(self) -> Object {
                Object::$ty(self)
            }

            fn from_object(obj: Object) -> Option<Self> {
                match obj {
                    Object::$ty(r) => Some(r),
                    _ => None,
                }
            }

            $(
                fn references(&self) -> References<'_> {
                    self.$refs()
                }
            )?
        }
    };
}

impl_resource!(Route, references = foreign_keys);
impl_resource!(Service, references = foreign_keys);
impl_resource!(StreamRoute, references = foreign_keys);
impl_resource!(Upstream);
impl_resource!(Ssl);
impl_resource!(GlobalRule);
impl_resource!(PluginConfig);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_dispatch_to_their_resource() {
        let route = Route {
            metadata: Metadata::named("httpbin"),
            upstream_id: Some("u1".to_string()),
            ..Route::default()
        };
        let obj = route.clone().into_object();
        assert_eq!(obj.kind(), Kind::Route);
        assert_eq!(obj.id(), route.metadata.id);
        assert_eq!(obj.name(), Some("httpbin"));
        assert_eq!(obj.references().upstream_id, Some("u1"));
        assert_eq!(Route::from_object(obj.clone()), Some(route));
        assert_eq!(Upstream::from_object(obj), None);
    }

    #[test]
    fn ensure_id_derives_from_name() {
        let mut upstream = Upstream {
            metadata: Metadata {
                name: "default_httpbin_80".to_string(),
                ..Metadata::default()
            },
            ..Upstream::default()
        };
        upstream.ensure_id();
        assert_eq!(upstream.id(), crate::id::derive("default_httpbin_80"));

        let mut consumer = Consumer {
            username: "jack".to_string(),
            ..Consumer::default()
        };
        consumer.ensure_id();
        assert_eq!(consumer.id(), "jack");
        assert_eq!(Consumer::id_for_name("jack"), "jack");
    }
}
