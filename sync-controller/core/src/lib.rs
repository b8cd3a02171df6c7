//! Gateway Sync Core
//!
//! Describes the resources a remote gateway is configured with and the desired-state snapshots
//! (manifests) the sync controller reconciles against it:
//!
//! ```text
//! [ Route ] -> [ Service ] -> [ Upstream ] <- [ StreamRoute ]
//!     \-> [ PluginConfig ]
//! ```
//!
//! Every resource kind implements [`Resource`] so that caches, clients and the diff engine can be
//! written once, generically, over the closed set of kinds enumerated by [`Kind`]. Heterogeneous
//! collections carry resources as the [`Object`] tagged union.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod compat;
mod consumer;
mod global_rule;
pub mod id;
mod manifest;
mod metadata;
mod object;
mod plugin;
mod plugin_config;
mod route;
mod service;
mod ssl;
mod stream_route;
mod upstream;

pub use self::{
    consumer::Consumer,
    global_rule::GlobalRule,
    manifest::{diff, Diff, Manifest},
    metadata::{full_name, Metadata},
    object::{Kind, Object, References, Resource},
    plugin::{PluginMetadata, Plugins, Schema},
    plugin_config::PluginConfig,
    route::Route,
    service::Service,
    ssl::{MutualTlsClientConfig, Ssl},
    stream_route::StreamRoute,
    upstream::{ClientTls, Timeout, Upstream, UpstreamNode},
};
