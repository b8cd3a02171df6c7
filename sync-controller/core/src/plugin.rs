use crate::{Kind, Metadata, Object, Resource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Plugin configurations keyed by plugin name.
pub type Plugins = BTreeMap<String, serde_json::Value>;

/// The JSON schema of a plugin, as served by the admin API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub content: String,
}

/// Cluster-wide metadata for a plugin.
///
/// On the wire the configuration is the whole body; the plugin name is the item's key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    #[serde(skip)]
    pub name: String,

    #[serde(flatten)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl Resource for Schema {
    const KIND: Kind = Kind::Schema;

    fn metadata(&self) -> Option<&Metadata> {
        None
    }

    fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        None
    }

    fn into_object(self) -> Object {
        Object::Schema(self)
    }

    fn from_object(obj: Object) -> Option<Self> {
        match obj {
            Object::Schema(s) => Some(s),
            _ => None,
        }
    }

    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> Option<&str> {
        Some(self.name.as_str())
    }

    fn id_for_name(name: &str) -> String {
        name.to_string()
    }

    fn adopt(&mut self, id: &str, _cluster: &str) {
        self.name = id.to_string();
    }
}

impl Resource for PluginMetadata {
    const KIND: Kind = Kind::PluginMetadata;

    fn metadata(&self) -> Option<&Metadata> {
        None
    }

    fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        None
    }

    fn into_object(self) -> Object {
        Object::PluginMetadata(self)
    }

    fn from_object(obj: Object) -> Option<Self> {
        match obj {
            Object::PluginMetadata(pm) => Some(pm),
            _ => None,
        }
    }

    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> Option<&str> {
        Some(self.name.as_str())
    }

    fn id_for_name(name: &str) -> String {
        name.to_string()
    }

    fn adopt(&mut self, id: &str, _cluster: &str) {
        self.name = id.to_string();
    }
}
